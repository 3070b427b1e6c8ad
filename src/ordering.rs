//! Keeps `position` consistent inside a scope after a drag-and-drop.
//!
//! [`reorder`] is pure: callers project their rows into [`Slot`]s, compute a
//! [`ReorderPlan`], then persist `plan.updates` one row at a time. The same input
//! always produces the same plan.

use serde::{Deserialize, Serialize};

use std::fmt::Debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot<I, S> {
    pub id: I,
    pub scope: S,
    pub position: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DropTarget<I, S> {
    /// Dropped onto another item: take its place.
    Item(I),
    /// Dropped onto an empty part of a scope.
    Scope(S),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveSpec<I, S> {
    pub dragged: I,
    pub target: DropTarget<I, S>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate<I, S> {
    pub id: I,
    pub position: i64,
    /// Set when the row changes scope.
    pub scope: Option<S>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan<I, S> {
    /// Ids of the destination scope in display order after the move.
    pub ordered: Vec<I>,
    pub updates: Vec<PositionUpdate<I, S>>,
}

impl<I, S> ReorderPlan<I, S> {
    fn unchanged(ordered: Vec<I>) -> Self {
        ReorderPlan {
            ordered,
            updates: vec![],
        }
    }

    pub fn is_noop(&self) -> bool {
        self.updates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderingError {
    #[error("dragged item {0} is not in the collection")]
    UnknownDragged(String),
    #[error("drop target {0} is not in the collection")]
    UnknownTarget(String),
}

/// Items of `scope` sorted by position, ties kept in input order.
fn scoped<'a, I, S: PartialEq>(items: &'a [Slot<I, S>], scope: &S) -> Vec<&'a Slot<I, S>> {
    let mut members: Vec<&Slot<I, S>> = items.iter().filter(|slot| &slot.scope == scope).collect();
    members.sort_by_key(|slot| slot.position);
    members
}

fn move_to_scope<I, S>(items: &[Slot<I, S>], dragged: &Slot<I, S>, scope: &S) -> ReorderPlan<I, S>
where
    I: Clone + PartialEq,
    S: Clone + PartialEq,
{
    let mut ordered = vec![dragged.id.clone()];
    ordered.extend(scoped(items, scope).into_iter().map(|slot| slot.id.clone()));

    ReorderPlan {
        ordered,
        updates: vec![PositionUpdate {
            id: dragged.id.clone(),
            position: 0,
            scope: Some(scope.clone()),
        }],
    }
}

/// Computes the order and row updates for one drag-and-drop.
///
/// A drop inside the dragged item's own scope removes it from its index,
/// reinserts it at the target's index and renumbers every member `0..n`.
/// A drop into another scope moves only the dragged row, to position 0; the
/// destination's other members keep their positions.
pub fn reorder<I, S>(
    items: &[Slot<I, S>],
    spec: &MoveSpec<I, S>,
) -> Result<ReorderPlan<I, S>, OrderingError>
where
    I: Clone + PartialEq + Debug,
    S: Clone + PartialEq + Debug,
{
    let dragged = items
        .iter()
        .find(|slot| slot.id == spec.dragged)
        .ok_or_else(|| OrderingError::UnknownDragged(format!("{:?}", spec.dragged)))?;

    let over = match &spec.target {
        DropTarget::Scope(scope) => {
            if scope == &dragged.scope {
                let ordered = scoped(items, scope).into_iter().map(|s| s.id.clone()).collect();
                return Ok(ReorderPlan::unchanged(ordered));
            }
            return Ok(move_to_scope(items, dragged, scope));
        }
        DropTarget::Item(target) => items
            .iter()
            .find(|slot| &slot.id == target)
            .ok_or_else(|| OrderingError::UnknownTarget(format!("{:?}", target)))?,
    };

    if over.scope != dragged.scope {
        return Ok(move_to_scope(items, dragged, &over.scope));
    }

    let mut sequence = scoped(items, &dragged.scope);
    if over.id == dragged.id {
        return Ok(ReorderPlan::unchanged(
            sequence.into_iter().map(|s| s.id.clone()).collect(),
        ));
    }

    let old_index = sequence.iter().position(|slot| slot.id == dragged.id);
    let new_index = sequence.iter().position(|slot| slot.id == over.id);
    if let (Some(old_index), Some(new_index)) = (old_index, new_index) {
        let moved = sequence.remove(old_index);
        sequence.insert(new_index, moved);
    }

    let updates = sequence
        .iter()
        .enumerate()
        .map(|(index, slot)| PositionUpdate {
            id: slot.id.clone(),
            position: index as i64,
            scope: None,
        })
        .collect();

    Ok(ReorderPlan {
        ordered: sequence.into_iter().map(|slot| slot.id.clone()).collect(),
        updates,
    })
}

/// Applies a plan to local slots, the way a view would show it before the refetch.
pub fn apply_plan<I, S>(items: &mut [Slot<I, S>], plan: &ReorderPlan<I, S>)
where
    I: PartialEq,
    S: Clone,
{
    for update in &plan.updates {
        if let Some(slot) = items.iter_mut().find(|slot| slot.id == update.id) {
            slot.position = update.position;
            if let Some(scope) = &update.scope {
                slot.scope = scope.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: u32, scope: &'static str, position: i64) -> Slot<u32, &'static str> {
        Slot { id, scope, position }
    }

    fn day() -> Vec<Slot<u32, &'static str>> {
        vec![
            slot(1, "mon", 0),
            slot(2, "mon", 1),
            slot(3, "mon", 2),
            slot(4, "mon", 3),
            slot(5, "tue", 0),
        ]
    }

    fn visible(items: &[Slot<u32, &'static str>], scope: &'static str) -> Vec<u32> {
        scoped(items, &scope).into_iter().map(|s| s.id).collect()
    }

    #[test]
    fn same_scope_reorder_renumbers_every_member() {
        let items = day();
        let spec = MoveSpec {
            dragged: 1,
            target: DropTarget::Item(3),
        };
        let plan = reorder(&items, &spec).unwrap();

        assert_eq!(plan.ordered, vec![2, 3, 1, 4]);
        let positions: Vec<(u32, i64)> = plan.updates.iter().map(|u| (u.id, u.position)).collect();
        assert_eq!(positions, vec![(2, 0), (3, 1), (1, 2), (4, 3)]);
        assert!(plan.updates.iter().all(|u| u.scope.is_none()));
    }

    #[test]
    fn moving_up_inserts_before_the_target() {
        let plan = reorder(
            &day(),
            &MoveSpec {
                dragged: 4,
                target: DropTarget::Item(2),
            },
        )
        .unwrap();
        assert_eq!(plan.ordered, vec![1, 4, 2, 3]);
    }

    #[test]
    fn positions_are_contiguous_for_every_same_scope_move() {
        let base = day();
        for dragged in 1..=4 {
            for target in 1..=4 {
                let spec = MoveSpec {
                    dragged,
                    target: DropTarget::Item(target),
                };
                let mut items = base.clone();
                let plan = reorder(&items, &spec).unwrap();
                apply_plan(&mut items, &plan);

                let mut positions: Vec<i64> = items
                    .iter()
                    .filter(|s| s.scope == "mon")
                    .map(|s| s.position)
                    .collect();
                positions.sort();
                assert_eq!(positions, vec![0, 1, 2, 3]);
                assert_eq!(visible(&items, "mon"), plan.ordered);
            }
        }
    }

    #[test]
    fn gaps_and_duplicates_are_normalised() {
        let items = vec![slot(1, "mon", 5), slot(2, "mon", 5), slot(3, "mon", 9)];
        let plan = reorder(
            &items,
            &MoveSpec {
                dragged: 3,
                target: DropTarget::Item(1),
            },
        )
        .unwrap();
        assert_eq!(plan.ordered, vec![3, 1, 2]);
        let positions: Vec<i64> = plan.updates.iter().map(|u| u.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn cross_scope_move_only_touches_the_dragged_row() {
        let plan = reorder(
            &day(),
            &MoveSpec {
                dragged: 2,
                target: DropTarget::Item(5),
            },
        )
        .unwrap();

        assert_eq!(
            plan.updates,
            vec![PositionUpdate {
                id: 2,
                position: 0,
                scope: Some("tue"),
            }]
        );
        assert_eq!(plan.ordered, vec![2, 5]);
    }

    #[test]
    fn dropping_on_own_scope_or_self_is_a_noop() {
        let own_scope = reorder(
            &day(),
            &MoveSpec {
                dragged: 2,
                target: DropTarget::Scope("mon"),
            },
        )
        .unwrap();
        assert!(own_scope.is_noop());

        let onto_self = reorder(
            &day(),
            &MoveSpec {
                dragged: 2,
                target: DropTarget::Item(2),
            },
        )
        .unwrap();
        assert!(onto_self.is_noop());
        assert_eq!(onto_self.ordered, vec![1, 2, 3, 4]);
    }

    #[test]
    fn move_away_and_back_restores_the_visible_order() {
        let mut items = day();
        let before = visible(&items, "mon");

        let away = reorder(
            &items,
            &MoveSpec {
                dragged: 1,
                target: DropTarget::Scope("wed"),
            },
        )
        .unwrap();
        apply_plan(&mut items, &away);
        assert_eq!(visible(&items, "mon"), vec![2, 3, 4]);

        let back = reorder(
            &items,
            &MoveSpec {
                dragged: 1,
                target: DropTarget::Item(2),
            },
        )
        .unwrap();
        apply_plan(&mut items, &back);
        assert_eq!(visible(&items, "mon"), before);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let items = day();
        assert_eq!(
            reorder(
                &items,
                &MoveSpec {
                    dragged: 42,
                    target: DropTarget::Item(1),
                },
            ),
            Err(OrderingError::UnknownDragged("42".into()))
        );
        assert!(matches!(
            reorder(
                &items,
                &MoveSpec {
                    dragged: 1,
                    target: DropTarget::Item(42),
                },
            ),
            Err(OrderingError::UnknownTarget(_))
        ));
    }

    #[test]
    fn identical_input_yields_identical_plan() {
        let spec = MoveSpec {
            dragged: 3,
            target: DropTarget::Item(1),
        };
        assert_eq!(reorder(&day(), &spec), reorder(&day(), &spec));
    }
}
