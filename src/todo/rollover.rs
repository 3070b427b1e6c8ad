//! Moves unfinished tasks from earlier days onto a reference day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::config::LocalClock;
use crate::data::Owner;
use crate::gateway::{BatchReport, TableStore};
use crate::internal_error::InternalResult;

use super::data::*;
use super::helpers::{fetch_tasks, persist_task_patches};

#[derive(Debug, Clone, PartialEq)]
pub struct RolloverPlan {
    pub reference: NaiveDate,
    pub new_start: DateTime<Utc>,
    pub task_ids: Vec<TaskID>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RolloverOutcome {
    NothingToDo,
    AwaitingConfirmation { count: usize },
    Completed { moved: usize },
    PartiallyFailed { moved: usize, failed: usize },
}

pub fn is_overdue(task: &Task, reference: NaiveDate, clock: &LocalClock) -> bool {
    task.is_todo() && !task.category.is_schedule() && task.day(&clock.offset) < reference
}

pub fn select_overdue<'a>(tasks: &'a [Task], reference: NaiveDate, clock: &LocalClock) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| is_overdue(task, reference, clock))
        .collect()
}

pub fn plan_rollover(tasks: &[Task], reference: NaiveDate, clock: &LocalClock) -> RolloverPlan {
    RolloverPlan {
        reference,
        new_start: clock.anchored(reference),
        task_ids: select_overdue(tasks, reference, clock)
            .into_iter()
            .map(|task| task.id)
            .collect(),
    }
}

pub fn execute_rollover(store: &impl TableStore, owner: &Owner, plan: &RolloverPlan) -> BatchReport {
    let patches: Vec<(TaskID, TaskPatch)> = plan
        .task_ids
        .iter()
        .map(|task_id| {
            (
                *task_id,
                TaskPatch {
                    start_time: Some(plan.new_start),
                    ..TaskPatch::default()
                },
            )
        })
        .collect();

    persist_task_patches(store, owner, &patches)
}

/// Selects, asks `confirm`, then rewrites. Nothing is written unless `confirm`
/// returns true for a non-empty plan.
pub fn rollover(
    store: &impl TableStore,
    owner: &Owner,
    reference: NaiveDate,
    clock: &LocalClock,
    confirm: impl FnOnce(&RolloverPlan) -> bool,
) -> InternalResult<RolloverOutcome> {
    let tasks = fetch_tasks(store, owner)?;
    let plan = plan_rollover(&tasks, reference, clock);

    if plan.task_ids.is_empty() {
        tracing::debug!(%owner, %reference, "no overdue tasks");
        return Ok(RolloverOutcome::NothingToDo);
    }
    if !confirm(&plan) {
        return Ok(RolloverOutcome::AwaitingConfirmation {
            count: plan.task_ids.len(),
        });
    }

    let report = execute_rollover(store, owner, &plan);
    tracing::info!(
        %owner,
        %reference,
        moved = report.succeeded,
        failed = report.failed,
        "rolled over overdue tasks"
    );

    if report.is_complete() {
        Ok(RolloverOutcome::Completed {
            moved: report.succeeded,
        })
    } else {
        Ok(RolloverOutcome::PartiallyFailed {
            moved: report.succeeded,
            failed: report.failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory_database;
    use crate::gateway::testing::FlakyStore;
    use crate::gateway::SqliteTableStore;
    use crate::todo::helpers::tests::{add, clock, day, owner};
    use crate::todo::helpers::{fetch_tasks, toggle_task};

    fn task_named(store: &impl TableStore, title: &str) -> Task {
        fetch_tasks(store, &owner())
            .unwrap()
            .into_iter()
            .find(|t| t.title == title)
            .unwrap()
    }

    #[test]
    fn overdue_personal_task_moves_to_the_reference_day() {
        let store = SqliteTableStore::new(memory_database());
        add(&store, "A", day(15), TaskCategory::Personal);

        let outcome = rollover(&store, &owner(), day(17), &clock(), |_| true).unwrap();
        assert_eq!(outcome, RolloverOutcome::Completed { moved: 1 });

        let moved = task_named(&store, "A");
        assert_eq!(moved.start_time, clock().anchored(day(17)));
        assert_eq!(moved.status, TaskStatus::Todo);

        let again = rollover(&store, &owner(), day(17), &clock(), |_| true).unwrap();
        assert_eq!(again, RolloverOutcome::NothingToDo);
    }

    #[test]
    fn schedule_done_and_current_tasks_are_never_selected() {
        let store = SqliteTableStore::new(memory_database());
        add(&store, "meeting", day(10), TaskCategory::Schedule);
        add(&store, "finished", day(10), TaskCategory::Personal);
        add(&store, "today", day(17), TaskCategory::Personal);
        add(&store, "work", day(12), TaskCategory::Other("Work".into()));
        let finished = task_named(&store, "finished").id;
        toggle_task(&store, &owner(), finished).unwrap();

        let tasks = fetch_tasks(&store, &owner()).unwrap();
        let selected: Vec<&str> = select_overdue(&tasks, day(17), &clock())
            .into_iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(selected, vec!["work"]);
    }

    #[test]
    fn declining_writes_nothing() {
        let store = SqliteTableStore::new(memory_database());
        add(&store, "A", day(15), TaskCategory::Personal);
        add(&store, "B", day(16), TaskCategory::Personal);

        let mut asked = 0;
        let outcome = rollover(&store, &owner(), day(17), &clock(), |plan| {
            asked = plan.task_ids.len();
            false
        })
        .unwrap();

        assert_eq!(asked, 2);
        assert_eq!(outcome, RolloverOutcome::AwaitingConfirmation { count: 2 });
        assert_eq!(task_named(&store, "A").day(&clock().offset), day(15));
    }

    #[test]
    fn confirmation_is_not_requested_for_an_empty_selection() {
        let store = SqliteTableStore::new(memory_database());
        add(&store, "today", day(17), TaskCategory::Personal);

        let outcome = rollover(&store, &owner(), day(17), &clock(), |_| {
            panic!("nothing to confirm")
        })
        .unwrap();
        assert_eq!(outcome, RolloverOutcome::NothingToDo);
    }

    #[test]
    fn partial_failure_is_reported_as_counts() {
        let store = SqliteTableStore::new(memory_database());
        add(&store, "A", day(14), TaskCategory::Personal);
        add(&store, "B", day(15), TaskCategory::Personal);
        add(&store, "C", day(16), TaskCategory::Personal);
        let b = task_named(&store, "B").id;
        let flaky = FlakyStore::new(&store, [b]);

        let outcome = rollover(&flaky, &owner(), day(17), &clock(), |_| true).unwrap();
        assert_eq!(outcome, RolloverOutcome::PartiallyFailed { moved: 2, failed: 1 });
        assert_eq!(task_named(&store, "B").day(&clock().offset), day(15));

        // The survivor is picked up by the next run.
        let retry = rollover(&store, &owner(), day(17), &clock(), |_| true).unwrap();
        assert_eq!(retry, RolloverOutcome::Completed { moved: 1 });
    }
}
