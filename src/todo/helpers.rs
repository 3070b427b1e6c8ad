use chrono::{DateTime, Utc};

use crate::bridge::Effect;
use crate::config::LocalClock;
use crate::data::Owner;
use crate::gateway::{from_rows, to_row, BatchReport, OrderBy, Table, TableStore};
use crate::internal_error::{InternalError, InternalResult};
use crate::ordering::{reorder, DropTarget, MoveSpec, Slot};

use super::data::*;

const TASK_ORDER: &[OrderBy] = &[OrderBy::asc("position"), OrderBy::desc("created_at")];

pub fn fetch_tasks(store: &impl TableStore, owner: &Owner) -> InternalResult<Vec<Task>> {
    from_rows(store.list(Table::Tasks, owner, TASK_ORDER)?)
}

pub fn find_task(store: &impl TableStore, owner: &Owner, task_id: TaskID) -> InternalResult<Task> {
    fetch_tasks(store, owner)?
        .into_iter()
        .find(|task| task.id == task_id)
        .ok_or(InternalError::NotFound {
            table: Table::Tasks.name(),
            id: task_id,
        })
}

pub fn build_new_task(
    owner: &Owner,
    request: &AddTaskRequest,
    now: DateTime<Utc>,
    clock: &LocalClock,
) -> Option<NewTask> {
    let title = request.title.trim();
    if title.is_empty() {
        return None;
    }

    let start_time = match request.date {
        Some(day) => clock.anchored(day),
        None => now,
    };
    let color = request
        .color
        .clone()
        .unwrap_or_else(|| request.category.default_color().to_string());

    Some(NewTask {
        title: title.to_string(),
        status: TaskStatus::Todo,
        category: request.category.clone(),
        color: Some(color),
        owner: owner.clone(),
        start_time,
        created_at: now,
        position: 0,
    })
}

pub fn add_task(
    store: &impl TableStore,
    owner: &Owner,
    request: &AddTaskRequest,
    now: DateTime<Utc>,
    clock: &LocalClock,
) -> InternalResult<Effect> {
    match build_new_task(owner, request, now, clock) {
        Some(task) => {
            let id = store.insert(Table::Tasks, to_row(&task)?)?;
            tracing::info!(%owner, id, "task added");
            Ok(Effect::Written)
        }
        None => Ok(Effect::Ignored),
    }
}

pub fn patch_task(
    store: &impl TableStore,
    owner: &Owner,
    task_id: TaskID,
    patch: &TaskPatch,
) -> InternalResult<()> {
    store.update(Table::Tasks, owner, task_id, to_row(patch)?)
}

pub fn edit_patch(request: &SetTaskRequest) -> Option<TaskPatch> {
    let title = request.title.trim();
    if title.is_empty() {
        return None;
    }

    Some(TaskPatch {
        title: Some(title.to_string()),
        color: request.color.clone(),
        ..TaskPatch::default()
    })
}

pub fn set_task(
    store: &impl TableStore,
    owner: &Owner,
    request: &SetTaskRequest,
) -> InternalResult<Effect> {
    match edit_patch(request) {
        Some(patch) => {
            patch_task(store, owner, request.task_id, &patch)?;
            Ok(Effect::Written)
        }
        None => Ok(Effect::Ignored),
    }
}

pub fn toggle_patch(task: &Task) -> TaskPatch {
    TaskPatch {
        status: Some(task.status.toggled()),
        ..TaskPatch::default()
    }
}

pub fn toggle_task(store: &impl TableStore, owner: &Owner, task_id: TaskID) -> InternalResult<Effect> {
    let task = find_task(store, owner, task_id)?;
    patch_task(store, owner, task_id, &toggle_patch(&task))?;

    Ok(Effect::Written)
}

pub fn delete_task(store: &impl TableStore, owner: &Owner, task_id: TaskID) -> InternalResult<Effect> {
    store.delete(Table::Tasks, owner, task_id)?;
    tracing::info!(%owner, task_id, "task deleted");

    Ok(Effect::Written)
}

impl TaskPatch {
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(color) = &self.color {
            task.color = Some(color.clone());
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(start_time) = self.start_time {
            task.start_time = start_time;
        }
        if let Some(position) = self.position {
            task.position = position;
        }
    }
}

/// Row patches that realise a drag-and-drop of one task.
///
/// A drop onto a day keeps the task in its own list (todo or schedule). Dropping a
/// todo onto a schedule entry, or the reverse, is rejected.
pub fn plan_task_move(
    tasks: &[Task],
    spec: &TaskMove,
    clock: &LocalClock,
) -> InternalResult<Vec<(TaskID, TaskPatch)>> {
    let dragged = tasks
        .iter()
        .find(|task| task.id == spec.dragged)
        .ok_or(InternalError::NotFound {
            table: Table::Tasks.name(),
            id: spec.dragged,
        })?;
    let dragged_scope = dragged.scope(&clock.offset);

    let target = match spec.target {
        DropTarget::Item(over_id) => {
            if let Some(over) = tasks.iter().find(|task| task.id == over_id) {
                if over.category.is_schedule() != dragged_scope.schedule {
                    return Err(InternalError::invalid(
                        "tasks cannot move between the todo and schedule lists",
                    ));
                }
            }
            DropTarget::Item(over_id)
        }
        DropTarget::Scope(day) => DropTarget::Scope(TaskScope {
            day,
            schedule: dragged_scope.schedule,
        }),
    };

    let slots: Vec<Slot<TaskID, TaskScope>> = tasks
        .iter()
        .map(|task| Slot {
            id: task.id,
            scope: task.scope(&clock.offset),
            position: task.position,
        })
        .collect();
    let plan = reorder(
        &slots,
        &MoveSpec {
            dragged: spec.dragged,
            target,
        },
    )?;

    let mut patches = Vec::with_capacity(plan.updates.len());
    for update in plan.updates {
        let mut patch = TaskPatch {
            position: Some(update.position),
            ..TaskPatch::default()
        };
        if let Some(scope) = update.scope {
            if let Some(task) = tasks.iter().find(|task| task.id == update.id) {
                patch.start_time = Some(clock.on_day(task.start_time, scope.day));
            }
        }
        patches.push((update.id, patch));
    }

    Ok(patches)
}

/// Writes every patch in turn; a failed row does not stop the rest.
pub fn persist_task_patches(
    store: &impl TableStore,
    owner: &Owner,
    patches: &[(TaskID, TaskPatch)],
) -> BatchReport {
    let mut report = BatchReport::default();
    for (task_id, patch) in patches {
        report.record(Table::Tasks, *task_id, patch_task(store, owner, *task_id, patch));
    }

    report
}

pub fn move_task(
    store: &impl TableStore,
    owner: &Owner,
    spec: &TaskMove,
    clock: &LocalClock,
) -> InternalResult<BatchReport> {
    let tasks = fetch_tasks(store, owner)?;
    let patches = plan_task_move(&tasks, spec, clock)?;

    Ok(persist_task_patches(store, owner, &patches))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::memory_database;
    use crate::gateway::testing::FlakyStore;
    use crate::gateway::SqliteTableStore;
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    pub fn clock() -> LocalClock {
        LocalClock {
            offset: FixedOffset::east_opt(7 * 3600).unwrap(),
            anchor_hour: 9,
        }
    }

    pub fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    pub fn owner() -> Owner {
        Owner::new("khanh").unwrap()
    }

    pub fn add(store: &impl TableStore, title: &str, date: NaiveDate, category: TaskCategory) {
        let request = AddTaskRequest {
            title: title.to_string(),
            date: Some(date),
            category,
            color: None,
        };
        let now = Utc.with_ymd_and_hms(2026, 2, 17, 1, 0, 0).unwrap();
        assert_eq!(
            add_task(store, &owner(), &request, now, &clock()).unwrap(),
            Effect::Written
        );
    }

    fn titles(tasks: &[Task], clock: &LocalClock, on: NaiveDate) -> Vec<String> {
        let mut scoped: Vec<&Task> = tasks.iter().filter(|t| t.day(&clock.offset) == on).collect();
        scoped.sort_by_key(|t| t.position);
        scoped.iter().map(|t| t.title.clone()).collect()
    }

    fn by_title(tasks: &[Task], title: &str) -> Task {
        tasks.iter().find(|t| t.title == title).cloned().unwrap()
    }

    fn normalise(store: &impl TableStore, on: NaiveDate) {
        // Give the fixture distinct positions in insertion order.
        let tasks = fetch_tasks(store, &owner()).unwrap();
        let mut scoped: Vec<&Task> = tasks.iter().filter(|t| t.day(&clock().offset) == on).collect();
        scoped.sort_by_key(|t| t.id);
        for (i, task) in scoped.iter().enumerate() {
            let patch = TaskPatch {
                position: Some(i as i64),
                ..TaskPatch::default()
            };
            patch_task(store, &owner(), task.id, &patch).unwrap();
        }
    }

    #[test]
    fn dated_adds_land_at_the_anchor_hour_with_default_colors() {
        let store = SqliteTableStore::new(memory_database());
        add(&store, "Buy flowers", day(17), TaskCategory::Personal);
        add(&store, "Dentist", day(17), TaskCategory::Schedule);

        let tasks = fetch_tasks(&store, &owner()).unwrap();
        let flowers = by_title(&tasks, "Buy flowers");
        assert_eq!(flowers.start_time, clock().anchored(day(17)));
        assert_eq!(flowers.color.as_deref(), Some(TODO_COLOR));
        assert_eq!(flowers.status, TaskStatus::Todo);
        assert_eq!(flowers.position, 0);
        assert_eq!(by_title(&tasks, "Dentist").color.as_deref(), Some(SCHEDULE_COLOR));
    }

    #[test]
    fn undated_adds_use_now() {
        let store = SqliteTableStore::new(memory_database());
        let now = Utc.with_ymd_and_hms(2026, 2, 17, 4, 5, 6).unwrap();
        let request = AddTaskRequest {
            title: "Call mum".into(),
            date: None,
            category: TaskCategory::Personal,
            color: Some("#2563eb".into()),
        };
        add_task(&store, &owner(), &request, now, &clock()).unwrap();

        let task = by_title(&fetch_tasks(&store, &owner()).unwrap(), "Call mum");
        assert_eq!(task.start_time, now);
        assert_eq!(task.color.as_deref(), Some("#2563eb"));
    }

    #[test]
    fn blank_titles_are_ignored() {
        let store = SqliteTableStore::new(memory_database());
        let request = AddTaskRequest {
            title: "   ".into(),
            date: None,
            category: TaskCategory::Personal,
            color: None,
        };
        let effect = add_task(&store, &owner(), &request, Utc::now(), &clock()).unwrap();
        assert_eq!(effect, Effect::Ignored);
        assert!(fetch_tasks(&store, &owner()).unwrap().is_empty());

        add(&store, "Keep", day(17), TaskCategory::Personal);
        let id = fetch_tasks(&store, &owner()).unwrap()[0].id;
        let edit = SetTaskRequest {
            task_id: id,
            title: "".into(),
            color: None,
        };
        assert_eq!(set_task(&store, &owner(), &edit).unwrap(), Effect::Ignored);
        assert_eq!(fetch_tasks(&store, &owner()).unwrap()[0].title, "Keep");
    }

    #[test]
    fn toggling_twice_restores_the_task() {
        let store = SqliteTableStore::new(memory_database());
        add(&store, "Buy flowers", day(17), TaskCategory::Personal);
        let before = fetch_tasks(&store, &owner()).unwrap().remove(0);

        toggle_task(&store, &owner(), before.id).unwrap();
        let toggled = fetch_tasks(&store, &owner()).unwrap().remove(0);
        assert_eq!(toggled.status, TaskStatus::Done);

        toggle_task(&store, &owner(), before.id).unwrap();
        assert_eq!(fetch_tasks(&store, &owner()).unwrap().remove(0), before);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let store = SqliteTableStore::new(memory_database());
        assert!(matches!(
            toggle_task(&store, &owner(), 99),
            Err(InternalError::NotFound { .. })
        ));
        assert!(matches!(
            delete_task(&store, &owner(), 99),
            Err(InternalError::NotFound { .. })
        ));
    }

    #[test]
    fn same_day_move_persists_every_position() {
        let store = SqliteTableStore::new(memory_database());
        for title in ["a", "b", "c"] {
            add(&store, title, day(17), TaskCategory::Personal);
        }
        normalise(&store, day(17));
        let tasks = fetch_tasks(&store, &owner()).unwrap();
        let spec = TaskMove {
            dragged: by_title(&tasks, "c").id,
            target: DropTarget::Item(by_title(&tasks, "a").id),
        };

        let report = move_task(&store, &owner(), &spec, &clock()).unwrap();
        assert_eq!(report, BatchReport { succeeded: 3, failed: 0 });

        let tasks = fetch_tasks(&store, &owner()).unwrap();
        assert_eq!(titles(&tasks, &clock(), day(17)), vec!["c", "a", "b"]);
    }

    #[test]
    fn cross_day_move_keeps_time_of_day() {
        let store = SqliteTableStore::new(memory_database());
        add(&store, "a", day(17), TaskCategory::Personal);
        add(&store, "b", day(18), TaskCategory::Personal);
        let tasks = fetch_tasks(&store, &owner()).unwrap();
        let spec = TaskMove {
            dragged: by_title(&tasks, "a").id,
            target: DropTarget::Scope(day(18)),
        };

        move_task(&store, &owner(), &spec, &clock()).unwrap();
        let moved = by_title(&fetch_tasks(&store, &owner()).unwrap(), "a");
        assert_eq!(moved.start_time, clock().anchored(day(18)));
        assert_eq!(moved.position, 0);
    }

    #[test]
    fn todo_cannot_be_dropped_onto_a_schedule_entry() {
        let store = SqliteTableStore::new(memory_database());
        add(&store, "a", day(17), TaskCategory::Personal);
        add(&store, "meeting", day(17), TaskCategory::Schedule);
        let tasks = fetch_tasks(&store, &owner()).unwrap();
        let spec = TaskMove {
            dragged: by_title(&tasks, "a").id,
            target: DropTarget::Item(by_title(&tasks, "meeting").id),
        };
        assert!(matches!(
            move_task(&store, &owner(), &spec, &clock()),
            Err(InternalError::Invalid(_))
        ));
    }

    #[test]
    fn failed_rows_do_not_stop_the_rest_of_a_reorder() {
        let store = SqliteTableStore::new(memory_database());
        for title in ["a", "b", "c"] {
            add(&store, title, day(17), TaskCategory::Personal);
        }
        normalise(&store, day(17));
        let tasks = fetch_tasks(&store, &owner()).unwrap();
        let a = by_title(&tasks, "a").id;
        let flaky = FlakyStore::new(&store, [a]);
        let spec = TaskMove {
            dragged: by_title(&tasks, "c").id,
            target: DropTarget::Item(a),
        };

        let report = move_task(&flaky, &owner(), &spec, &clock()).unwrap();
        assert_eq!(report, BatchReport { succeeded: 2, failed: 1 });
    }
}
