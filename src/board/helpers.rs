use chrono::{DateTime, Utc};

use crate::bridge::Effect;
use crate::data::Owner;
use crate::gateway::{from_rows, to_row, BatchReport, OrderBy, Table, TableStore};
use crate::internal_error::{InternalError, InternalResult};
use crate::ordering::{reorder, DropTarget, MoveSpec, Slot};
use crate::todo::data::TaskStatus;

use super::data::*;

const CATEGORY_ORDER: &[OrderBy] = &[OrderBy::asc("position")];
const BOARD_TASK_ORDER: &[OrderBy] = &[OrderBy::desc("created_at")];

pub fn fetch_categories(store: &impl TableStore, owner: &Owner) -> InternalResult<Vec<BoardCategory>> {
    from_rows(store.list(Table::Categories, owner, CATEGORY_ORDER)?)
}

pub fn fetch_board_tasks(store: &impl TableStore, owner: &Owner) -> InternalResult<Vec<BoardTask>> {
    from_rows(store.list(Table::BoardTasks, owner, BOARD_TASK_ORDER)?)
}

pub fn find_board_task(
    store: &impl TableStore,
    owner: &Owner,
    task_id: BoardTaskID,
) -> InternalResult<BoardTask> {
    fetch_board_tasks(store, owner)?
        .into_iter()
        .find(|task| task.id == task_id)
        .ok_or(InternalError::NotFound {
            table: Table::BoardTasks.name(),
            id: task_id,
        })
}

fn non_blank(title: &str) -> Option<String> {
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

fn color_or_default(color: &Option<String>) -> Option<String> {
    Some(color.clone().unwrap_or_else(|| DEFAULT_COLOR.to_string()))
}

// Categories

pub fn add_category(
    store: &impl TableStore,
    owner: &Owner,
    draft: &CategoryDraft,
    now: DateTime<Utc>,
) -> InternalResult<Effect> {
    let title = match non_blank(&draft.title) {
        Some(title) => title,
        None => return Ok(Effect::Ignored),
    };
    let position = fetch_categories(store, owner)?.len() as i64;

    let category = NewCategory {
        title,
        color: color_or_default(&draft.color),
        owner: owner.clone(),
        position,
        created_at: now,
    };
    let id = store.insert(Table::Categories, to_row(&category)?)?;
    tracing::info!(%owner, id, position, "category added");

    Ok(Effect::Written)
}

pub fn category_patch(draft: &CategoryDraft) -> Option<CategoryPatch> {
    Some(CategoryPatch {
        title: Some(non_blank(&draft.title)?),
        color: draft.color.clone(),
        position: None,
    })
}

pub fn set_category(
    store: &impl TableStore,
    owner: &Owner,
    request: &SetCategoryRequest,
) -> InternalResult<Effect> {
    match category_patch(&request.draft) {
        Some(patch) => {
            store.update(Table::Categories, owner, request.category_id, to_row(&patch)?)?;
            Ok(Effect::Written)
        }
        None => Ok(Effect::Ignored),
    }
}

/// Deletes the category; the store's cascade removes its tasks.
pub fn delete_category(
    store: &impl TableStore,
    owner: &Owner,
    category_id: CategoryID,
) -> InternalResult<Effect> {
    store.delete(Table::Categories, owner, category_id)?;
    tracing::info!(%owner, category_id, "category deleted");

    Ok(Effect::Written)
}

pub fn plan_category_reorder(
    categories: &[BoardCategory],
    request: &ReorderCategoryRequest,
) -> InternalResult<Vec<(CategoryID, CategoryPatch)>> {
    let slots: Vec<Slot<CategoryID, ()>> = categories
        .iter()
        .map(|category| Slot {
            id: category.id,
            scope: (),
            position: category.position,
        })
        .collect();
    let plan = reorder(
        &slots,
        &MoveSpec {
            dragged: request.dragged,
            target: DropTarget::Item(request.over),
        },
    )?;

    Ok(plan
        .updates
        .into_iter()
        .map(|update| {
            (
                update.id,
                CategoryPatch {
                    position: Some(update.position),
                    ..CategoryPatch::default()
                },
            )
        })
        .collect())
}

pub fn reorder_category(
    store: &impl TableStore,
    owner: &Owner,
    request: &ReorderCategoryRequest,
) -> InternalResult<BatchReport> {
    let categories = fetch_categories(store, owner)?;
    let patches = plan_category_reorder(&categories, request)?;

    let mut report = BatchReport::default();
    for (category_id, patch) in &patches {
        let result = to_row(patch)
            .and_then(|row| store.update(Table::Categories, owner, *category_id, row));
        report.record(Table::Categories, *category_id, result);
    }

    Ok(report)
}

// Board tasks

fn missing_category(category_id: CategoryID) -> InternalError {
    InternalError::NotFound {
        table: Table::Categories.name(),
        id: category_id,
    }
}

/// Fails with `NotFound` unless `category_id` is one of the owner's own lanes.
pub fn ensure_category(
    store: &impl TableStore,
    owner: &Owner,
    category_id: CategoryID,
) -> InternalResult<()> {
    if fetch_categories(store, owner)?
        .iter()
        .any(|category| category.id == category_id)
    {
        Ok(())
    } else {
        Err(missing_category(category_id))
    }
}

pub fn add_board_task(
    store: &impl TableStore,
    owner: &Owner,
    draft: &BoardTaskDraft,
    now: DateTime<Utc>,
) -> InternalResult<Effect> {
    let title = match non_blank(&draft.title) {
        Some(title) => title,
        None => return Ok(Effect::Ignored),
    };
    ensure_category(store, owner, draft.category_id)?;

    let task = NewBoardTask {
        title,
        status: TaskStatus::Todo,
        color: color_or_default(&draft.color),
        category_id: draft.category_id,
        task_date: draft.task_date,
        position: 0,
        owner: owner.clone(),
        created_at: now,
    };
    let id = store.insert(Table::BoardTasks, to_row(&task)?)?;
    tracing::info!(%owner, id, category_id = draft.category_id, "board task added");

    Ok(Effect::Written)
}

pub fn board_task_patch(draft: &BoardTaskDraft) -> Option<BoardTaskPatch> {
    Some(BoardTaskPatch {
        title: Some(non_blank(&draft.title)?),
        color: draft.color.clone(),
        category_id: Some(draft.category_id),
        task_date: Some(draft.task_date),
        ..BoardTaskPatch::default()
    })
}

pub fn patch_board_task(
    store: &impl TableStore,
    owner: &Owner,
    task_id: BoardTaskID,
    patch: &BoardTaskPatch,
) -> InternalResult<()> {
    store.update(Table::BoardTasks, owner, task_id, to_row(patch)?)
}

pub fn set_board_task(
    store: &impl TableStore,
    owner: &Owner,
    request: &SetBoardTaskRequest,
) -> InternalResult<Effect> {
    match board_task_patch(&request.draft) {
        Some(patch) => {
            ensure_category(store, owner, request.draft.category_id)?;
            patch_board_task(store, owner, request.task_id, &patch)?;
            Ok(Effect::Written)
        }
        None => Ok(Effect::Ignored),
    }
}

pub fn board_toggle_patch(task: &BoardTask) -> BoardTaskPatch {
    BoardTaskPatch {
        status: Some(task.status.toggled()),
        ..BoardTaskPatch::default()
    }
}

pub fn toggle_board_task(
    store: &impl TableStore,
    owner: &Owner,
    task_id: BoardTaskID,
) -> InternalResult<Effect> {
    let task = find_board_task(store, owner, task_id)?;
    patch_board_task(store, owner, task_id, &board_toggle_patch(&task))?;

    Ok(Effect::Written)
}

pub fn delete_board_task(
    store: &impl TableStore,
    owner: &Owner,
    task_id: BoardTaskID,
) -> InternalResult<Effect> {
    store.delete(Table::BoardTasks, owner, task_id)?;

    Ok(Effect::Written)
}

impl BoardTaskPatch {
    pub fn apply_to(&self, task: &mut BoardTask) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(color) = &self.color {
            task.color = Some(color.clone());
        }
        if let Some(category_id) = self.category_id {
            task.category_id = category_id;
        }
        if let Some(task_date) = self.task_date {
            task.task_date = task_date;
        }
        if let Some(position) = self.position {
            task.position = position;
        }
    }
}

impl CategoryPatch {
    pub fn apply_to(&self, category: &mut BoardCategory) {
        if let Some(title) = &self.title {
            category.title = title.clone();
        }
        if let Some(color) = &self.color {
            category.color = Some(color.clone());
        }
        if let Some(position) = self.position {
            category.position = position;
        }
    }
}

/// A drop onto a cell must name one of `categories`; drops onto tasks take the
/// target task's cell.
pub fn plan_board_move(
    tasks: &[BoardTask],
    categories: &[BoardCategory],
    spec: &BoardTaskMove,
) -> InternalResult<Vec<(BoardTaskID, BoardTaskPatch)>> {
    if let DropTarget::Scope(cell) = &spec.target {
        if !categories.iter().any(|category| category.id == cell.category_id) {
            return Err(missing_category(cell.category_id));
        }
    }

    let slots: Vec<Slot<BoardTaskID, Cell>> = tasks
        .iter()
        .map(|task| Slot {
            id: task.id,
            scope: task.cell(),
            position: task.position,
        })
        .collect();
    let plan = reorder(&slots, spec)?;

    Ok(plan
        .updates
        .into_iter()
        .map(|update| {
            let mut patch = BoardTaskPatch {
                position: Some(update.position),
                ..BoardTaskPatch::default()
            };
            if let Some(cell) = update.scope {
                patch.category_id = Some(cell.category_id);
                patch.task_date = Some(cell.task_date);
            }
            (update.id, patch)
        })
        .collect())
}

pub fn persist_board_patches(
    store: &impl TableStore,
    owner: &Owner,
    patches: &[(BoardTaskID, BoardTaskPatch)],
) -> BatchReport {
    let mut report = BatchReport::default();
    for (task_id, patch) in patches {
        report.record(
            Table::BoardTasks,
            *task_id,
            patch_board_task(store, owner, *task_id, patch),
        );
    }

    report
}

pub fn move_board_task(
    store: &impl TableStore,
    owner: &Owner,
    spec: &BoardTaskMove,
) -> InternalResult<BatchReport> {
    let tasks = fetch_board_tasks(store, owner)?;
    let categories = fetch_categories(store, owner)?;
    let patches = plan_board_move(&tasks, &categories, spec)?;

    Ok(persist_board_patches(store, owner, &patches))
}
