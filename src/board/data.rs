use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{serialize_millis, Owner, RowID};
use crate::ordering::MoveSpec;
use crate::todo::data::{TaskStatus, TODO_COLOR};

pub type CategoryID = RowID;
pub type BoardTaskID = RowID;

pub const DEFAULT_COLOR: &str = TODO_COLOR;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub code: &'static str,
    pub name: &'static str,
}

/// Colours offered by the board editor.
pub const PALETTE: [PaletteColor; 8] = [
    PaletteColor { code: "#ea580c", name: "Orange" },
    PaletteColor { code: "#16a34a", name: "Green" },
    PaletteColor { code: "#dc2626", name: "Red" },
    PaletteColor { code: "#2563eb", name: "Blue" },
    PaletteColor { code: "#9333ea", name: "Purple" },
    PaletteColor { code: "#db2777", name: "Pink" },
    PaletteColor { code: "#f59e0b", name: "Amber" },
    PaletteColor { code: "#10b981", name: "Emerald" },
];

/// A lane on the timeline board.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BoardCategory {
    pub id: CategoryID,
    pub title: String,
    pub color: Option<String>,
    pub owner: Owner,
    pub position: i64,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BoardTask {
    pub id: BoardTaskID,
    pub title: String,
    pub status: TaskStatus,
    pub color: Option<String>,
    pub category_id: CategoryID,
    pub task_date: NaiveDate,
    pub position: i64,
    pub owner: Owner,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
}

/// One board cell: a category on a date.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub category_id: CategoryID,
    pub task_date: NaiveDate,
}

impl BoardTask {
    pub fn cell(&self) -> Cell {
        Cell {
            category_id: self.category_id,
            task_date: self.task_date,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct NewCategory {
    pub title: String,
    pub color: Option<String>,
    pub owner: Owner,
    pub position: i64,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct NewBoardTask {
    pub title: String,
    pub status: TaskStatus,
    pub color: Option<String>,
    pub category_id: CategoryID,
    pub task_date: NaiveDate,
    pub position: i64,
    pub owner: Owner,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct BoardTaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryID>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CategoryDraft {
    pub title: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SetCategoryRequest {
    pub category_id: CategoryID,
    #[serde(flatten)]
    pub draft: CategoryDraft,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct CategoryIdRequest {
    pub category_id: CategoryID,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct ReorderCategoryRequest {
    pub dragged: CategoryID,
    pub over: CategoryID,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BoardTaskDraft {
    pub title: String,
    #[serde(default)]
    pub color: Option<String>,
    pub category_id: CategoryID,
    pub task_date: NaiveDate,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SetBoardTaskRequest {
    pub task_id: BoardTaskID,
    #[serde(flatten)]
    pub draft: BoardTaskDraft,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct BoardTaskIdRequest {
    pub task_id: BoardTaskID,
}

/// Drop target for a board task: another task, or a cell.
pub type BoardTaskMove = MoveSpec<BoardTaskID, Cell>;
