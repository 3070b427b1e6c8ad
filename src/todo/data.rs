use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{serialize_millis, Owner, RowID};
use crate::ordering::MoveSpec;

pub type TaskID = RowID;

pub const SCHEDULE_COLOR: &str = "#16a34a";
pub const TODO_COLOR: &str = "#ea580c";
pub const DONE_COLOR: &str = "#475569";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Done,
}

impl TaskStatus {
    pub fn toggled(self) -> TaskStatus {
        match self {
            TaskStatus::Todo => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Todo,
        }
    }
}

/// Free-text category; `Schedule` entries are fixed appointments, not todos.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum TaskCategory {
    Personal,
    Schedule,
    Other(String),
}

impl TaskCategory {
    pub fn is_schedule(&self) -> bool {
        matches!(self, TaskCategory::Schedule)
    }

    pub fn default_color(&self) -> &'static str {
        if self.is_schedule() {
            SCHEDULE_COLOR
        } else {
            TODO_COLOR
        }
    }
}

impl Default for TaskCategory {
    fn default() -> Self {
        TaskCategory::Personal
    }
}

impl From<String> for TaskCategory {
    fn from(name: String) -> TaskCategory {
        match name.as_str() {
            "Personal" => TaskCategory::Personal,
            "Schedule" => TaskCategory::Schedule,
            _ => TaskCategory::Other(name),
        }
    }
}

impl From<TaskCategory> for String {
    fn from(category: TaskCategory) -> String {
        match category {
            TaskCategory::Personal => "Personal".to_string(),
            TaskCategory::Schedule => "Schedule".to_string(),
            TaskCategory::Other(name) => name,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskID,
    pub title: String,
    pub status: TaskStatus,
    pub category: TaskCategory,
    pub color: Option<String>,
    pub owner: Owner,
    #[serde(serialize_with = "serialize_millis")]
    pub start_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
    pub position: i64,
}

/// Where `position` is meaningful: one local day, schedule entries apart.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskScope {
    pub day: NaiveDate,
    pub schedule: bool,
}

impl Task {
    pub fn day(&self, offset: &FixedOffset) -> NaiveDate {
        self.start_time.with_timezone(offset).date_naive()
    }

    pub fn scope(&self, offset: &FixedOffset) -> TaskScope {
        TaskScope {
            day: self.day(offset),
            schedule: self.category.is_schedule(),
        }
    }

    pub fn is_todo(&self) -> bool {
        self.status == TaskStatus::Todo
    }
}

/// Row shape for inserts.
#[derive(Serialize, Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub status: TaskStatus,
    pub category: TaskCategory,
    pub color: Option<String>,
    pub owner: Owner,
    #[serde(serialize_with = "serialize_millis")]
    pub start_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
    pub position: i64,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AddTaskRequest {
    pub title: String,
    /// Day to file the task under; "now" when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub category: TaskCategory,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SetTaskRequest {
    pub task_id: TaskID,
    pub title: String,
    pub color: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct TaskIdRequest {
    pub task_id: TaskID,
}

/// Drop target for a task: another task, or a day.
pub type TaskMove = MoveSpec<TaskID, NaiveDate>;

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct RolloverRequest {
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
    #[serde(default)]
    pub confirmed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_round_trip_through_text() {
        assert_eq!(TaskCategory::from("Schedule".to_string()), TaskCategory::Schedule);
        assert_eq!(
            TaskCategory::from("Work".to_string()),
            TaskCategory::Other("Work".to_string())
        );
        assert_eq!(String::from(TaskCategory::Personal), "Personal");
    }

    #[test]
    fn schedule_entries_default_to_green() {
        assert_eq!(TaskCategory::Schedule.default_color(), SCHEDULE_COLOR);
        assert_eq!(TaskCategory::Other("Work".into()).default_color(), TODO_COLOR);
    }

    #[test]
    fn instants_serialize_with_milliseconds() {
        use chrono::TimeZone;

        let at = Utc.with_ymd_and_hms(2026, 2, 17, 2, 0, 0).unwrap();
        let task = Task {
            id: 1,
            title: "Buy flowers".into(),
            status: TaskStatus::Todo,
            category: TaskCategory::Personal,
            color: None,
            owner: Owner::new("khanh").unwrap(),
            start_time: at,
            created_at: at,
            position: 0,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["start_time"], "2026-02-17T02:00:00.000Z");
        assert_eq!(json["created_at"], "2026-02-17T02:00:00.000Z");

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back.start_time, at);
    }

    #[test]
    fn status_toggle_is_an_involution() {
        assert_eq!(TaskStatus::Todo.toggled(), TaskStatus::Done);
        assert_eq!(TaskStatus::Todo.toggled().toggled(), TaskStatus::Todo);
    }
}
