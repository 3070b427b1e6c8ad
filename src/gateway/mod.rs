//! The table store every collection is read from and written to.
//!
//! Rows travel as JSON objects so that entity types only need serde; the store
//! checks every column name against the table's declared columns.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::data::{Owner, RowID};
use crate::internal_error::{InternalError, InternalResult};

pub mod sqlite;

pub use sqlite::SqliteTableStore;

pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Tasks,
    Categories,
    BoardTasks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    /// RFC 3339 on the wire, epoch milliseconds at rest.
    Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn column(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

const TASK_COLUMNS: &[Column] = &[
    column("title", ColumnKind::Text),
    column("status", ColumnKind::Text),
    column("category", ColumnKind::Text),
    column("color", ColumnKind::Text),
    column("owner", ColumnKind::Text),
    column("start_time", ColumnKind::Timestamp),
    column("created_at", ColumnKind::Timestamp),
    column("position", ColumnKind::Integer),
];

const CATEGORY_COLUMNS: &[Column] = &[
    column("title", ColumnKind::Text),
    column("color", ColumnKind::Text),
    column("owner", ColumnKind::Text),
    column("position", ColumnKind::Integer),
    column("created_at", ColumnKind::Timestamp),
];

const BOARD_TASK_COLUMNS: &[Column] = &[
    column("title", ColumnKind::Text),
    column("status", ColumnKind::Text),
    column("color", ColumnKind::Text),
    column("category_id", ColumnKind::Integer),
    column("task_date", ColumnKind::Text),
    column("position", ColumnKind::Integer),
    column("owner", ColumnKind::Text),
    column("created_at", ColumnKind::Timestamp),
];

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Tasks => "staff_tasks",
            Table::Categories => "project_categories",
            Table::BoardTasks => "timeline_tasks",
        }
    }

    /// Writable columns, `id` excluded.
    pub fn columns(self) -> &'static [Column] {
        match self {
            Table::Tasks => TASK_COLUMNS,
            Table::Categories => CATEGORY_COLUMNS,
            Table::BoardTasks => BOARD_TASK_COLUMNS,
        }
    }

    pub fn column(self, name: &str) -> InternalResult<Column> {
        self.columns()
            .iter()
            .find(|column| column.name == name)
            .copied()
            .ok_or_else(|| {
                InternalError::invalid(format!("unknown column '{}' on {}", name, self.name()))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: Direction,
}

impl OrderBy {
    pub const fn asc(column: &'static str) -> OrderBy {
        OrderBy {
            column,
            direction: Direction::Asc,
        }
    }

    pub const fn desc(column: &'static str) -> OrderBy {
        OrderBy {
            column,
            direction: Direction::Desc,
        }
    }
}

/// Row-level access keyed by owner and id. Multi-row operations are sequences of
/// these calls; nothing here is transactional across rows.
pub trait TableStore {
    fn list(&self, table: Table, owner: &Owner, order: &[OrderBy]) -> InternalResult<Vec<Row>>;

    fn insert(&self, table: Table, row: Row) -> InternalResult<RowID>;

    fn update(&self, table: Table, owner: &Owner, id: RowID, patch: Row) -> InternalResult<()>;

    fn delete(&self, table: Table, owner: &Owner, id: RowID) -> InternalResult<()>;
}

impl<S: TableStore + ?Sized> TableStore for &S {
    fn list(&self, table: Table, owner: &Owner, order: &[OrderBy]) -> InternalResult<Vec<Row>> {
        (**self).list(table, owner, order)
    }

    fn insert(&self, table: Table, row: Row) -> InternalResult<RowID> {
        (**self).insert(table, row)
    }

    fn update(&self, table: Table, owner: &Owner, id: RowID, patch: Row) -> InternalResult<()> {
        (**self).update(table, owner, id, patch)
    }

    fn delete(&self, table: Table, owner: &Owner, id: RowID) -> InternalResult<()> {
        (**self).delete(table, owner, id)
    }
}

pub fn to_row<T: Serialize>(value: &T) -> InternalResult<Row> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(InternalError::Generic(format!(
            "expected an object row, got {}",
            other
        ))),
    }
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> InternalResult<Vec<T>> {
    rows.into_iter()
        .map(|row| Ok(serde_json::from_value(Value::Object(row))?))
        .collect()
}

/// Outcome of a sequence of independent single-row writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn record(&mut self, table: Table, id: RowID, result: InternalResult<()>) {
        match result {
            Ok(()) => self.succeeded += 1,
            Err(e) => {
                tracing::warn!(table = table.name(), id, error = %e, "row write failed");
                self.failed += 1;
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_columns_are_rejected() {
        assert!(Table::Tasks.column("position").is_ok());
        assert!(matches!(
            Table::Tasks.column("position; DROP TABLE staff_tasks"),
            Err(InternalError::Invalid(_))
        ));
    }

    #[test]
    fn batch_report_counts_failures() {
        let mut report = BatchReport::default();
        report.record(Table::Tasks, 1, Ok(()));
        report.record(Table::Tasks, 2, Err(InternalError::from("boom")));
        assert_eq!(report, BatchReport { succeeded: 1, failed: 1 });
        assert!(!report.is_complete());
    }
}
