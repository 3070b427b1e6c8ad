use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rocket::request::FromParam;
use rusqlite::Connection;
use serde::{Deserialize, Serialize, Serializer};

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::internal_error::{InternalError, InternalResult};

pub type DBConnection = Arc<Mutex<Connection>>;
pub type RowID = i64;

/// Writes an instant as RFC 3339 in UTC with millisecond precision, the same form
/// the store returns.
pub fn serialize_millis<S: Serializer>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Partitions every persisted row by user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Owner(String);

impl Owner {
    pub fn new(name: impl Into<String>) -> InternalResult<Owner> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InternalError::invalid("owner must not be empty"));
        }

        Ok(Owner(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'a> FromParam<'a> for Owner {
    type Error = InternalError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        Owner::new(param)
    }
}

/// A `YYYY-MM-DD` path segment.
#[derive(Debug, Clone, Copy)]
pub struct DayParam(pub NaiveDate);

impl<'a> FromParam<'a> for DayParam {
    type Error = InternalError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        NaiveDate::parse_from_str(param, "%Y-%m-%d")
            .map(DayParam)
            .map_err(|e| InternalError::invalid(format!("bad date '{}': {}", param, e)))
    }
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS staff_tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'todo',
        category TEXT NOT NULL DEFAULT 'Personal',
        color TEXT,
        owner TEXT NOT NULL,
        start_time INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        position INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_staff_tasks_owner ON staff_tasks(owner, position);
    CREATE TABLE IF NOT EXISTS project_categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        color TEXT,
        owner TEXT NOT NULL,
        position INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS timeline_tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'todo',
        color TEXT,
        category_id INTEGER NOT NULL REFERENCES project_categories(id) ON DELETE CASCADE,
        task_date TEXT NOT NULL,
        position INTEGER NOT NULL DEFAULT 0,
        owner TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_timeline_tasks_cell ON timeline_tasks(category_id, task_date);
    CREATE TABLE IF NOT EXISTS scratchpad (
        key TEXT PRIMARY KEY,
        content TEXT NOT NULL
    );
";

pub fn prepare_connection(connection: &Connection) -> InternalResult<()> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn open_database(path: &str) -> InternalResult<DBConnection> {
    let connection = if path == ":memory:" {
        Connection::open_in_memory()?
    } else {
        Connection::open(path)?
    };
    prepare_connection(&connection)?;
    tracing::info!(path, "database ready");

    Ok(Arc::new(Mutex::new(connection)))
}

#[cfg(test)]
pub fn memory_database() -> DBConnection {
    open_database(":memory:").expect("in-memory database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_owner_is_rejected() {
        assert!(Owner::new("  ").is_err());
        assert_eq!(Owner::new("khanh").unwrap().as_str(), "khanh");
    }

    #[test]
    fn day_param_parses_iso_dates() {
        let day = DayParam::from_param("2026-02-17").unwrap();
        assert_eq!(day.0, NaiveDate::from_ymd_opt(2026, 2, 17).unwrap());
        assert!(DayParam::from_param("17/02/2026").is_err());
    }

    #[test]
    fn schema_is_idempotent() {
        let db = memory_database();
        let connection = db.lock().unwrap();
        prepare_connection(&connection).unwrap();
    }
}
