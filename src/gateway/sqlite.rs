use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rusqlite::params_from_iter;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::Value;

use super::{Column, ColumnKind, Direction, OrderBy, Row, Table, TableStore};
use crate::data::{DBConnection, Owner, RowID};
use crate::internal_error::{InternalError, InternalResult};

#[derive(Clone)]
pub struct SqliteTableStore {
    db_connection: DBConnection,
}

impl SqliteTableStore {
    pub fn new(db_connection: DBConnection) -> SqliteTableStore {
        SqliteTableStore { db_connection }
    }
}

fn json_to_sql(table: Table, column: Column, value: &Value) -> InternalResult<SqlValue> {
    let mismatch = || {
        InternalError::invalid(format!(
            "bad value for {}.{}: {}",
            table.name(),
            column.name,
            value
        ))
    };

    match (column.kind, value) {
        (_, Value::Null) => Ok(SqlValue::Null),
        (ColumnKind::Integer, Value::Number(n)) => {
            n.as_i64().map(SqlValue::Integer).ok_or_else(mismatch)
        }
        (ColumnKind::Text, Value::String(s)) => Ok(SqlValue::Text(s.clone())),
        (ColumnKind::Timestamp, Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|instant| SqlValue::Integer(instant.timestamp_millis()))
            .map_err(|_| mismatch()),
        _ => Err(mismatch()),
    }
}

fn sql_to_json(column: Column, value: ValueRef) -> InternalResult<Value> {
    match (column.kind, value) {
        (_, ValueRef::Null) => Ok(Value::Null),
        (ColumnKind::Timestamp, ValueRef::Integer(millis)) => Utc
            .timestamp_millis_opt(millis)
            .single()
            .map(|instant| Value::String(instant.to_rfc3339_opts(SecondsFormat::Millis, true)))
            .ok_or_else(|| InternalError::Generic(format!("bad stored instant {}", millis))),
        (_, ValueRef::Integer(n)) => Ok(Value::from(n)),
        (_, ValueRef::Text(bytes)) => Ok(Value::String(String::from_utf8_lossy(bytes).into_owned())),
        (_, ValueRef::Real(f)) => Ok(Value::from(f)),
        (_, ValueRef::Blob(_)) => Err(InternalError::Generic(format!(
            "unexpected blob in column {}",
            column.name
        ))),
    }
}

fn order_clause(table: Table, order: &[OrderBy]) -> InternalResult<String> {
    let mut terms = Vec::with_capacity(order.len() + 1);
    for term in order {
        let column = table.column(term.column)?;
        let direction = match term.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        terms.push(format!("{} {}", column.name, direction));
    }
    terms.push("id ASC".to_string());

    Ok(terms.join(", "))
}

/// Splits a row into validated column names and bound values.
fn bind_row(table: Table, row: &Row) -> InternalResult<(Vec<&'static str>, Vec<SqlValue>)> {
    let mut names = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for (name, value) in row.iter() {
        let column = table.column(name)?;
        names.push(column.name);
        values.push(json_to_sql(table, column, value)?);
    }

    Ok((names, values))
}

impl TableStore for SqliteTableStore {
    fn list(&self, table: Table, owner: &Owner, order: &[OrderBy]) -> InternalResult<Vec<Row>> {
        let columns = table.columns();
        let selected = columns
            .iter()
            .map(|column| column.name)
            .collect::<Vec<&str>>()
            .join(", ");
        let sql = format!(
            "SELECT id, {} FROM {} WHERE owner = ?1 ORDER BY {}",
            selected,
            table.name(),
            order_clause(table, order)?
        );

        let db_connection = self.db_connection.lock()?;
        let mut statement = db_connection.prepare(&sql)?;
        let mut rows = statement.query([owner.as_str()])?;

        let mut result = vec![];
        while let Some(row) = rows.next()? {
            let mut json_row = Row::new();
            json_row.insert("id".to_string(), Value::from(row.get::<usize, RowID>(0)?));

            for (index, column) in columns.iter().enumerate() {
                let value = sql_to_json(*column, row.get_ref(index + 1)?)?;
                json_row.insert(column.name.to_string(), value);
            }

            result.push(json_row);
        }

        Ok(result)
    }

    fn insert(&self, table: Table, row: Row) -> InternalResult<RowID> {
        if !row.contains_key("owner") {
            return Err(InternalError::invalid("rows must carry an owner"));
        }

        let (names, values) = bind_row(table, &row)?;
        let placeholders = (1..=names.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<String>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            names.join(", "),
            placeholders
        );

        let db_connection = self.db_connection.lock()?;
        db_connection.execute(&sql, params_from_iter(values.iter()))?;
        let id = db_connection.last_insert_rowid();
        tracing::debug!(table = table.name(), id, "row inserted");

        Ok(id)
    }

    fn update(&self, table: Table, owner: &Owner, id: RowID, patch: Row) -> InternalResult<()> {
        if patch.is_empty() {
            return Err(InternalError::invalid("empty update"));
        }
        if patch.contains_key("owner") {
            return Err(InternalError::invalid("owner cannot be reassigned"));
        }

        let (names, mut values) = bind_row(table, &patch)?;
        let assignments = names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{} = ?{}", name, i + 1))
            .collect::<Vec<String>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{} AND owner = ?{}",
            table.name(),
            assignments,
            names.len() + 1,
            names.len() + 2
        );
        values.push(SqlValue::Integer(id));
        values.push(SqlValue::Text(owner.as_str().to_string()));

        let db_connection = self.db_connection.lock()?;
        let changed = db_connection.execute(&sql, params_from_iter(values.iter()))?;
        if changed == 0 {
            return Err(InternalError::NotFound {
                table: table.name(),
                id,
            });
        }

        Ok(())
    }

    fn delete(&self, table: Table, owner: &Owner, id: RowID) -> InternalResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1 AND owner = ?2", table.name());

        let db_connection = self.db_connection.lock()?;
        let changed = db_connection.execute(&sql, rusqlite::params![id, owner.as_str()])?;
        if changed == 0 {
            return Err(InternalError::NotFound {
                table: table.name(),
                id,
            });
        }
        tracing::debug!(table = table.name(), id, "row deleted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory_database;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn task_row(owner: &str, title: &str, position: i64, created_at: &str) -> Row {
        row(json!({
            "title": title,
            "status": "todo",
            "category": "Personal",
            "color": "#ea580c",
            "owner": owner,
            "start_time": "2026-02-17T02:00:00Z",
            "created_at": created_at,
            "position": position,
        }))
    }

    #[test]
    fn list_is_scoped_by_owner_and_ordered() {
        let store = SqliteTableStore::new(memory_database());
        let khanh = Owner::new("khanh").unwrap();

        store.insert(Table::Tasks, task_row("khanh", "b", 1, "2026-02-17T01:00:00Z")).unwrap();
        store.insert(Table::Tasks, task_row("khanh", "a", 0, "2026-02-17T01:00:00Z")).unwrap();
        store.insert(Table::Tasks, task_row("khanh", "c", 0, "2026-02-17T03:00:00Z")).unwrap();
        store.insert(Table::Tasks, task_row("lan", "x", 0, "2026-02-17T01:00:00Z")).unwrap();

        let rows = store
            .list(
                Table::Tasks,
                &khanh,
                &[OrderBy::asc("position"), OrderBy::desc("created_at")],
            )
            .unwrap();
        let titles: Vec<&str> = rows.iter().map(|r| r["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
        assert_eq!(rows[0]["created_at"], json!("2026-02-17T03:00:00.000Z"));
    }

    #[test]
    fn update_and_delete_respect_owner() {
        let store = SqliteTableStore::new(memory_database());
        let khanh = Owner::new("khanh").unwrap();
        let lan = Owner::new("lan").unwrap();
        let id = store
            .insert(Table::Tasks, task_row("khanh", "a", 0, "2026-02-17T01:00:00Z"))
            .unwrap();

        let patch = row(json!({ "status": "done" }));
        assert!(matches!(
            store.update(Table::Tasks, &lan, id, patch.clone()),
            Err(InternalError::NotFound { .. })
        ));
        store.update(Table::Tasks, &khanh, id, patch).unwrap();
        let rows = store.list(Table::Tasks, &khanh, &[]).unwrap();
        assert_eq!(rows[0]["status"], json!("done"));

        assert!(store.delete(Table::Tasks, &lan, id).is_err());
        store.delete(Table::Tasks, &khanh, id).unwrap();
        assert!(store.list(Table::Tasks, &khanh, &[]).unwrap().is_empty());
    }

    #[test]
    fn bad_columns_and_values_are_rejected() {
        let store = SqliteTableStore::new(memory_database());
        let mut bad = task_row("khanh", "a", 0, "2026-02-17T01:00:00Z");
        bad.insert("nickname".into(), json!("x"));
        assert!(matches!(
            store.insert(Table::Tasks, bad),
            Err(InternalError::Invalid(_))
        ));

        let bad_time = task_row("khanh", "a", 0, "yesterday");
        assert!(matches!(
            store.insert(Table::Tasks, bad_time),
            Err(InternalError::Invalid(_))
        ));
    }

    #[test]
    fn deleting_a_category_cascades_to_its_tasks() {
        let store = SqliteTableStore::new(memory_database());
        let khanh = Owner::new("khanh").unwrap();
        let category = store
            .insert(
                Table::Categories,
                row(json!({
                    "title": "Clips",
                    "color": "#16a34a",
                    "owner": "khanh",
                    "position": 0,
                    "created_at": "2026-02-17T01:00:00Z",
                })),
            )
            .unwrap();
        store
            .insert(
                Table::BoardTasks,
                row(json!({
                    "title": "Shoot video 1",
                    "status": "todo",
                    "color": "#ea580c",
                    "category_id": category,
                    "task_date": "2026-02-17",
                    "position": 0,
                    "owner": "khanh",
                    "created_at": "2026-02-17T01:00:00Z",
                })),
            )
            .unwrap();

        store.delete(Table::Categories, &khanh, category).unwrap();
        assert!(store.list(Table::BoardTasks, &khanh, &[]).unwrap().is_empty());
    }
}
