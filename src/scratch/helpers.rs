use rusqlite::{params, OptionalExtension};

use crate::data::DBConnection;
use crate::internal_error::InternalResult;

/// One free-text blob per key.
pub trait ScratchStore {
    fn get(&self, key: &str) -> InternalResult<Option<String>>;

    fn set(&self, key: &str, text: &str) -> InternalResult<()>;
}

#[derive(Clone)]
pub struct SqliteScratchStore {
    db_connection: DBConnection,
}

impl SqliteScratchStore {
    pub fn new(db_connection: DBConnection) -> SqliteScratchStore {
        SqliteScratchStore { db_connection }
    }
}

impl ScratchStore for SqliteScratchStore {
    fn get(&self, key: &str) -> InternalResult<Option<String>> {
        let db_connection = self.db_connection.lock()?;
        let content = db_connection
            .query_row(
                "SELECT content FROM scratchpad WHERE key = (?1)",
                params![key],
                |row| row.get::<usize, String>(0),
            )
            .optional()?;

        Ok(content)
    }

    fn set(&self, key: &str, text: &str) -> InternalResult<()> {
        let db_connection = self.db_connection.lock()?;
        db_connection.execute(
            "INSERT INTO scratchpad (key, content) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET content = excluded.content",
            params![key, text],
        )?;

        Ok(())
    }
}
