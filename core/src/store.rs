//! SQLite-backed key-value storage.
//!
//! RULE: Only store.rs talks to the database.
//! The persistence layer hands it opaque strings under a key.

use crate::error::SafeResult;
use rusqlite::{params, Connection, OptionalExtension};

pub struct SafeStore {
    conn: Connection,
}

impl SafeStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> SafeResult<Self> {
        let conn = Connection::open(path)?;
        // :memory: answers "memory" here instead of switching.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SafeResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SafeResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_kv.sql"))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> SafeResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn put(&self, key: &str, value: &str) -> SafeResult<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> SafeResult<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}
