//! Local cache of conversation summaries.
//!
//! Lets the conversation list render instantly on launch while the first
//! network fetch is still in flight, and saves a round trip when nothing
//! changed. Messages are never cached here; they always come from a full
//! server snapshot.

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use rusqlite::{Connection, params};

use crate::api::error::ApiError;
use crate::api::models::Conversation;

#[derive(Debug, Clone)]
pub struct ConversationCache {
    path: PathBuf,
}

impl ConversationCache {
    /// Cache in the platform data directory.
    pub fn open_default() -> Result<Self, ApiError> {
        let proj = ProjectDirs::from("com", "baylink", "BayLink")
            .ok_or_else(|| ApiError::Config("no data directory".into()))?;
        Self::open_at(proj.data_dir().join("cache.sqlite"))
    }

    pub fn open_at(path: PathBuf) -> Result<Self, ApiError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ApiError::Config(e.to_string()))?;
        }
        let cache = Self { path };
        let conn = cache.conn()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                updated_at INTEGER NOT NULL,
                raw_json TEXT NOT NULL
            );
            "#,
        )?;
        Ok(cache)
    }

    fn conn(&self) -> rusqlite::Result<Connection> {
        Connection::open(&self.path)
    }

    pub fn upsert(&self, conversations: &[Conversation]) -> Result<(), ApiError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for conversation in conversations {
            let raw = serde_json::to_string(conversation)?;
            tx.execute(
                r#"
                INSERT INTO conversations (id, updated_at, raw_json)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    updated_at=excluded.updated_at,
                    raw_json=excluded.raw_json
                "#,
                params![conversation.id, conversation.updated_at, raw],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Cached summaries, most recently updated first.
    pub fn recent(&self, limit: usize) -> Result<Vec<Conversation>, ApiError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT raw_json FROM conversations ORDER BY updated_at DESC, id ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for raw in rows {
            out.push(serde_json::from_str(&raw?)?);
        }
        Ok(out)
    }
}
