//! Database module for the chat backend
//!
//! Provides persistence for conversations and their messages.

mod schema;

pub use schema::*;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(i64),
    #[error("Transaction failed: {0}")]
    Transaction(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    /// A panic while holding the lock cannot leave SQLite half-written, so a
    /// poisoned mutex is still safe to reuse.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Conversation Operations ====================

    /// Create a new, unnamed conversation
    pub fn create_conversation(&self) -> DbResult<Conversation> {
        let conn = self.conn();
        let now = now_micros();

        conn.execute(
            "INSERT INTO conversations (name, created_at) VALUES ('', ?1)",
            params![format_datetime(&now)],
        )?;

        Ok(Conversation {
            id: conn.last_insert_rowid(),
            created_at: now,
            name: String::new(),
        })
    }

    /// Get conversation by ID
    pub fn get_conversation(&self, id: i64) -> DbResult<Conversation> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, created_at, name FROM conversations WHERE id = ?1",
            params![id],
            parse_conversation_row,
        )
        .optional()?
        .ok_or(DbError::ConversationNotFound(id))
    }

    /// List all conversations, newest first
    pub fn list_conversations(&self) -> DbResult<Vec<Conversation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, created_at, name FROM conversations
             ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map([], parse_conversation_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Rename conversation
    pub fn rename_conversation(&self, id: i64, name: &str) -> DbResult<Conversation> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE conversations SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;

        if updated == 0 {
            return Err(DbError::ConversationNotFound(id));
        }

        conn.query_row(
            "SELECT id, created_at, name FROM conversations WHERE id = ?1",
            params![id],
            parse_conversation_row,
        )
        .map_err(DbError::from)
    }

    /// Delete a conversation and all its messages as one transaction.
    ///
    /// Deleting an unknown ID is not an error; there is nothing to remove.
    pub fn delete_conversation(&self, id: i64) -> DbResult<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| DbError::Transaction(e.to_string()))?;

        let messages = tx
            .execute("DELETE FROM messages WHERE conversation_id = ?1", params![id])
            .map_err(|e| DbError::Transaction(format!("deleting messages: {e}")))?;
        let conversations = tx
            .execute("DELETE FROM conversations WHERE id = ?1", params![id])
            .map_err(|e| DbError::Transaction(format!("deleting conversation: {e}")))?;

        tx.commit()
            .map_err(|e| DbError::Transaction(format!("commit: {e}")))?;

        tracing::info!(
            conv_id = id,
            messages,
            found = conversations > 0,
            "Deleted conversation"
        );
        Ok(())
    }

    // ==================== Message Operations ====================

    /// Append a message after the last message of a conversation.
    ///
    /// The sequence id and timestamp are computed under the connection lock,
    /// so a message is never ordered before one appended earlier.
    pub fn add_message(&self, conversation_id: i64, role: Role, content: &str) -> DbResult<Message> {
        let conn = self.conn();

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
            params![conversation_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(DbError::ConversationNotFound(conversation_id));
        }

        let last: Option<(i64, String)> = conn
            .query_row(
                "SELECT sequence_id, created_at FROM messages
                 WHERE conversation_id = ?1 ORDER BY sequence_id DESC LIMIT 1",
                params![conversation_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (sequence_id, now) = match last {
            Some((seq, created_at)) => (seq + 1, now_micros().max(parse_datetime(&created_at))),
            None => (1, now_micros()),
        };

        conn.execute(
            "INSERT INTO messages (conversation_id, sequence_id, sender, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![conversation_id, sequence_id, role, content, format_datetime(&now)],
        )?;

        Ok(Message {
            id: conn.last_insert_rowid(),
            conversation_id,
            sequence_id,
            role,
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Get messages for a conversation, oldest first
    pub fn get_messages(&self, conversation_id: i64) -> DbResult<Vec<Message>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, sequence_id, sender, content, created_at
             FROM messages WHERE conversation_id = ?1 ORDER BY sequence_id ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id], parse_message_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Remove every message of a conversation, keeping the conversation itself
    pub fn clear_messages(&self, conversation_id: i64) -> DbResult<usize> {
        let conn = self.conn();
        let deleted = conn.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
        )?;
        Ok(deleted)
    }

    /// Count messages in a conversation
    #[allow(dead_code)] // Used in tests
    pub fn message_count(&self, conversation_id: i64) -> DbResult<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )
        .map_err(DbError::from)
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: InvalidRole| FromSqlError::Other(Box::new(e)))
    }
}

fn parse_conversation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        created_at: parse_datetime(&row.get::<_, String>(1)?),
        name: row.get(2)?,
    })
}

fn parse_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sequence_id: row.get(2)?,
        role: row.get(3)?,
        content: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
/// Current time at the precision timestamps are stored with
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
