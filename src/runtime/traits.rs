//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{Conversation, Database, DbResult, Message, Role};
use async_trait::async_trait;
use std::sync::Arc;

/// Storage for conversations and their turns
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the conversation, or create an empty unnamed one for `None`
    async fn resolve(&self, conversation_id: Option<i64>) -> DbResult<Conversation> {
        match conversation_id {
            Some(id) => self.get_session(id).await,
            None => self.create_session().await,
        }
    }

    async fn create_session(&self) -> DbResult<Conversation>;

    async fn get_session(&self, conversation_id: i64) -> DbResult<Conversation>;

    /// All conversations, newest first
    async fn list_sessions(&self) -> DbResult<Vec<Conversation>>;

    async fn rename(&self, conversation_id: i64, name: &str) -> DbResult<Conversation>;

    /// Remove a conversation with all of its turns, all or nothing
    async fn delete_session(&self, conversation_id: i64) -> DbResult<()>;

    async fn append_turn(&self, conversation_id: i64, role: Role, content: &str) -> DbResult<Message>;

    /// Turns in the order they were appended
    async fn list_turns(&self, conversation_id: i64) -> DbResult<Vec<Message>>;

    /// Remove all turns, keeping the conversation and its name
    async fn clear_turns(&self, conversation_id: i64) -> DbResult<usize>;
}

// ============================================================================
// Arc implementation for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn resolve(&self, conversation_id: Option<i64>) -> DbResult<Conversation> {
        (**self).resolve(conversation_id).await
    }

    async fn create_session(&self) -> DbResult<Conversation> {
        (**self).create_session().await
    }

    async fn get_session(&self, conversation_id: i64) -> DbResult<Conversation> {
        (**self).get_session(conversation_id).await
    }

    async fn list_sessions(&self) -> DbResult<Vec<Conversation>> {
        (**self).list_sessions().await
    }

    async fn rename(&self, conversation_id: i64, name: &str) -> DbResult<Conversation> {
        (**self).rename(conversation_id, name).await
    }

    async fn delete_session(&self, conversation_id: i64) -> DbResult<()> {
        (**self).delete_session(conversation_id).await
    }

    async fn append_turn(&self, conversation_id: i64, role: Role, content: &str) -> DbResult<Message> {
        (**self).append_turn(conversation_id, role, content).await
    }

    async fn list_turns(&self, conversation_id: i64) -> DbResult<Vec<Message>> {
        (**self).list_turns(conversation_id).await
    }

    async fn clear_turns(&self, conversation_id: i64) -> DbResult<usize> {
        (**self).clear_turns(conversation_id).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

#[async_trait]
impl SessionStore for Database {
    async fn create_session(&self) -> DbResult<Conversation> {
        self.create_conversation()
    }

    async fn get_session(&self, conversation_id: i64) -> DbResult<Conversation> {
        self.get_conversation(conversation_id)
    }

    async fn list_sessions(&self) -> DbResult<Vec<Conversation>> {
        self.list_conversations()
    }

    async fn rename(&self, conversation_id: i64, name: &str) -> DbResult<Conversation> {
        self.rename_conversation(conversation_id, name)
    }

    async fn delete_session(&self, conversation_id: i64) -> DbResult<()> {
        self.delete_conversation(conversation_id)
    }

    async fn append_turn(&self, conversation_id: i64, role: Role, content: &str) -> DbResult<Message> {
        self.add_message(conversation_id, role, content)
    }

    async fn list_turns(&self, conversation_id: i64) -> DbResult<Vec<Message>> {
        self.get_messages(conversation_id)
    }

    async fn clear_turns(&self, conversation_id: i64) -> DbResult<usize> {
        self.clear_messages(conversation_id)
    }
}
