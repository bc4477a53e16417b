//! Mock implementations for testing
//!
//! These mocks enable orchestrator and handler tests without real I/O.

use super::traits::SessionStore;
use crate::db::{Conversation, Database, DbError, DbResult, Message, Role};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a plain text response
    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse::from_text(text));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.next_response(request)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Delayed Mock LLM Client (for timeout testing)
// ============================================================================

/// Mock LLM client that sleeps before answering
pub struct DelayedMockLlmClient {
    inner: MockLlmClient,
    delay: Duration,
}

impl DelayedMockLlmClient {
    pub fn new(model_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockLlmClient::new(model_id),
            delay,
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.inner.queue_response(response);
    }
}

#[async_trait]
impl LlmService for DelayedMockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        tokio::time::sleep(self.delay).await;
        self.inner.next_response(request)
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// Failing Store (for persistence error testing)
// ============================================================================

/// Wraps a real database and fails selected operations on demand
pub struct FailingStore {
    inner: Database,
    fail_appends: AtomicBool,
    fail_renames: AtomicBool,
    fail_history: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: Database) -> Self {
        Self {
            inner,
            fail_appends: AtomicBool::new(false),
            fail_renames: AtomicBool::new(false),
            fail_history: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &Database {
        &self.inner
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_renames(&self, fail: bool) {
        self.fail_renames.store(fail, Ordering::SeqCst);
    }

    pub fn fail_history(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    fn injected(flag: &AtomicBool, what: &str) -> DbResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(DbError::Transaction(format!("injected failure: {what}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn create_session(&self) -> DbResult<Conversation> {
        self.inner.create_session().await
    }

    async fn get_session(&self, conversation_id: i64) -> DbResult<Conversation> {
        self.inner.get_session(conversation_id).await
    }

    async fn list_sessions(&self) -> DbResult<Vec<Conversation>> {
        self.inner.list_sessions().await
    }

    async fn rename(&self, conversation_id: i64, name: &str) -> DbResult<Conversation> {
        Self::injected(&self.fail_renames, "rename")?;
        self.inner.rename(conversation_id, name).await
    }

    async fn delete_session(&self, conversation_id: i64) -> DbResult<()> {
        self.inner.delete_session(conversation_id).await
    }

    async fn append_turn(&self, conversation_id: i64, role: Role, content: &str) -> DbResult<Message> {
        Self::injected(&self.fail_appends, "append")?;
        self.inner.append_turn(conversation_id, role, content).await
    }

    async fn list_turns(&self, conversation_id: i64) -> DbResult<Vec<Message>> {
        Self::injected(&self.fail_history, "history")?;
        self.inner.list_turns(conversation_id).await
    }

    async fn clear_turns(&self, conversation_id: i64) -> DbResult<usize> {
        self.inner.clear_turns(conversation_id).await
    }
}
