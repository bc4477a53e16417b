//! API request and response types

use serde::{Deserialize, Serialize};

/// Request to submit a question
#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    /// Absent, null or `0` starts a new conversation
    #[serde(default)]
    pub conversation_id: Option<i64>,
    pub question: String,
}

/// Request to rename a conversation
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Acknowledgement for destructive actions
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub message: String,
}

impl AckResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Model and build information
#[derive(Debug, Serialize)]
pub struct SystemInfoResponse {
    pub model: String,
    pub version: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
