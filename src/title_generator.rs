//! Conversation name generation
//!
//! Asks the completion model for a short name based on the first question
//! of a new conversation.

use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService};
use std::time::Duration;
use tokio::time::timeout;

const NAME_PROMPT: &str = "Generate a short conversation name (no more than 20 characters) for the following question. Output only the name, without quotes or explanation:";

/// Low temperature keeps names stable for similar questions
pub const NAME_TEMPERATURE: f32 = 0.5;

const MAX_QUESTION_CHARS: usize = 500;
const MAX_NAME_CHARS: usize = 60;

/// Build the naming request for a question
pub fn name_request(question: &str) -> LlmRequest {
    let truncated = truncate_chars(question, MAX_QUESTION_CHARS);
    let prompt = if truncated.len() < question.len() {
        format!("{NAME_PROMPT}\n{truncated}...")
    } else {
        format!("{NAME_PROMPT}\n{question}")
    };

    LlmRequest::new(vec![LlmMessage::user(prompt)])
        .with_temperature(NAME_TEMPERATURE)
        .with_max_tokens(50)
}

/// Generate a name for a conversation from its first question.
///
/// Errors are returned rather than swallowed; an empty answer counts as
/// a failure.
pub async fn generate_name(
    question: &str,
    llm: &dyn LlmService,
    limit: Duration,
) -> Result<String, LlmError> {
    let request = name_request(question);

    let response = timeout(limit, llm.complete(&request))
        .await
        .map_err(|_| LlmError::timeout(format!("Name generation timed out after {limit:?}")))??;

    sanitize_name(&response.text)
        .ok_or_else(|| LlmError::unknown("Name generation returned empty text"))
}

/// Trim surrounding whitespace and cap the length on a char boundary
fn sanitize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed, MAX_NAME_CHARS).trim_end().to_string())
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s.get(..idx).unwrap_or(s),
        None => s,
    }
}
