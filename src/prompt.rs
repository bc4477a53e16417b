//! Prompt construction for a chat turn
//!
//! Two pure steps: cut the stored history down to a bounded window, then
//! lay out system instruction, window and new question as one request.

use crate::db::Message;
use crate::llm::{LlmMessage, LlmRequest};
use crate::system_prompt::SystemPrompt;

#[cfg(test)]
mod proptests;

/// Maximum number of prior messages sent with a new question
pub const HISTORY_WINDOW: usize = 10;

/// The last [`HISTORY_WINDOW`] items of `turns`, in their original order.
pub fn history_window<T>(turns: &[T]) -> &[T] {
    window_of(turns, HISTORY_WINDOW)
}

/// The last `limit` items of `turns`, dropping the oldest first.
pub fn window_of<T>(turns: &[T], limit: usize) -> &[T] {
    let start = turns.len().saturating_sub(limit);
    &turns[start..]
}

/// Build the completion request for a new question.
///
/// Layout: one system message, then `history` in order, then the question
/// as the final user message. Sampling options are left to the caller.
pub fn assemble_prompt(system: &SystemPrompt, history: &[Message], question: &str) -> LlmRequest {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(LlmMessage::system(system.as_str()));
    messages.extend(history.iter().map(|turn| LlmMessage {
        role: turn.role.into(),
        content: turn.content.clone(),
    }));
    messages.push(LlmMessage::user(question));
    LlmRequest::new(messages)
}
