//! Fixed system instruction
//!
//! Loaded once at startup from an external file and shared read-only for
//! the lifetime of the process.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Failed to read system prompt {path}: {source}")]
pub struct SystemPromptError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Immutable system instruction text. Cloning shares the same buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct SystemPrompt {
    text: Arc<str>,
}

impl SystemPrompt {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self { text: text.into() }
    }

    /// Read the instruction from disk
    pub fn load(path: &Path) -> Result<Self, SystemPromptError> {
        let text = std::fs::read_to_string(path).map_err(|source| SystemPromptError {
            path: path.to_path_buf(),
            source,
        })?;

        if text.trim().is_empty() {
            tracing::warn!(path = %path.display(), "System prompt file is empty");
        } else {
            tracing::info!(path = %path.display(), bytes = text.len(), "Loaded system prompt");
        }

        Ok(Self::new(text))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Debug for SystemPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemPrompt")
            .field("len", &self.text.len())
            .finish()
    }
}
