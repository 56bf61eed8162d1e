//! Error types for dailyvocab.
//!
//! Library crates use [`VocabError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::{Path, PathBuf};

/// Top-level error type for all dailyvocab operations.
#[derive(Debug, thiserror::Error)]
pub enum VocabError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Text-completion call failed (transport, HTTP status, empty reply).
    #[error("completion error: {0}")]
    Completion(String),

    /// Model output could not be parsed into the expected structure.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Tabular store error (open, read, header write, append).
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The batch was generated but could not be appended to the store.
    #[error("{message}")]
    Persist { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VocabError>;

impl VocabError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build the operator-facing error for a failed append.
    ///
    /// `checkpoint` is `None` when the checkpoint write itself failed, in which
    /// case the batch is not recoverable.
    pub fn persist(cause: &VocabError, checkpoint: Option<&Path>) -> Self {
        let message = match checkpoint {
            Some(path) => format!(
                "failed to save vocabulary to the store: {cause}\n\
                 The generated batch is preserved in '{}'. Fix the issue and run again \
                 to retry saving without regenerating.",
                path.display()
            ),
            None => format!(
                "failed to save vocabulary to the store: {cause}\n\
                 No checkpoint could be written, so this batch cannot be recovered."
            ),
        };
        Self::Persist { message }
    }
}
