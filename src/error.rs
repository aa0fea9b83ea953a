//! Unified error type for the index core.

use thiserror::Error;

/// Error taxonomy for the index core.
///
/// `UsageError` and `StorageError` propagate synchronously to the caller.
/// `ParseError` and `BuildError` are collected into run reports instead —
/// see `IndexingRunReport` and `IndexBatchReport`.
#[derive(Error, Debug)]
pub enum ApiLensError {
    #[error("usage error: {0}")]
    UsageError(String),

    #[error("parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("build error for record {id}: {message}")]
    BuildError { id: String, message: String },

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("run cancelled")]
    CancelledError,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("xml error in {path}: {source}")]
    Xml {
        path: String,
        #[source]
        source: quick_xml::Error,
    },
}

impl ApiLensError {
    pub fn usage(message: impl Into<String>) -> Self {
        ApiLensError::UsageError(message.into())
    }

    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        ApiLensError::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn build(id: impl Into<String>, message: impl Into<String>) -> Self {
        ApiLensError::BuildError {
            id: id.into(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        ApiLensError::StorageError(message.into())
    }

    /// Per-record/per-file errors are the ones collected into run reports
    /// rather than returned to the caller (propagation policy in §7).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ApiLensError::ParseError { .. } | ApiLensError::BuildError { .. }
        )
    }
}
