//! Closed-set error kinds shared across the ingestion pipeline.
//!
//! Per-crate errors (`ScipError`, `GraphWriteError`, ...) convert into
//! `EngineError` at the pipeline boundary rather than each crate re-declaring
//! the fatal/non-fatal distinction on its own.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("external tool failure ({tool}): {message}")]
    ExternalToolFailure { tool: String, message: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("invariant violation ({reason}): {detail}")]
    InvariantViolation { reason: String, detail: String },

    #[error("transient write failure after exhausting retries: {0}")]
    TransientWriteFailure(String),
}

impl EngineError {
    /// Fatal kinds bubble up and terminate the run; others are per-record/
    /// per-batch and are absorbed by the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::ConfigInvalid(_) | EngineError::StoreUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
