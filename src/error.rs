//! Error taxonomy for the manipulation pipeline.
//!
//! One `thiserror` enum per adapter boundary, composed into a single
//! top-level [`PipelineError`] the orchestrator matches on to decide how to
//! reset document status. Adapters stay swappable without the orchestrator
//! caring about their internals.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object store request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum MetaError {
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
    #[error("document {0} not found")]
    DocumentNotFound(i64),
    #[error("pool error: {0}")]
    Pool(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load pdf: {0}")]
    Load(String),
    #[error("pdf is password protected")]
    PasswordRequired,
    #[error("pdf is corrupt: {0}")]
    Corrupt(String),
    #[error("page index {0} out of range")]
    PageOutOfRange(usize),
    #[error("engine operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("callback request failed: {0}")]
    Request(String),
    #[error("callback timed out")]
    Timeout,
}

/// A single invalid edit row, recorded rather than raised — non-fatal.
#[derive(Debug, Clone)]
pub struct EditInvalid {
    pub kind: &'static str,
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid invocation payload: {0}")]
    PayloadInvalid(String),
    #[error("document {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Store(#[from] ObjectStoreError),
    #[error(transparent)]
    Meta(#[from] MetaError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("deadline exceeded after {elapsed_secs}s (budget {budget_secs}s)")]
    DeadlineExceeded { elapsed_secs: u64, budget_secs: u64 },
}

impl PipelineError {
    /// Whether a failure here should reset the document status to
    /// `NeedsImageManipulation` so it can be retried. Every fatal pipeline
    /// error does; `PayloadInvalid` never reaches this point with a
    /// document row already transitioned, since validation happens before
    /// the status write.
    pub fn should_reset_status(&self) -> bool {
        !matches!(self, PipelineError::PayloadInvalid(_))
    }
}
