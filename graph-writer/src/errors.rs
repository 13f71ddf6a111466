use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphWriteError {
    #[error("graph store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("transient graph write failure: {0}")]
    Transient(String),
    #[error("graph write failed: {0}")]
    Other(String),
}

impl GraphWriteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GraphWriteError::Transient(_))
    }
}
