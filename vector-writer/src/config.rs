use crate::model::{Distance, VectorWriteError};
use retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct VectorWriterConfig {
    pub dimension: usize,
    pub distance: Distance,
    pub max_batch_entities: usize,
    pub max_batch_chars: usize,
    pub recreate_on_mismatch: bool,
    pub retry_policy: RetryPolicy,
}

impl VectorWriterConfig {
    pub fn new(dimension: usize, distance: Distance) -> Self {
        Self {
            dimension,
            distance,
            max_batch_entities: crate::batch::DEFAULT_MAX_BATCH_ENTITIES,
            max_batch_chars: crate::batch::DEFAULT_MAX_BATCH_CHARS,
            recreate_on_mismatch: false,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn validate(&self) -> Result<(), VectorWriteError> {
        if self.dimension == 0 {
            return Err(VectorWriteError::Config("dimension must be non-zero".to_string()));
        }
        if self.max_batch_entities == 0 {
            return Err(VectorWriteError::Config("max_batch_entities must be non-zero".to_string()));
        }
        Ok(())
    }
}
