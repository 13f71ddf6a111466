//! In-memory `VectorStore` fake, backing unit tests without a running
//! Qdrant instance.

use super::VectorStore;
use crate::model::{Distance, Point, Result, VectorWriteError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryVectorStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    size: Option<usize>,
    points: HashMap<Uuid, Point>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_count(&self) -> usize {
        self.inner.lock().unwrap().points.len()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self, size: usize, _distance: Distance, recreate: bool) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.size {
            Some(existing) if existing != size && !recreate => {
                return Err(VectorWriteError::DimensionConflict {
                    existing,
                    requested: size,
                })
            }
            _ => {}
        }
        if recreate {
            inner.points.clear();
        }
        inner.size = Some(size);
        Ok(())
    }

    async fn upsert(&self, points: Vec<Point>) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        let n = points.len();
        for point in points {
            inner.points.insert(point.id, point);
        }
        Ok(n)
    }
}
