//! Thin adapter around `qdrant-client`, following the teacher's facade
//! pattern: hide the verbose builder API behind `ensure_collection`/`upsert`.

use super::VectorStore;
use crate::model::{Distance, Point, Result, VectorWriteError};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id, vectors, CreateCollectionBuilder, Distance as QDistance, PointId, PointStruct, UpsertPointsBuilder,
    Value as QValue, Vector, Vectors, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info, warn};

pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
}

impl QdrantVectorStore {
    pub fn new(url: &str, api_key: Option<&str>, collection: &str) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder
            .build()
            .map_err(|e| VectorWriteError::Store(format!("failed to build qdrant client: {e}")))?;
        Ok(Self {
            client,
            collection: collection.to_string(),
        })
    }
}

fn to_qdistance(distance: Distance) -> QDistance {
    match distance {
        Distance::Cosine => QDistance::Cosine,
        Distance::Dot => QDistance::Dot,
        Distance::Euclid => QDistance::Euclid,
    }
}

fn json_to_qvalue(value: &serde_json::Value) -> QValue {
    use qdrant_client::qdrant::value::Kind;
    let kind = match value {
        serde_json::Value::String(s) => Some(Kind::StringValue(s.clone())),
        serde_json::Value::Bool(b) => Some(Kind::BoolValue(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Kind::IntegerValue(i))
            } else {
                n.as_f64().map(Kind::DoubleValue)
            }
        }
        _ => None,
    };
    QValue { kind }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_collection(&self, size: usize, distance: Distance, recreate: bool) -> Result<()> {
        match self.client.collection_info(&self.collection).await {
            Ok(info) => {
                let existing_size = info
                    .result
                    .and_then(|r| r.config)
                    .and_then(|c| c.params)
                    .and_then(|p| p.vectors_config)
                    .and_then(|v| v.config)
                    .and_then(|cfg| match cfg {
                        qdrant_client::qdrant::vectors_config::Config::Params(p) => Some(p.size as usize),
                        _ => None,
                    });

                match existing_size {
                    Some(existing) if existing != size && !recreate => {
                        return Err(VectorWriteError::DimensionConflict {
                            existing,
                            requested: size,
                        })
                    }
                    _ => {
                        debug!(collection = %self.collection, "collection already exists");
                        return Ok(());
                    }
                }
            }
            Err(err) => {
                warn!(collection = %self.collection, error = %err, "collection not found, creating");
            }
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(VectorParamsBuilder::new(size as u64, to_qdistance(distance))),
            )
            .await
            .map_err(|e| VectorWriteError::Store(format!("failed to create collection: {e}")))?;

        info!(collection = %self.collection, size, "collection created");
        Ok(())
    }

    async fn upsert(&self, points: Vec<Point>) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }

        let structs: Vec<PointStruct> = points
            .into_iter()
            .map(|p| {
                let payload = p
                    .payload
                    .iter()
                    .map(|(k, v)| (k.clone(), json_to_qvalue(v)))
                    .collect();

                let vectors_wrapped = Vectors {
                    vectors_options: Some(vectors::VectorsOptions::Vector(Vector {
                        data: p.vector,
                        ..Default::default()
                    })),
                };

                PointStruct {
                    id: Some(PointId {
                        point_id_options: Some(point_id::PointIdOptions::Uuid(p.id.to_string())),
                    }),
                    payload,
                    vectors: Some(vectors_wrapped),
                    ..Default::default()
                }
            })
            .collect();

        let count = structs.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, structs))
            .await
            .map_err(|e| VectorWriteError::Store(format!("upsert failed: {e}")))?;

        Ok(count)
    }
}
