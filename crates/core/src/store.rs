use crate::models::{Record, RecordType};
use crate::traits::VectorStore;
use crate::SearchError;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Metric {
    #[default]
    Cosine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    pub dimension: usize,
    pub metric: Metric,
}

impl CollectionSpec {
    pub fn cosine(dimension: usize) -> Self {
        Self {
            dimension,
            metric: Metric::Cosine,
        }
    }
}

/// Equality filter over record metadata. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub record_type: Option<RecordType>,
    pub chunk_id: Option<String>,
}

impl RecordFilter {
    pub fn of_type(record_type: RecordType) -> Self {
        Self {
            record_type: Some(record_type),
            chunk_id: None,
        }
    }

    pub fn by_chunk_id(chunk_id: impl Into<String>) -> Self {
        Self {
            record_type: None,
            chunk_id: Some(chunk_id.into()),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.record_type
            .map_or(true, |record_type| record.record_type() == record_type)
            && self
                .chunk_id
                .as_deref()
                .map_or(true, |chunk_id| record.metadata.chunk_id() == Some(chunk_id))
    }
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record: Record,
    pub score: f64,
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    let (mut dot, mut left_norm, mut right_norm) = (0f64, 0f64, 0f64);
    for (a, b) in left.iter().zip(right) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        left_norm += a * a;
        right_norm += b * b;
    }
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm.sqrt() * right_norm.sqrt())
}

/// Creates the store's collection unless it already exists.
pub async fn ensure_collection<S>(store: &S, dimension: usize) -> Result<(), SearchError>
where
    S: VectorStore + ?Sized,
{
    let existing = store.list_collections().await?;
    if existing.iter().any(|name| name == store.collection()) {
        return Ok(());
    }

    store
        .create_collection(&CollectionSpec::cosine(dimension))
        .await?;
    info!(collection = store.collection(), dimension, "created collection");
    Ok(())
}
