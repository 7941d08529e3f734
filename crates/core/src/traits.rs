use crate::models::Record;
use crate::store::{CollectionSpec, RecordFilter, SearchHit};
use crate::SearchError;
use async_trait::async_trait;

/// A vector store bound to a single named collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the collection this store reads and writes.
    fn collection(&self) -> &str;

    async fn list_collections(&self) -> Result<Vec<String>, SearchError>;

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), SearchError>;

    async fn insert(&self, records: &[Record]) -> Result<(), SearchError>;

    /// Replaces the stored record with the same id.
    async fn update(&self, record: &Record) -> Result<(), SearchError>;

    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<Record>, SearchError>;

    /// Records matching `filter`, most similar to `query_vector` first.
    async fn search(
        &self,
        filter: &RecordFilter,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, SearchError>;
}
