use crate::models::Record;
use crate::store::{cosine_similarity, CollectionSpec, RecordFilter, SearchHit};
use crate::traits::VectorStore;
use crate::SearchError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug)]
struct MemoryCollection {
    spec: CollectionSpec,
    records: Vec<Record>,
}

/// Process-local store used for tests and offline runs.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    collection: String,
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl InMemoryVectorStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            collections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.collections
            .read()
            .await
            .get(&self.collection)
            .map_or(0, |collection| collection.records.len())
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn records(&self) -> Vec<Record> {
        self.collections
            .read()
            .await
            .get(&self.collection)
            .map(|collection| collection.records.clone())
            .unwrap_or_default()
    }

    fn missing(&self) -> SearchError {
        SearchError::NotReady(format!("collection {} does not exist", self.collection))
    }
}

fn check_dimension(spec: &CollectionSpec, vector: &[f32]) -> Result<(), SearchError> {
    if vector.len() != spec.dimension {
        return Err(SearchError::DimensionMismatch {
            expected: spec.dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn list_collections(&self) -> Result<Vec<String>, SearchError> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), SearchError> {
        self.collections
            .write()
            .await
            .entry(self.collection.clone())
            .or_insert_with(|| MemoryCollection {
                spec: *spec,
                records: Vec::new(),
            });
        Ok(())
    }

    async fn insert(&self, records: &[Record]) -> Result<(), SearchError> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(&self.collection)
            .ok_or_else(|| self.missing())?;
        for record in records {
            check_dimension(&collection.spec, &record.vector)?;
        }
        collection.records.extend(records.iter().cloned());
        Ok(())
    }

    async fn update(&self, record: &Record) -> Result<(), SearchError> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(&self.collection)
            .ok_or_else(|| self.missing())?;
        check_dimension(&collection.spec, &record.vector)?;
        let existing = collection
            .records
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or_else(|| SearchError::Request(format!("no record with id {}", record.id)))?;
        *existing = record.clone();
        Ok(())
    }

    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<Record>, SearchError> {
        let collections = self.collections.read().await;
        let collection = collections.get(&self.collection).ok_or_else(|| self.missing())?;
        Ok(collection
            .records
            .iter()
            .find(|record| filter.matches(record))
            .cloned())
    }

    async fn search(
        &self,
        filter: &RecordFilter,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let collections = self.collections.read().await;
        let collection = collections.get(&self.collection).ok_or_else(|| self.missing())?;
        check_dimension(&collection.spec, query_vector)?;

        let mut hits: Vec<SearchHit> = collection
            .records
            .iter()
            .filter(|record| filter.matches(record))
            .map(|record| SearchHit {
                score: cosine_similarity(query_vector, &record.vector),
                record: record.clone(),
            })
            .collect();
        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(limit);
        Ok(hits)
    }
}
