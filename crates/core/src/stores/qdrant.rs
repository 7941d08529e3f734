use crate::models::{Metadata, Record};
use crate::store::{CollectionSpec, Metric, RecordFilter, SearchHit};
use crate::traits::VectorStore;
use crate::SearchError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

const BACKEND: &str = "qdrant";

/// Qdrant REST client bound to one collection. Record metadata is stored in
/// the point payload under `metadata`, the record text under `text`.
pub struct QdrantStore {
    endpoint: Url,
    collection: String,
    client: Client,
}

impl QdrantStore {
    pub fn new(endpoint: &str, collection: impl Into<String>) -> Result<Self, SearchError> {
        let mut endpoint = Url::parse(endpoint)?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        Ok(Self {
            endpoint,
            collection: collection.into(),
            client: Client::new(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, SearchError> {
        Ok(self.endpoint.join(path)?)
    }

    fn points_url(&self, suffix: &str) -> Result<Url, SearchError> {
        self.url(&format!("collections/{}/points{suffix}", self.collection))
    }

    async fn check(response: Response) -> Result<Value, SearchError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("{status}: {body}"),
            });
        }
        Ok(response.json().await?)
    }

    async fn upsert(&self, records: &[Record]) -> Result<(), SearchError> {
        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .map(|record| {
                Ok(json!({
                    "id": record.id,
                    "vector": record.vector,
                    "payload": {
                        "text": record.text,
                        "metadata": serde_json::to_value(&record.metadata)?,
                    },
                }))
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        let response = self
            .client
            .put(self.points_url("?wait=true")?)
            .json(&json!({ "points": points }))
            .send()
            .await?;
        Self::check(response).await?;
        debug!(collection = %self.collection, count = records.len(), "upserted points");
        Ok(())
    }
}

fn filter_body(filter: &RecordFilter) -> Value {
    let mut must = Vec::new();
    if let Some(record_type) = filter.record_type {
        must.push(json!({ "key": "metadata.type", "match": { "value": record_type.as_str() } }));
    }
    if let Some(chunk_id) = &filter.chunk_id {
        must.push(json!({ "key": "metadata.chunkId", "match": { "value": chunk_id } }));
    }
    json!({ "must": must })
}

fn point_to_record(point: &Value) -> Result<Record, SearchError> {
    let id = match point.pointer("/id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            return Err(SearchError::BackendResponse {
                backend: BACKEND.to_string(),
                details: "point without id".to_string(),
            })
        }
    };
    let text = point
        .pointer("/payload/text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let metadata: Metadata = serde_json::from_value(
        point
            .pointer("/payload/metadata")
            .cloned()
            .unwrap_or(Value::Null),
    )?;
    let vector = point
        .pointer("/vector")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_f64)
                .map(|value| value as f32)
                .collect()
        })
        .unwrap_or_default();

    Ok(Record {
        id,
        vector,
        text,
        metadata,
    })
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn list_collections(&self) -> Result<Vec<String>, SearchError> {
        let response = self.client.get(self.url("collections")?).send().await?;
        let parsed = Self::check(response).await?;
        Ok(parsed
            .pointer("/result/collections")
            .and_then(Value::as_array)
            .map(|collections| {
                collections
                    .iter()
                    .filter_map(|collection| collection.pointer("/name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), SearchError> {
        let distance = match spec.metric {
            Metric::Cosine => "Cosine",
        };
        let response = self
            .client
            .put(self.url(&format!("collections/{}", self.collection))?)
            .json(&json!({ "vectors": { "size": spec.dimension, "distance": distance } }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn insert(&self, records: &[Record]) -> Result<(), SearchError> {
        self.upsert(records).await
    }

    async fn update(&self, record: &Record) -> Result<(), SearchError> {
        self.upsert(std::slice::from_ref(record)).await
    }

    async fn find_one(&self, filter: &RecordFilter) -> Result<Option<Record>, SearchError> {
        let response = self
            .client
            .post(self.points_url("/scroll")?)
            .json(&json!({
                "filter": filter_body(filter),
                "limit": 1,
                "with_payload": true,
                "with_vector": true,
            }))
            .send()
            .await?;
        let parsed = Self::check(response).await?;
        parsed
            .pointer("/result/points/0")
            .map(point_to_record)
            .transpose()
    }

    async fn search(
        &self,
        filter: &RecordFilter,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .post(self.points_url("/search")?)
            .json(&json!({
                "vector": query_vector,
                "filter": filter_body(filter),
                "limit": limit,
                "with_payload": true,
            }))
            .send()
            .await?;
        let parsed = Self::check(response).await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        hits.iter()
            .map(|hit| {
                Ok(SearchHit {
                    record: point_to_record(hit)?,
                    score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FaqMetadata, QueryLanguage, RecordType};

    #[test]
    fn endpoint_keeps_base_path() -> Result<(), SearchError> {
        let store = QdrantStore::new("http://localhost:6333/proxy", "courses")?;
        assert_eq!(
            store.points_url("/search")?.as_str(),
            "http://localhost:6333/proxy/collections/courses/points/search"
        );
        assert!(QdrantStore::new("not a url", "courses").is_err());
        Ok(())
    }

    #[test]
    fn filters_target_metadata_fields() {
        let filter = RecordFilter {
            record_type: Some(RecordType::Faq),
            chunk_id: Some("abc".to_string()),
        };
        let body = filter_body(&filter);
        assert_eq!(body["must"][0]["key"], "metadata.type");
        assert_eq!(body["must"][0]["match"]["value"], "faq");
        assert_eq!(body["must"][1]["key"], "metadata.chunkId");
        assert_eq!(filter_body(&RecordFilter::default())["must"], json!([]));
    }

    #[test]
    fn points_decode_into_records() -> Result<(), SearchError> {
        let metadata = Metadata::Faq(FaqMetadata {
            source: "faq.csv".to_string(),
            kategorie: "Prüfungen".to_string(),
            titel: "Abmeldung".to_string(),
            frage: "Wie melde ich mich ab?".to_string(),
            antwort: "Online.".to_string(),
            datum: String::new(),
            name_antwortgeber: String::new(),
            language_hint: QueryLanguage::De,
            chunk_id: "abc".to_string(),
        });
        let point = json!({
            "id": "5f0c3a2e-8e8b-4d4c-9b8e-0a1b2c3d4e5f",
            "score": 0.8,
            "vector": [0.5, 0.25],
            "payload": { "text": "FRAGE: ...", "metadata": serde_json::to_value(&metadata)? },
        });

        let record = point_to_record(&point)?;
        assert_eq!(record.id, "5f0c3a2e-8e8b-4d4c-9b8e-0a1b2c3d4e5f");
        assert_eq!(record.vector, vec![0.5, 0.25]);
        assert_eq!(record.metadata, metadata);
        assert!(point_to_record(&json!({ "payload": {} })).is_err());
        Ok(())
    }
}
