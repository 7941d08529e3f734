use crate::error::EmbeddingError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;
pub const OPENAI_EMBEDDING_DIMENSIONS: usize = 1536;
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Maps text to a fixed-length vector. Queries and records must go through the
/// same embedder so their vectors are comparable.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[async_trait]
impl<T> Embedder for Box<T>
where
    T: Embedder + ?Sized,
{
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text).await
    }
}

/// Offline embedder hashing character trigrams into buckets.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            dimensions: OPENAI_EMBEDDING_DIMENSIONS,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    max_retries: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiConfig) -> Result<Self, EmbeddingError> {
        if config.api_key.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig(
                "missing OpenAI API key".to_string(),
            ));
        }
        if config.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig(
                "missing embedding model name".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", config.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| EmbeddingError::InvalidConfig("invalid API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model,
            dimensions: config.dimensions,
            max_retries: config.max_retries.max(1),
        })
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn retry_backoff(attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: [text],
            dimensions: self.dimensions,
        };

        let mut attempt = 0usize;
        let response = loop {
            let response = self.client.post(&self.endpoint).json(&request).send().await?;
            let status = response.status();
            if status.is_success() {
                break response;
            }

            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            if Self::should_retry(status) && attempt + 1 < self.max_retries {
                attempt += 1;
                warn!(status = %status, attempt, "embedding request throttled, retrying");
                tokio::time::sleep(Self::retry_backoff(attempt)).await;
                continue;
            }
            return Err(EmbeddingError::BackendResponse {
                status: status.as_u16(),
                body,
            });
        };

        let parsed: EmbeddingResponse = response.json().await?;
        let vector = parsed
            .data
            .into_iter()
            .min_by_key(|entry| entry.index)
            .map(|entry| entry.embedding)
            .ok_or(EmbeddingError::EmptyResponse)?;

        if vector.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
