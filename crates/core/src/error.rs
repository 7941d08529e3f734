use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("store error: {0}")]
    Store(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),

    #[error("store not available yet: {0}")]
    NotReady(String),

    #[error("vector dimension {actual} does not match collection dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding backend returned {status}: {body}")]
    BackendResponse { status: u16, body: String },

    #[error("embedding response contained no vectors")]
    EmptyResponse,

    #[error("embedding dimension {actual} != configured {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid embedder config: {0}")]
    InvalidConfig(String),
}
