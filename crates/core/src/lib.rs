pub mod boilerplate;
pub mod chunking;
pub mod classifier;
pub mod context;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod fingerprint;
pub mod ingest;
pub mod metadata;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod store;
pub mod stores;
pub mod traits;

pub use boilerplate::{strip_trailing_page, PAGE_BREAK};
pub use chunking::{
    build_course_records, document_id, reassemble, segment, ChunkingConfig, CourseRecords, Segment,
};
pub use classifier::classify;
pub use context::{assemble_prompt, format_context, format_record, ChatMessage, Role};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, OpenAiConfig, OpenAiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, OPENAI_EMBEDDING_DIMENSIONS,
};
pub use error::{EmbeddingError, IngestError, SearchError};
pub use extractor::{extract_document_text, join_pages, LopdfExtractor, PageText, PdfExtractor};
pub use fingerprint::fingerprint;
pub use ingest::{
    build_course_document, discover_pdf_files, ingest_program_folders, load_faq_csv,
    load_thesis_rows, parse_faq_records, parse_thesis_records, BatchIngestor,
    CourseIngestionReport, FaqLoad, IngestStats, IngestSummary, SkippedSource, DEFAULT_PROGRAMS,
};
pub use metadata::{extract_metadata, extract_metadata_at};
pub use models::{
    CourseMetadata, DuplicatePolicy, Examination, FaqMetadata, GradeType, Granularity,
    IngestionOptions, Metadata, PendingRecord, QueryClassification, QueryLanguage, Record,
    RecordType, RetrievalOptions, ThesisMetadata,
};
pub use normalize::normalize;
pub use orchestrator::{Retrieval, RetrievalBlender};
pub use store::{ensure_collection, CollectionSpec, Metric, RecordFilter, SearchHit};
pub use stores::{InMemoryVectorStore, QdrantStore};
pub use traits::VectorStore;
