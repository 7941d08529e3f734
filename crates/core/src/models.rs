use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt;

/// Placeholder lecturer entry used when a fact sheet names nobody.
pub const UNKNOWN_LECTURER: &str = "Unknown";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Chunk,
    Full,
    Faq,
    Thesis,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Chunk => "chunk",
            RecordType::Full => "full",
            RecordType::Faq => "faq",
            RecordType::Thesis => "thesis",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GradeType {
    #[serde(rename = "individual grade")]
    Individual,
    #[serde(rename = "group grade")]
    Group,
}

impl GradeType {
    pub fn as_str(self) -> &'static str {
        match self {
            GradeType::Individual => "individual grade",
            GradeType::Group => "group grade",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Examination {
    #[serde(rename = "type")]
    pub exam_type: String,
    pub mode: String,
    pub format: String,
    pub grade_type: GradeType,
    /// Share of the final grade, e.g. `"20%"`.
    pub weighting: String,
}

/// Fields recovered from a course fact sheet, shared by its `full` record and
/// all of its `chunk` records.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CourseMetadata {
    pub source: String,
    pub program: Option<String>,
    pub path: Option<String>,
    pub course_number: Option<String>,
    pub title: Option<String>,
    pub ects: Option<u32>,
    pub language: String,
    pub lecturers: Vec<String>,
    pub semester: Option<String>,
    #[serde(default)]
    pub examinations: Vec<Examination>,
    pub chunk_index: Option<usize>,
    pub total_chunks: Option<usize>,
    pub full_document_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaqMetadata {
    pub source: String,
    pub kategorie: String,
    pub titel: String,
    pub frage: String,
    pub antwort: String,
    pub datum: String,
    pub name_antwortgeber: String,
    pub language_hint: QueryLanguage,
    pub chunk_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThesisMetadata {
    pub source: String,
    pub title_thesis: String,
    pub student: String,
    pub year: String,
    pub supervisor: String,
}

/// Per-record-type metadata. The `type` tag is the field retrieval filters on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Metadata {
    Chunk(CourseMetadata),
    Full(CourseMetadata),
    Faq(FaqMetadata),
    Thesis(ThesisMetadata),
}

impl Metadata {
    pub fn record_type(&self) -> RecordType {
        match self {
            Metadata::Chunk(_) => RecordType::Chunk,
            Metadata::Full(_) => RecordType::Full,
            Metadata::Faq(_) => RecordType::Faq,
            Metadata::Thesis(_) => RecordType::Thesis,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Metadata::Chunk(course) | Metadata::Full(course) => &course.source,
            Metadata::Faq(faq) => &faq.source,
            Metadata::Thesis(thesis) => &thesis.source,
        }
    }

    pub fn chunk_id(&self) -> Option<&str> {
        match self {
            Metadata::Faq(faq) => Some(faq.chunk_id.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: Metadata,
}

impl Record {
    pub fn record_type(&self) -> RecordType {
        self.metadata.record_type()
    }
}

/// A record that has been built from a source but not yet embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    pub text: String,
    /// Text handed to the embedder; FAQ entries embed an enriched variant.
    pub embedding_input: String,
    pub metadata: Metadata,
}

impl PendingRecord {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        let text = text.into();
        Self {
            embedding_input: text.clone(),
            text,
            metadata,
        }
    }

    pub fn into_record(self, id: String, vector: Vec<f32>) -> Record {
        Record {
            id,
            vector,
            text: self.text,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Chunk,
    Full,
}

impl Granularity {
    pub fn record_type(self) -> RecordType {
        match self {
            Granularity::Chunk => RecordType::Chunk,
            Granularity::Full => RecordType::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    De,
    #[default]
    En,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueryClassification {
    pub granularity: Granularity,
    pub language: QueryLanguage,
    pub is_question: bool,
}

/// What to do when an FAQ fingerprint already exists in the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    Skip,
    #[default]
    Update,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    /// Segment size and overlap, measured in UTF-8 bytes.
    pub chunk_target_bytes: usize,
    pub chunk_overlap_bytes: usize,
    pub batch_size: usize,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_target_bytes: 1_000,
            chunk_overlap_bytes: 200,
            batch_size: 5,
            duplicate_policy: DuplicatePolicy::Update,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetrievalOptions {
    /// Upper bound on the blended result set.
    pub limit: usize,
    /// Upper bound on each of the two similarity searches.
    pub per_channel_limit: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            per_channel_limit: 5,
        }
    }
}
