use crate::error::IngestError;
use crate::models::{CourseMetadata, IngestionOptions, Metadata, PendingRecord};
use sha2::{Digest, Sha256};

/// Boundaries tried in priority order before falling back to a raw cut.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub target_bytes: usize,
    pub overlap_bytes: usize,
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            target_bytes: value.chunk_target_bytes,
            overlap_bytes: value.chunk_overlap_bytes,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.target_bytes == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "target size must be positive".to_string(),
            ));
        }
        if self.overlap_bytes >= self.target_bytes {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than target size {}",
                self.overlap_bytes, self.target_bytes
            )));
        }
        Ok(())
    }
}

/// One window of a segmented text. `start..end` is a byte range into the
/// segmented text; `overlap` bytes at the front are shared with the previous
/// segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub overlap: usize,
    pub text: String,
}

/// Splits `text` into windows of at most `target_size` bytes, preferring
/// paragraph breaks, then line breaks, then spaces, then a raw cut.
/// Consecutive windows share up to `overlap` bytes. Sizes are snapped to
/// UTF-8 character boundaries, so a single wide character may exceed a tiny
/// target.
pub fn segment(text: &str, target_size: usize, overlap: usize) -> Vec<Segment> {
    let target = target_size.max(1);
    let overlap = overlap.min(target - 1);
    let mut segments = Vec::new();
    let mut start = 0usize;
    let mut previous_end = 0usize;

    while start < text.len() {
        let end = if text.len() - start <= target {
            text.len()
        } else {
            window_end(text, start, target, overlap)
        };

        segments.push(Segment {
            index: segments.len(),
            start,
            end,
            overlap: previous_end.saturating_sub(start),
            text: text[start..end].to_string(),
        });

        if end == text.len() {
            break;
        }

        previous_end = end;
        start = next_start(text, start, end, overlap);
    }

    segments
}

fn window_end(text: &str, start: usize, target: usize, overlap: usize) -> usize {
    // the window must reach past the shared prefix so the next start advances
    let minimum = start + overlap + 1;
    let hard_end = floor_char_boundary(text, start + target);
    let hard_end = if hard_end < minimum {
        ceil_char_boundary(text, minimum)
    } else {
        hard_end
    };

    let window = &text[start..hard_end];
    SEPARATORS
        .iter()
        .find_map(|separator| {
            window
                .rfind(separator)
                .map(|position| start + position + separator.len())
                .filter(|end| end - start > overlap)
        })
        .unwrap_or(hard_end)
}

fn next_start(text: &str, start: usize, end: usize, overlap: usize) -> usize {
    let candidate = ceil_char_boundary(text, end - overlap);
    let candidate = if candidate <= start { end } else { candidate };

    // begin the shared context at a word start when one is available
    text[candidate..end]
        .find(char::is_whitespace)
        .map(|position| candidate + position)
        .and_then(|space| {
            let after = space + text[space..].chars().next().map_or(1, char::len_utf8);
            (after < end).then_some(after)
        })
        .unwrap_or(candidate)
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Rebuilds the segmented text by dropping each segment's shared prefix.
pub fn reassemble(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| &segment.text[segment.overlap..])
        .collect()
}

#[derive(Debug, Clone)]
pub struct CourseRecords {
    pub full: PendingRecord,
    pub chunks: Vec<PendingRecord>,
}

impl CourseRecords {
    pub fn into_pending(self) -> Vec<PendingRecord> {
        let mut records = Vec::with_capacity(self.chunks.len() + 1);
        records.push(self.full);
        records.extend(self.chunks);
        records
    }
}

/// Builds the whole-document record and the ordered chunk records for one
/// stripped fact sheet. Returns `None` for blank text.
pub fn build_course_records(
    text: &str,
    metadata: &CourseMetadata,
    config: ChunkingConfig,
) -> Result<Option<CourseRecords>, IngestError> {
    config.validate()?;
    if text.trim().is_empty() {
        return Ok(None);
    }

    let full_document_id = metadata
        .full_document_id
        .clone()
        .unwrap_or_else(|| document_id(metadata.path.as_deref().unwrap_or(&metadata.source)));

    let full = PendingRecord::new(
        text,
        Metadata::Full(CourseMetadata {
            full_document_id: Some(full_document_id.clone()),
            chunk_index: None,
            total_chunks: None,
            ..metadata.clone()
        }),
    );

    let segments = segment(text, config.target_bytes, config.overlap_bytes);
    let total_chunks = segments.len();
    let chunks = segments
        .into_iter()
        .map(|segment| {
            PendingRecord::new(
                segment.text,
                Metadata::Chunk(CourseMetadata {
                    full_document_id: Some(full_document_id.clone()),
                    chunk_index: Some(segment.index),
                    total_chunks: Some(total_chunks),
                    ..metadata.clone()
                }),
            )
        })
        .collect();

    Ok(Some(CourseRecords { full, chunks }))
}

pub fn document_id(source_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_path.as_bytes());
    format!("{:x}", hasher.finalize())
}
