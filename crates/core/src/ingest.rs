use crate::boilerplate::strip_trailing_page;
use crate::chunking::{build_course_records, ChunkingConfig, CourseRecords};
use crate::classifier::detect_language;
use crate::embeddings::Embedder;
use crate::extractor::{extract_document_text, PdfExtractor};
use crate::fingerprint::fingerprint;
use crate::metadata::extract_metadata;
use crate::models::{
    DuplicatePolicy, FaqMetadata, IngestionOptions, Metadata, PendingRecord, ThesisMetadata,
};
use crate::normalize::{normalize, normalize_whitespace};
use crate::store::RecordFilter;
use crate::traits::VectorStore;
use crate::IngestError;
use futures::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

pub const DEFAULT_PROGRAMS: [&str; 4] = ["macfin", "MBI", "MGM", "MiMM"];

static LEADING_GERMAN_INTERROGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:Wie|Was|Wo|Wann|Warum|Wer|Welche|Welcher|Welches|Kann|Ist|Sind|Hat|Haben|Darf|Müssen|Soll|Können)\s+",
    )
    .expect("interrogative regex is valid")
});

/// Recursively lists `*.pdf` files (any extension case) below `folder`.
/// Fails when `folder` itself cannot be read.
pub fn discover_pdf_files(folder: &Path) -> Result<Vec<PathBuf>, IngestError> {
    fs::read_dir(folder)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    Ok(files)
}

fn file_name(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))
}

#[derive(Debug, Clone)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct CourseIngestionReport {
    pub records: Vec<PendingRecord>,
    pub documents: usize,
    pub skipped_files: Vec<SkippedSource>,
    pub skipped_folders: Vec<SkippedSource>,
}

/// Turns one extracted fact sheet into its `full` record and chunk records:
/// normalize, strip the trailing page, extract metadata, segment.
pub fn build_course_document(
    raw_text: &str,
    program: Option<&str>,
    path: &Path,
    config: ChunkingConfig,
) -> Result<Option<CourseRecords>, IngestError> {
    let source = file_name(path)?;
    let stripped = strip_trailing_page(&normalize(raw_text));

    let mut metadata = extract_metadata(&stripped, &source);
    metadata.program = program.map(str::to_string);
    metadata.path = Some(path.to_string_lossy().to_string());

    build_course_records(&stripped, &metadata, config)
}

/// Walks `base/<program>` for every program. Unreadable folders and files are
/// logged and reported, never fatal.
pub fn ingest_program_folders(
    base: &Path,
    programs: &[String],
    extractor: &dyn PdfExtractor,
    config: ChunkingConfig,
) -> Result<CourseIngestionReport, IngestError> {
    config.validate()?;
    let mut report = CourseIngestionReport::default();

    for program in programs {
        let folder = base.join(program);
        let files = match discover_pdf_files(&folder) {
            Ok(files) => files,
            Err(error) => {
                warn!(folder = %folder.display(), %error, "skipping unreadable program folder");
                report.skipped_folders.push(SkippedSource {
                    path: folder,
                    reason: error.to_string(),
                });
                continue;
            }
        };
        info!(program = %program, files = files.len(), "processing program folder");

        for path in files {
            let built = extract_document_text(extractor, &path).and_then(|text| {
                build_course_document(&text, Some(program.as_str()), &path, config)
            });

            match built {
                Ok(Some(records)) => {
                    debug!(
                        path = %path.display(),
                        chunks = records.chunks.len(),
                        "built course records"
                    );
                    report.documents += 1;
                    report.records.extend(records.into_pending());
                }
                Ok(None) => {
                    warn!(path = %path.display(), "fact sheet has no text after stripping");
                    report.skipped_files.push(SkippedSource {
                        path,
                        reason: "no text after stripping".to_string(),
                    });
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping unreadable fact sheet");
                    report.skipped_files.push(SkippedSource {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }
    }

    Ok(report)
}

#[derive(Debug, Deserialize)]
struct FaqRow {
    #[serde(rename = "Kategorie", default)]
    kategorie: String,
    #[serde(rename = "Titel", default)]
    titel: String,
    #[serde(rename = "Frage", default)]
    frage: String,
    #[serde(rename = "Datum", default)]
    datum: String,
    #[serde(rename = "Antwort", default)]
    antwort: String,
    #[serde(rename = "NameAntwortgeber", default)]
    name_antwortgeber: String,
}

#[derive(Debug, Default)]
pub struct FaqLoad {
    pub records: Vec<PendingRecord>,
    /// Rows without question or answer, or that failed to parse.
    pub skipped_rows: usize,
    /// Rows repeating an entry already seen in the same file.
    pub duplicates: usize,
}

pub fn load_faq_csv(path: &Path) -> Result<FaqLoad, IngestError> {
    let source = file_name(path)?;
    let file = fs::File::open(path)?;
    parse_faq_records(file, &source)
}

pub fn parse_faq_records<R: io::Read>(reader: R, source: &str) -> Result<FaqLoad, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut load = FaqLoad::default();
    let mut seen = HashSet::new();

    for (row_number, row) in reader.deserialize::<FaqRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(error) => {
                warn!(row = row_number + 1, %error, "skipping malformed faq row");
                load.skipped_rows += 1;
                continue;
            }
        };

        let frage = normalize_whitespace(&row.frage);
        let antwort = normalize_whitespace(&row.antwort);
        if frage.is_empty() || antwort.is_empty() {
            load.skipped_rows += 1;
            continue;
        }

        let chunk_id = fingerprint(&format!("{frage}\n{antwort}"));
        if !seen.insert(chunk_id.clone()) {
            debug!(row = row_number + 1, chunk_id = %chunk_id, "duplicate faq row in file");
            load.duplicates += 1;
            continue;
        }

        let metadata = FaqMetadata {
            source: source.to_string(),
            kategorie: normalize_whitespace(&row.kategorie),
            titel: normalize_whitespace(&row.titel),
            language_hint: detect_language(&frage),
            frage,
            antwort,
            datum: normalize_whitespace(&row.datum),
            name_antwortgeber: normalize_whitespace(&row.name_antwortgeber),
            chunk_id,
        };

        load.records.push(PendingRecord {
            text: faq_display_text(&metadata),
            embedding_input: faq_search_text(&metadata),
            metadata: Metadata::Faq(metadata),
        });
    }

    Ok(load)
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

/// Text stored with an FAQ record and shown to the generator.
pub fn faq_display_text(faq: &FaqMetadata) -> String {
    format!(
        "KATEGORIE: {}\nTITEL: {}\nFRAGE: {}\nANTWORT: {}\nDATUM: {}\nANTWORTGEBER: {}",
        or_placeholder(&faq.kategorie, "Keine Kategorie"),
        or_placeholder(&faq.titel, "Kein Titel"),
        faq.frage,
        faq.antwort,
        or_placeholder(&faq.datum, "Kein Datum"),
        or_placeholder(&faq.name_antwortgeber, "Unbekannt"),
    )
}

/// Embedding input for an FAQ record: the entry plus rephrasings of the
/// question so short user queries land near it.
pub fn faq_search_text(faq: &FaqMetadata) -> String {
    let without_mark = faq.frage.replace('?', "");
    let statement = LEADING_GERMAN_INTERROGATIVE
        .replace(&faq.frage, "")
        .replace('?', ".");
    let keywords = [faq.kategorie.as_str(), faq.titel.as_str(), faq.frage.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "KATEGORIE: {}\nTITEL: {}\nFRAGE: {}\nFRAGE VARIATIONEN: {} | {} | {}\n\
         ANTWORT: {}\nSUCHBEGRIFFE: {}",
        faq.kategorie,
        faq.titel,
        faq.frage,
        faq.frage,
        without_mark,
        statement,
        faq.antwort,
        keywords
    )
}

/// Reads a thesis registry export. The first four columns are title,
/// student, year and supervisor; shorter rows are skipped. A `.tsv` file is
/// read tab separated.
pub fn load_thesis_rows(path: &Path) -> Result<Vec<PendingRecord>, IngestError> {
    let source = file_name(path)?;
    let delimiter = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    };
    let file = fs::File::open(path)?;
    parse_thesis_records(file, &source, delimiter)
}

pub fn parse_thesis_records<R: io::Read>(
    reader: R,
    source: &str,
    delimiter: u8,
) -> Result<Vec<PendingRecord>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.len() < 4 {
            debug!(columns = row.len(), "skipping short thesis row");
            continue;
        }

        let thesis = ThesisMetadata {
            source: source.to_string(),
            title_thesis: row[0].to_string(),
            student: row[1].to_string(),
            year: row[2].to_string(),
            supervisor: row[3].to_string(),
        };
        let text = format!(
            "Title: {}\nStudent: {}\nYear: {}\nSupervisor: {}",
            thesis.title_thesis, thesis.student, thesis.year, thesis.supervisor
        );
        records.push(PendingRecord::new(text, Metadata::Thesis(thesis)));
    }

    Ok(records)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    pub duplicates: usize,
}

/// Run-wide counters, safe to bump from concurrent tasks.
#[derive(Debug, Default)]
pub struct IngestStats {
    inserted: AtomicUsize,
    updated: AtomicUsize,
    failed: AtomicUsize,
    duplicates: AtomicUsize,
}

impl IngestStats {
    pub fn add_inserted(&self, count: usize) {
        self.inserted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_updated(&self, count: usize) {
        self.updated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_failed(&self, count: usize) {
        self.failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_duplicates(&self, count: usize) {
        self.duplicates.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestSummary {
        IngestSummary {
            inserted: self.inserted.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
        }
    }
}

/// Embeds and stores pending records batch by batch. Embeddings within a
/// batch run concurrently; failures are counted and skipped.
pub struct BatchIngestor<'a, S, E>
where
    S: VectorStore + ?Sized,
    E: Embedder + ?Sized,
{
    store: &'a S,
    embedder: &'a E,
    batch_size: usize,
    duplicate_policy: DuplicatePolicy,
    stats: IngestStats,
}

impl<'a, S, E> BatchIngestor<'a, S, E>
where
    S: VectorStore + ?Sized,
    E: Embedder + ?Sized,
{
    pub fn new(store: &'a S, embedder: &'a E, options: &IngestionOptions) -> Self {
        Self {
            store,
            embedder,
            batch_size: options.batch_size.max(1),
            duplicate_policy: options.duplicate_policy,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub async fn ingest(&self, records: Vec<PendingRecord>) -> IngestSummary {
        let total = records.len();
        let mut pending = records.into_iter();
        let mut batch_number = 0usize;

        loop {
            let batch: Vec<PendingRecord> = pending.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            batch_number += 1;
            self.ingest_batch(batch).await;
            debug!(batch = batch_number, total, "batch finished");
        }

        let summary = self.stats.snapshot();
        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            failed = summary.failed,
            duplicates = summary.duplicates,
            "ingestion finished"
        );
        summary
    }

    async fn ingest_batch(&self, batch: Vec<PendingRecord>) {
        let embeddings = join_all(
            batch
                .iter()
                .map(|record| self.embedder.embed(&record.embedding_input)),
        )
        .await;

        let mut inserts = Vec::new();
        for (record, embedding) in batch.into_iter().zip(embeddings) {
            let vector = match embedding {
                Ok(vector) => vector,
                Err(error) => {
                    warn!(
                        source = record.metadata.source(),
                        %error,
                        "embedding failed, record skipped"
                    );
                    self.stats.add_failed(1);
                    continue;
                }
            };

            match record.metadata.chunk_id().map(str::to_string) {
                Some(chunk_id) => self.store_faq(record, vector, chunk_id).await,
                None => inserts.push(record.into_record(Uuid::new_v4().to_string(), vector)),
            }
        }

        if inserts.is_empty() {
            return;
        }
        match self.store.insert(&inserts).await {
            Ok(()) => self.stats.add_inserted(inserts.len()),
            Err(error) => {
                warn!(count = inserts.len(), %error, "store insert failed");
                self.stats.add_failed(inserts.len());
            }
        }
    }

    async fn store_faq(&self, record: PendingRecord, vector: Vec<f32>, chunk_id: String) {
        let existing = match self.store.find_one(&RecordFilter::by_chunk_id(&chunk_id)).await {
            Ok(existing) => existing,
            Err(error) => {
                warn!(chunk_id = %chunk_id, %error, "duplicate lookup failed");
                self.stats.add_failed(1);
                return;
            }
        };

        let result = match (existing, self.duplicate_policy) {
            (Some(_), DuplicatePolicy::Skip) => {
                debug!(chunk_id = %chunk_id, "faq entry already stored, skipping");
                self.stats.add_duplicates(1);
                return;
            }
            (Some(existing), DuplicatePolicy::Update) => self
                .store
                .update(&record.into_record(existing.id, vector))
                .await
                .map(|()| self.stats.add_updated(1)),
            (None, _) => self
                .store
                .insert(&[record.into_record(Uuid::new_v4().to_string(), vector)])
                .await
                .map(|()| self.stats.add_inserted(1)),
        };

        if let Err(error) = result {
            warn!(chunk_id = %chunk_id, %error, "faq store write failed");
            self.stats.add_failed(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::EmbeddingError;
    use crate::extractor::PageText;
    use crate::models::{QueryLanguage, RecordType};
    use crate::store::ensure_collection;
    use crate::stores::InMemoryVectorStore;
    use async_trait::async_trait;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    const FAQ_CSV: &str = "Kategorie,Titel,Frage,Datum,Antwort,NameAntwortgeber\n\
        Prüfungen,Abmeldung,Wie melde ich mich   von einer Prüfung ab?,01.03.2024,Über das Kundenportal bis zur Frist.,SHSG\n\
        ,,How do I get my transcript?,,Via the student portal.,\n\
        Prüfungen,Abmeldung,Wie melde ich mich von einer Prüfung ab?,01.03.2024,Über das Kundenportal  bis zur Frist.,SHSG\n\
        Allgemein,Leer,,,Antwort ohne Frage,\n";

    struct FakeExtractor;

    impl PdfExtractor for FakeExtractor {
        fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
            let body = fs::read_to_string(path)?;
            if body.starts_with("broken") {
                return Err(IngestError::PdfParse("broken".to_string()));
            }
            Ok(body
                .split("<page>")
                .enumerate()
                .map(|(index, text)| PageText {
                    number: index as u32 + 1,
                    text: text.to_string(),
                })
                .collect())
        }
    }

    struct FlakyEmbedder {
        inner: CharacterNgramEmbedder,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn dimensions(&self) -> usize {
            self.inner.dimensions
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.contains("FAIL") {
                return Err(EmbeddingError::EmptyResponse);
            }
            self.inner.embed(text).await
        }
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.PDF"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("notes.txt"))?;

        let files = discover_pdf_files(base)?;
        assert_eq!(files.len(), 2);
        assert!(discover_pdf_files(&base.join("missing")).is_err());
        Ok(())
    }

    #[test]
    fn program_folders_are_processed_best_effort() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mbi = dir.path().join("MBI");
        fs::create_dir(&mbi)?;
        fs::write(
            mbi.join("auditing.pdf"),
            "8,126: Advanced AuditingECTS credits: 6\nTimetable -- Language -- Lecturer\n\
             8,126,1.00 Advanced Auditing -- English -- Meister Nicole, Schmidt Peter\n\
             <page>Second page with course content.<page>Legal notice page",
        )?;
        fs::write(mbi.join("broken.pdf"), "broken")?;

        let programs = vec!["MBI".to_string(), "MGM".to_string()];
        let config = ChunkingConfig {
            target_bytes: 80,
            overlap_bytes: 10,
        };
        let report = ingest_program_folders(dir.path(), &programs, &FakeExtractor, config)?;

        assert_eq!(report.documents, 1);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(report.skipped_folders.len(), 1);

        let full = report
            .records
            .iter()
            .find(|record| record.metadata.record_type() == RecordType::Full)
            .ok_or("missing full record")?;
        let Metadata::Full(course) = &full.metadata else {
            panic!("expected full metadata");
        };
        assert_eq!(course.program.as_deref(), Some("MBI"));
        assert_eq!(course.course_number.as_deref(), Some("8,126"));
        assert_eq!(course.ects, Some(6));
        assert_eq!(course.lecturers, ["Meister Nicole", "Schmidt Peter"]);
        assert!(full.text.contains("Advanced Auditing ECTS"));
        assert!(!full.text.contains("Legal notice"));

        let chunk_count = report
            .records
            .iter()
            .filter(|record| record.metadata.record_type() == RecordType::Chunk)
            .count();
        assert!(chunk_count > 1);
        Ok(())
    }

    #[test]
    fn faq_rows_are_cleaned_and_deduplicated() -> Result<(), IngestError> {
        let load = parse_faq_records(FAQ_CSV.as_bytes(), "faq.csv")?;

        assert_eq!(load.records.len(), 2);
        assert_eq!(load.duplicates, 1);
        assert_eq!(load.skipped_rows, 1);

        let first = &load.records[0];
        let Metadata::Faq(faq) = &first.metadata else {
            panic!("expected faq metadata");
        };
        assert_eq!(faq.frage, "Wie melde ich mich von einer Prüfung ab?");
        assert_eq!(faq.language_hint, QueryLanguage::De);
        let expected = "Wie melde ich mich von einer Prüfung ab?\nÜber das Kundenportal bis zur Frist.";
        assert_eq!(faq.chunk_id, fingerprint(expected));
        assert!(first.text.starts_with("KATEGORIE: Prüfungen\nTITEL: Abmeldung\nFRAGE: Wie"));
        assert!(first.embedding_input.contains("| melde ich mich von einer Prüfung ab."));
        assert!(first.embedding_input.contains("SUCHBEGRIFFE: Prüfungen Abmeldung Wie"));

        let second = &load.records[1];
        assert!(second.text.contains("KATEGORIE: Keine Kategorie"));
        assert!(second.text.ends_with("DATUM: Kein Datum\nANTWORTGEBER: Unbekannt"));
        assert_eq!(second.metadata.chunk_id().map(str::len), Some(32));
        Ok(())
    }

    #[test]
    fn question_answer_boundary_is_part_of_the_fingerprint() -> Result<(), IngestError> {
        let csv = "Kategorie,Titel,Frage,Datum,Antwort,NameAntwortgeber\n\
            ,,Frist ab,,c,\n\
            ,,Frist a,,bc,\n";
        let load = parse_faq_records(csv.as_bytes(), "faq.csv")?;

        assert_eq!(load.records.len(), 2);
        assert_eq!(load.duplicates, 0);
        assert_ne!(
            load.records[0].metadata.chunk_id(),
            load.records[1].metadata.chunk_id()
        );
        Ok(())
    }

    #[test]
    fn thesis_rows_need_four_columns() -> Result<(), IngestError> {
        let csv = "titleThesis,student,year,supervisor\n\
            Private Equity Exits,Anna Muster,2023,Prof. Dr. Beispiel\n\
            Too short,Someone\n";
        let records = parse_thesis_records(csv.as_bytes(), "theses.csv", b',')?;

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].text,
            "Title: Private Equity Exits\nStudent: Anna Muster\nYear: 2023\nSupervisor: Prof. Dr. Beispiel"
        );
        assert_eq!(records[0].metadata.record_type(), RecordType::Thesis);
        assert_eq!(records[0].metadata.source(), "theses.csv");
        Ok(())
    }

    async fn memory_store(
        embedder: &CharacterNgramEmbedder,
    ) -> Result<InMemoryVectorStore, IngestError> {
        let store = InMemoryVectorStore::new("courses");
        ensure_collection(&store, embedder.dimensions).await?;
        Ok(store)
    }

    #[tokio::test]
    async fn embedding_failures_are_counted_not_fatal() -> Result<(), IngestError> {
        let embedder = FlakyEmbedder {
            inner: CharacterNgramEmbedder::default(),
        };
        let store = memory_store(&embedder.inner).await?;
        let records = parse_thesis_records(
            "t,s,y,p\nA,B,2020,C\nFAIL,B,2021,C\nD,E,2022,F\nG,H,2023,I\nJ,K,2024,L\nM,N,2025,O\n"
                .as_bytes(),
            "theses.csv",
            b',',
        )?;

        let ingestor = BatchIngestor::new(&store, &embedder, &IngestionOptions::default());
        let summary = ingestor.ingest(records).await;

        assert_eq!(summary.inserted, 5);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.len().await, 5);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_policy_controls_faq_reingestion() -> Result<(), IngestError> {
        let embedder = CharacterNgramEmbedder::default();
        let store = memory_store(&embedder).await?;

        let first_run = BatchIngestor::new(&store, &embedder, &IngestionOptions::default());
        let summary = first_run
            .ingest(parse_faq_records(FAQ_CSV.as_bytes(), "faq.csv")?.records)
            .await;
        assert_eq!(summary.inserted, 2);
        let ids: Vec<String> = store.records().await.into_iter().map(|record| record.id).collect();

        let skip = IngestionOptions {
            duplicate_policy: DuplicatePolicy::Skip,
            ..IngestionOptions::default()
        };
        let skipping = BatchIngestor::new(&store, &embedder, &skip);
        let summary = skipping
            .ingest(parse_faq_records(FAQ_CSV.as_bytes(), "faq.csv")?.records)
            .await;
        assert_eq!(summary.duplicates, 2);
        assert_eq!(summary.inserted, 0);

        let updating = BatchIngestor::new(&store, &embedder, &IngestionOptions::default());
        let summary = updating
            .ingest(parse_faq_records(FAQ_CSV.as_bytes(), "faq-v2.csv")?.records)
            .await;
        assert_eq!(summary.updated, 2);

        let stored = store.records().await;
        assert_eq!(stored.len(), 2);
        let stored_ids: Vec<String> = stored.iter().map(|record| record.id.clone()).collect();
        assert_eq!(stored_ids, ids);
        assert!(stored.iter().all(|record| record.metadata.source() == "faq-v2.csv"));
        Ok(())
    }

    #[test]
    fn stats_are_shared_across_threads() {
        let stats = IngestStats::default();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..1_000 {
                        stats.add_inserted(1);
                    }
                });
            }
        });
        assert_eq!(stats.snapshot().inserted, 8_000);
    }
}
