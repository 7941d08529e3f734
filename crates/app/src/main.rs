use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use course_rag_core::{
    assemble_prompt, ensure_collection, extract_document_text, extract_metadata,
    format_context, ingest_program_folders, load_faq_csv, load_thesis_rows, normalize,
    strip_trailing_page, BatchIngestor, CharacterNgramEmbedder, ChunkingConfig, DuplicatePolicy,
    Embedder, IngestionOptions, LopdfExtractor, OpenAiConfig, OpenAiEmbedder, QdrantStore,
    RetrievalBlender, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_OPENAI_MODEL, DEFAULT_PROGRAMS, OPENAI_EMBEDDING_DIMENSIONS,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_PREAMBLE: &str = "You are a helpful study assistant for master programs. \
Answer from the documents in the context. If the context does not contain the answer, say so.";

#[derive(Parser)]
#[command(name = "course-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Collection holding course, FAQ and thesis records
    #[arg(long, env = "COLLECTION", default_value = "course_rag")]
    collection: String,

    /// Embedding backend
    #[arg(long, value_enum, default_value_t = EmbedderKind::Openai)]
    embedder: EmbedderKind,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    openai_base_url: String,

    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_OPENAI_MODEL)]
    embedding_model: String,

    /// Vector dimension; defaults to the chosen backend's native size.
    #[arg(long)]
    dimensions: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    Openai,
    Ngram,
}

#[derive(Clone, Copy, ValueEnum)]
enum DuplicateArg {
    Skip,
    Update,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(value: DuplicateArg) -> Self {
        match value {
            DuplicateArg::Skip => DuplicatePolicy::Skip,
            DuplicateArg::Update => DuplicatePolicy::Update,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Ingest course fact sheets from `<base>/<program>` folders.
    IngestCourses {
        #[arg(long)]
        base: PathBuf,
        /// Program folder names; defaults to all known programs.
        #[arg(long = "program")]
        programs: Vec<String>,
        #[arg(long, default_value_t = 1_000)]
        chunk_size: usize,
        #[arg(long, default_value_t = 200)]
        chunk_overlap: usize,
    },
    /// Ingest FAQ rows from a CSV export.
    IngestFaq {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t = DuplicateArg::Update)]
        duplicates: DuplicateArg,
    },
    /// Ingest thesis registry rows from a CSV or TSV export.
    IngestTheses {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the metadata extracted from one fact sheet.
    Extract {
        #[arg(long)]
        file: PathBuf,
    },
    /// Classify a query and print the blended context.
    Query {
        #[arg(long)]
        text: String,
        /// Print the assembled chat messages instead of the bare context.
        #[arg(long, default_value_t = false)]
        show_prompt: bool,
    },
}

fn build_embedder(cli: &Cli) -> anyhow::Result<Box<dyn Embedder>> {
    match cli.embedder {
        EmbedderKind::Ngram => Ok(Box::new(CharacterNgramEmbedder {
            dimensions: cli.dimensions.unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS),
        })),
        EmbedderKind::Openai => {
            let api_key = cli
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY is required for the openai embedder")?;
            let config = OpenAiConfig {
                base_url: cli.openai_base_url.clone(),
                model: cli.embedding_model.clone(),
                dimensions: cli.dimensions.unwrap_or(OPENAI_EMBEDDING_DIMENSIONS),
                ..OpenAiConfig::new(api_key)
            };
            Ok(Box::new(OpenAiEmbedder::new(config)?))
        }
    }
}

async fn ingest(
    store: &QdrantStore,
    embedder: &dyn Embedder,
    options: &IngestionOptions,
    records: Vec<course_rag_core::PendingRecord>,
    duplicates_in_source: usize,
) -> anyhow::Result<()> {
    ensure_collection(store, embedder.dimensions()).await?;
    let ingestor = BatchIngestor::new(store, embedder, options);
    ingestor.stats().add_duplicates(duplicates_in_source);
    let summary = ingestor.ingest(records).await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if summary.failed > 0 {
        warn!(failed = summary.failed, "some records were not stored");
    }
    Ok(())
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "course-rag boot"
    );

    match &cli.command {
        Command::IngestCourses {
            base,
            programs,
            chunk_size,
            chunk_overlap,
        } => {
            let programs = if programs.is_empty() {
                DEFAULT_PROGRAMS.iter().map(|name| name.to_string()).collect()
            } else {
                programs.clone()
            };
            let options = IngestionOptions {
                chunk_target_bytes: *chunk_size,
                chunk_overlap_bytes: *chunk_overlap,
                ..IngestionOptions::default()
            };

            let report = ingest_program_folders(
                base,
                &programs,
                &LopdfExtractor,
                ChunkingConfig::from(&options),
            )?;
            for skipped in report.skipped_folders.iter().chain(&report.skipped_files) {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped source");
            }
            info!(
                documents = report.documents,
                records = report.records.len(),
                "fact sheets prepared"
            );

            let embedder = build_embedder(&cli)?;
            let store = QdrantStore::new(&cli.qdrant_url, &cli.collection)?;
            ingest(&store, embedder.as_ref(), &options, report.records, 0).await?;
        }
        Command::IngestFaq { csv, duplicates } => {
            let load = load_faq_csv(csv)?;
            info!(
                rows = load.records.len(),
                skipped = load.skipped_rows,
                duplicates = load.duplicates,
                "faq rows prepared"
            );
            let options = IngestionOptions {
                duplicate_policy: (*duplicates).into(),
                ..IngestionOptions::default()
            };

            let embedder = build_embedder(&cli)?;
            let store = QdrantStore::new(&cli.qdrant_url, &cli.collection)?;
            ingest(&store, embedder.as_ref(), &options, load.records, load.duplicates).await?;
        }
        Command::IngestTheses { file } => {
            let records = load_thesis_rows(file)?;
            info!(rows = records.len(), "thesis rows prepared");

            let embedder = build_embedder(&cli)?;
            let store = QdrantStore::new(&cli.qdrant_url, &cli.collection)?;
            ingest(&store, embedder.as_ref(), &IngestionOptions::default(), records, 0).await?;
        }
        Command::Extract { file } => {
            let text = extract_document_text(&LopdfExtractor, file)?;
            let stripped = strip_trailing_page(&normalize(&text));
            let mut metadata = extract_metadata(&stripped, &source_name(file));
            metadata.path = Some(file.display().to_string());
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Query { text, show_prompt } => {
            let embedder = build_embedder(&cli)?;
            let store = QdrantStore::new(&cli.qdrant_url, &cli.collection)?;
            let blender = RetrievalBlender::new(store, embedder);

            let retrieval = blender.retrieve(text).await;
            let context = format_context(&retrieval.records);
            println!(
                "classification: {}",
                serde_json::to_string(&retrieval.classification)?
            );

            if *show_prompt {
                let messages = assemble_prompt(
                    DEFAULT_PREAMBLE,
                    &context,
                    &[],
                    text,
                    &retrieval.classification,
                );
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else {
                println!("{context}");
            }
        }
    }

    Ok(())
}
