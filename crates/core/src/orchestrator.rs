use crate::classifier::classify;
use crate::embeddings::Embedder;
use crate::models::{QueryClassification, Record, RecordType, RetrievalOptions};
use crate::store::{RecordFilter, SearchHit};
use crate::traits::VectorStore;
use crate::SearchError;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Retrieval {
    pub classification: QueryClassification,
    pub records: Vec<Record>,
}

/// Runs the course and FAQ similarity searches and merges them with a fixed
/// prepend rule: FAQ first for questions, course first otherwise.
pub struct RetrievalBlender<S, E>
where
    S: VectorStore,
    E: Embedder,
{
    store: S,
    embedder: E,
    options: RetrievalOptions,
}

impl<S, E> RetrievalBlender<S, E>
where
    S: VectorStore,
    E: Embedder,
{
    pub fn new(store: S, embedder: E) -> Self {
        Self::with_options(store, embedder, RetrievalOptions::default())
    }

    pub fn with_options(store: S, embedder: E, options: RetrievalOptions) -> Self {
        Self {
            store,
            embedder,
            options,
        }
    }

    /// Classifies, embeds and blends. Never fails: an embedding error yields
    /// an empty result set.
    pub async fn retrieve(&self, query: &str) -> Retrieval {
        let classification = classify(query);
        let records = match self.embedder.embed(query).await {
            Ok(vector) => self.blend(&vector, classification).await,
            Err(error) => {
                warn!(%error, "query embedding failed, returning no context");
                Vec::new()
            }
        };

        Retrieval {
            classification,
            records,
        }
    }

    pub async fn blend(
        &self,
        query_vector: &[f32],
        classification: QueryClassification,
    ) -> Vec<Record> {
        let course_filter = RecordFilter::of_type(classification.granularity.record_type());
        let faq_filter = RecordFilter::of_type(RecordType::Faq);
        let limit = self.options.per_channel_limit;

        let (course_hits, faq_hits) = tokio::join!(
            self.store.search(&course_filter, query_vector, limit),
            self.store.search(&faq_filter, query_vector, limit)
        );
        let course = channel_records("course", course_hits);
        let faq = channel_records("faq", faq_hits);
        debug!(
            course = course.len(),
            faq = faq.len(),
            is_question = classification.is_question,
            "blending search results"
        );

        merge(course, faq, classification.is_question, self.options.limit)
    }
}

fn channel_records(channel: &str, hits: Result<Vec<SearchHit>, SearchError>) -> Vec<Record> {
    match hits {
        Ok(hits) => hits.into_iter().map(|hit| hit.record).collect(),
        Err(error) => {
            warn!(channel, %error, "similarity search failed, channel left empty");
            Vec::new()
        }
    }
}

pub fn merge(course: Vec<Record>, faq: Vec<Record>, faq_first: bool, limit: usize) -> Vec<Record> {
    let (first, second) = if faq_first { (faq, course) } else { (course, faq) };
    first.into_iter().chain(second).take(limit).collect()
}
