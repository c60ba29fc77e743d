use std::collections::HashSet;
use std::sync::Arc;

use gita_core::{
    CorpusSearch, ExecutionContext, PipelineState, ProgressEvent, ProgressStep, Query, Stage,
    StageError, StateUpdate, VerseReference, VerseStore,
};
use serde_json::json;

/// Results requested from the corpus per research question.
pub const SEARCH_LIMIT: usize = 5;

/// Retrieve: searches the corpus once per research question, resolves each
/// hit through the store and merges everything into one deduplicated list.
///
/// A failed search skips its question; a failed or missing resolution skips
/// that hit. Neither aborts the stage.
pub struct RetrieveStage {
    search: Arc<dyn CorpusSearch>,
    store: Arc<dyn VerseStore>,
    limit: usize,
}

impl RetrieveStage {
    pub fn new(search: Arc<dyn CorpusSearch>, store: Arc<dyn VerseStore>) -> Self {
        Self {
            search,
            store,
            limit: SEARCH_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn resolve_batch(&self, question: &str, ctx: &ExecutionContext) -> Option<Vec<VerseReference>> {
        let hits = match self.search.search(question, self.limit) {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!(trace_id = %ctx.trace_id, question, error = %err, "search failed, skipping question");
                ctx.log(format!("    Search failed: {}", err));
                return None;
            }
        };
        ctx.log(format!("    Found {} relevant verses", hits.len()));

        let mut batch = Vec::with_capacity(hits.len());
        for hit in hits {
            if hit.identity_key.is_empty() {
                continue;
            }
            match self.store.resolve(&hit.identity_key) {
                Ok(Some(verse)) => batch.push(VerseReference::new(verse, hit.score, question)),
                Ok(None) => {
                    tracing::debug!(key = %hit.identity_key, "search hit not in store, skipping");
                }
                Err(err) => {
                    tracing::warn!(key = %hit.identity_key, error = %err, "verse resolution failed, skipping");
                }
            }
        }
        Some(batch)
    }
}

impl Stage for RetrieveStage {
    fn id(&self) -> &'static str {
        "retrieve.verses.v1"
    }

    fn run(
        &self,
        _query: &Query,
        state: &PipelineState,
        ctx: &ExecutionContext,
    ) -> Result<StateUpdate, StageError> {
        let questions = &state.research_questions;
        let total = questions.len();

        ctx.emit(
            ProgressEvent::new(
                ProgressStep::Researching,
                format!("Researching {} questions...", total),
            )
            .with_detail("total_questions", json!(total)),
        );
        ctx.log(format!("Researching {} questions...", total));

        let mut collected = Vec::new();
        for (i, question) in questions.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(StageError::Cancelled);
            }

            ctx.emit(
                ProgressEvent::new(
                    ProgressStep::SearchingVerse,
                    format!("Searching [{}/{}]: {}", i + 1, total, question),
                )
                .with_detail("index", json!(i + 1))
                .with_detail("total", json!(total))
                .with_detail("question", json!(question)),
            );
            ctx.log(format!("  [{}/{}] Searching: {}", i + 1, total, question));

            if let Some(batch) = self.resolve_batch(question, ctx) {
                collected.extend(batch);
            }
        }

        let total_results = collected.len();
        let verses = dedup_verses(collected);

        ctx.log(format!(
            "Total {} unique verses found (from {} results)",
            verses.len(),
            total_results
        ));
        ctx.emit(
            ProgressEvent::new(
                ProgressStep::VersesFound,
                format!("Found {} unique verses", verses.len()),
            )
            .with_detail("count", json!(verses.len()))
            .with_detail("total_results", json!(total_results)),
        );

        Ok(StateUpdate {
            relevant_verses: Some(verses),
            ..StateUpdate::default()
        })
    }
}

/// Keeps the first occurrence of each `verse_id`, in original order. Later
/// duplicates are discarded along with their score and source question.
pub fn dedup_verses(verses: impl IntoIterator<Item = VerseReference>) -> Vec<VerseReference> {
    let mut seen = HashSet::new();
    verses
        .into_iter()
        .filter(|v| !v.verse_id().is_empty() && seen.insert(v.verse_id().to_string()))
        .collect()
}
