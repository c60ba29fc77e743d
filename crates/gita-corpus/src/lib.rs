//! Gita Corpus: concrete collaborators behind the research stages.
//!
//! - [`JsonVerseStore`]: verse catalog loaded from a JSON export
//! - [`LexicalSearch`]: term-overlap ranking over that catalog
//! - [`OpenAiGenerator`]: chat completions over HTTP

mod generator;
mod record;
mod search;
mod store;

pub use generator::{GeneratorConfig, OpenAiGenerator, OPENAI_BASE_URL, OPENROUTER_BASE_URL};
pub use record::{split_synonyms, RawVerse};
pub use search::LexicalSearch;
pub use store::{CorpusStats, JsonVerseStore, VerseFilter};

use std::sync::Arc;

use gita_core::{CollaboratorError, ResearchServices};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("CORPUS/IO: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CORPUS/PARSE: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Wires the default adapters around one shared catalog.
pub fn research_services(
    store: Arc<JsonVerseStore>,
    generator: GeneratorConfig,
) -> Result<ResearchServices, CollaboratorError> {
    let generator = OpenAiGenerator::new(generator)?;
    Ok(ResearchServices::new(
        Arc::new(LexicalSearch::new(store.clone())),
        store,
        Arc::new(generator),
    ))
}
