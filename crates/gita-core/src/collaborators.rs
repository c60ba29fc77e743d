//! Collaborator interfaces consumed by the stages.
//!
//! All calls are synchronous; runs execute on a blocking worker so none of
//! these ever block the request-handling runtime.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data_model::VerseRecord;
use crate::error::CollaboratorError;

/// One similarity-search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Opaque key resolved through [`VerseStore::resolve`].
    pub identity_key: String,
    pub score: f32,
}

impl SearchHit {
    pub fn new(identity_key: impl Into<String>, score: f32) -> Self {
        Self {
            identity_key: identity_key.into(),
            score,
        }
    }
}

pub trait CorpusSearch: Send + Sync {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, CollaboratorError>;
}

pub trait VerseStore: Send + Sync {
    /// `Ok(None)` for an unknown key; absence is not an error.
    fn resolve(&self, identity_key: &str) -> Result<Option<VerseRecord>, CollaboratorError>;
}

pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

/// Collaborators handed to the stages at pipeline construction.
#[derive(Clone)]
pub struct ResearchServices {
    pub search: Arc<dyn CorpusSearch>,
    pub store: Arc<dyn VerseStore>,
    pub generator: Arc<dyn TextGenerator>,
}

impl ResearchServices {
    pub fn new(
        search: Arc<dyn CorpusSearch>,
        store: Arc<dyn VerseStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            search,
            store,
            generator,
        }
    }
}
