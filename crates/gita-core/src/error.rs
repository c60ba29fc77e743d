//! Unified Error Model
use thiserror::Error;

use crate::stage::StageError;

/// Failure of a whole run.
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("VALIDATION/{0}")]
    Validation(String),

    #[error("{stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: StageError,
    },

    #[error("CANCELLED/run {0} was cancelled")]
    Cancelled(String),

    #[error("TASK/{0}")]
    Task(String),
}

impl ResearchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled(_)
                | Self::Stage {
                    source: StageError::Cancelled,
                    ..
                }
        )
    }
}

/// Failure reported by an external collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("SEARCH/{0}")]
    Search(String),

    #[error("STORE/{0}")]
    Store(String),

    #[error("GEN/{0}")]
    Generation(String),

    #[error("CONFIG/{0}")]
    Config(String),
}
