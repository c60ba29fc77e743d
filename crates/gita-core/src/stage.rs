//! Stage Trait: the single contract every pipeline step implements
use crate::context::ExecutionContext;
use crate::data_model::{PipelineState, Query, StateUpdate};
use crate::error::CollaboratorError;

/// One ordered step of a research run.
pub trait Stage: Send + Sync {
    /// Unique stage id (ex: "analyze.problem.v1")
    fn id(&self) -> &'static str;

    /// Executes the stage against the current state and returns only the
    /// fields it produced.
    fn run(
        &self,
        query: &Query,
        state: &PipelineState,
        ctx: &ExecutionContext,
    ) -> Result<StateUpdate, StageError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageError {
    ValidationFailed(String),
    ExecutionFailed(String),
    Collaborator(CollaboratorError),
    Cancelled,
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "STAGE/VALIDATION: {}", msg),
            Self::ExecutionFailed(msg) => write!(f, "STAGE/EXEC: {}", msg),
            Self::Collaborator(err) => write!(f, "{}", err),
            Self::Cancelled => write!(f, "STAGE/CANCELLED"),
        }
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Collaborator(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CollaboratorError> for StageError {
    fn from(err: CollaboratorError) -> Self {
        Self::Collaborator(err)
    }
}
