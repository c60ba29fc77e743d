//! Gita Core: Stage trait, pipeline runner, progress bus and stream controller
//!
//! A research run turns one [`Query`] into an accumulated [`PipelineState`]
//! by executing the stages `analyze → retrieve → synthesize → finalize` in
//! order. Streaming runs execute on a blocking worker and report through a
//! [`ProgressBus`]; the [`StreamController`] drains it for the client.

pub mod bus;
pub mod collaborators;
pub mod context;
pub mod data_model;
pub mod error;
pub mod observer;
pub mod runner;
pub mod stage;
pub mod stream;

#[cfg(any(test, feature = "test-util"))]
pub mod testutil;

pub use bus::{progress_bus, BusStats, Polled, ProgressBus, ProgressReceiver};
pub use collaborators::{CorpusSearch, ResearchServices, SearchHit, TextGenerator, VerseStore};
pub use context::ExecutionContext;
pub use data_model::{
    ProgressEvent, ProgressStep, PipelineState, Query, ResearchResponse, StateUpdate,
    VerseRecord, VerseReference,
};
pub use error::{CollaboratorError, ResearchError};
pub use observer::{FanoutObserver, NoopObserver, ProgressObserver, TracingObserver};
pub use runner::{PipelineRunner, RunOutcome, StageReport};
pub use stage::{Stage, StageError};
pub use stream::{spawn_streaming_run, StreamController, WireEvent};

/// Engine version reported by the API.
pub const GITA_VERSION: &str = "1.0.0";

/// Maximum verses carried into prompts, displays and responses.
pub const TOP_VERSES: usize = 10;
