//! Pipeline Runner: executes the stages in order, merging each partial
//! update into the run's state and recording a report per stage.
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::data_model::{PipelineState, ProgressEvent, Query, ResearchResponse};
use crate::error::ResearchError;
use crate::stage::{Stage, StageError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub id: String,
    pub in_hash: String,
    pub out_hash: String,
    pub latency_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: PipelineState,
    pub reports: Vec<StageReport>,
}

pub struct PipelineRunner {
    stages: Vec<Box<dyn Stage>>,
    pipeline_id: String,
}

impl PipelineRunner {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        let pipeline_id = stages
            .iter()
            .map(|s| s.id().split('.').next().unwrap_or("?"))
            .collect::<Vec<_>>()
            .join("→");

        Self { stages, pipeline_id }
    }

    /// Blocking variant: a stage failure propagates to the caller.
    pub fn run(&self, query: &Query, ctx: &ExecutionContext) -> Result<RunOutcome, ResearchError> {
        self.execute(query, ctx)
    }

    /// Instrumented variant: always ends with exactly one terminal event
    /// (`completed` or `error`) unless the run was cancelled, in which case
    /// the bus is already closed to it.
    pub fn run_streaming(
        &self,
        query: &Query,
        ctx: &ExecutionContext,
    ) -> Result<RunOutcome, ResearchError> {
        match self.execute(query, ctx) {
            Ok(outcome) => {
                ctx.emit(ProgressEvent::completed(&ResearchResponse::from_state(
                    &outcome.state,
                )));
                Ok(outcome)
            }
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                tracing::error!(trace_id = %ctx.trace_id, error = %err, "research run failed");
                ctx.emit(ProgressEvent::error(err.to_string()));
                Err(err)
            }
        }
    }

    fn execute(&self, query: &Query, ctx: &ExecutionContext) -> Result<RunOutcome, ResearchError> {
        if query.text.trim().is_empty() {
            return Err(ResearchError::Validation("query must not be empty".to_string()));
        }

        let mut state = PipelineState::from_query(query);
        let mut reports = Vec::with_capacity(self.stages.len());

        tracing::info!(trace_id = %ctx.trace_id, pipeline = %self.pipeline_id, "research run started");

        for stage in &self.stages {
            if ctx.is_cancelled() {
                tracing::info!(trace_id = %ctx.trace_id, stage = stage.id(), "run cancelled before stage");
                return Err(ResearchError::Cancelled(ctx.trace_id.clone()));
            }

            let start = Instant::now();
            let in_hash = hash_state(&state);

            let update = stage.run(query, &state, ctx).map_err(|source| match source {
                StageError::Cancelled => ResearchError::Cancelled(ctx.trace_id.clone()),
                source => ResearchError::Stage {
                    stage: stage.id(),
                    source,
                },
            })?;
            state.apply(update);

            let latency_ms = start.elapsed().as_millis() as u64;
            tracing::debug!(trace_id = %ctx.trace_id, stage = stage.id(), latency_ms, "stage finished");

            reports.push(StageReport {
                id: stage.id().to_string(),
                in_hash,
                out_hash: hash_state(&state),
                latency_ms,
            });
        }

        if ctx.is_cancelled() {
            return Err(ResearchError::Cancelled(ctx.trace_id.clone()));
        }

        Ok(RunOutcome { state, reports })
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

fn hash_state(state: &PipelineState) -> String {
    let bytes = serde_json::to_vec(state).unwrap_or_default();
    format!("blake3:{}", blake3::hash(&bytes))
}
