use std::sync::Arc;

use gita_core::{
    ExecutionContext, PipelineState, ProgressEvent, ProgressStep, Query, Stage, StageError,
    StateUpdate, TextGenerator,
};
use serde_json::json;

use crate::prompts;

/// Analyze: problem analysis, then research questions derived from it.
pub struct AnalyzeStage {
    generator: Arc<dyn TextGenerator>,
}

impl AnalyzeStage {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

impl Stage for AnalyzeStage {
    fn id(&self) -> &'static str {
        "analyze.problem.v1"
    }

    fn run(
        &self,
        query: &Query,
        state: &PipelineState,
        ctx: &ExecutionContext,
    ) -> Result<StateUpdate, StageError> {
        ctx.emit(ProgressEvent::new(
            ProgressStep::Analyzing,
            "Analyzing your question...",
        ));
        ctx.log(format!("Analyzing problem: '{}'...", state.user_query));

        let analysis = self.generator.generate(&prompts::problem_analysis(&query.text))?;
        let raw_questions = self
            .generator
            .generate(&prompts::research_questions(&analysis))?;
        let questions = parse_questions(&raw_questions);

        if questions.is_empty() {
            tracing::warn!(trace_id = %ctx.trace_id, "model returned no usable research questions");
        }
        ctx.log(format!("Generated {} research questions", questions.len()));
        ctx.emit(
            ProgressEvent::new(
                ProgressStep::QuestionsGenerated,
                format!("Generated {} research questions", questions.len()),
            )
            .with_detail("questions", json!(questions))
            .with_detail("count", json!(questions.len())),
        );

        Ok(StateUpdate {
            problem_context: Some(analysis),
            research_questions: Some(questions),
            ..StateUpdate::default()
        })
    }
}

/// One question per non-blank line; `#` lines are headings, not questions.
pub fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
