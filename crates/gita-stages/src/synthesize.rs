use std::sync::Arc;

use gita_core::{
    ExecutionContext, PipelineState, ProgressEvent, ProgressStep, Query, Stage, StageError,
    StateUpdate, TextGenerator,
};
use serde_json::json;

use crate::prompts;
use crate::sections::{extract_sections, normalize_blockquotes};

/// Synthesize: one generation over the top verses, split into sections.
pub struct SynthesizeStage {
    generator: Arc<dyn TextGenerator>,
}

impl SynthesizeStage {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

impl Stage for SynthesizeStage {
    fn id(&self) -> &'static str {
        "synthesize.guidance.v1"
    }

    fn run(
        &self,
        _query: &Query,
        state: &PipelineState,
        ctx: &ExecutionContext,
    ) -> Result<StateUpdate, StageError> {
        let verses = state.top_verses();

        ctx.emit(
            ProgressEvent::new(
                ProgressStep::Synthesizing,
                format!("Synthesizing guidance from {} verses...", verses.len()),
            )
            .with_detail("verse_count", json!(verses.len())),
        );
        ctx.log("Synthesizing guidance from verses...");

        let prompt = prompts::synthesis(&state.user_query, &state.problem_context, verses);
        let raw = self.generator.generate(&prompt)?;
        let sections = extract_sections(&normalize_blockquotes(&raw));

        tracing::debug!(
            trace_id = %ctx.trace_id,
            analysis_len = sections.analysis.len(),
            guidance_len = sections.guidance.len(),
            exercises_len = sections.exercises.len(),
            "sections extracted"
        );

        Ok(StateUpdate {
            analysis: Some(sections.analysis),
            guidance: Some(sections.guidance),
            exercises: Some(sections.exercises),
            ..StateUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gita_core::testutil::{verse_record, RecordingObserver, ScriptedGenerator};
    use gita_core::VerseReference;

    fn state_with_verses(n: u32) -> PipelineState {
        PipelineState {
            user_query: "How to deal with stress?".into(),
            relevant_verses: (1..=n)
                .map(|i| {
                    VerseReference::new(
                        verse_record(&format!("BG 2.{}", i), 2, i, &format!("translation {}", i)),
                        0.5,
                        "q",
                    )
                })
                .collect(),
            ..PipelineState::default()
        }
    }

    #[test]
    fn test_prompt_carries_top_ten_verses_in_full() {
        let generator = Arc::new(ScriptedGenerator::new("## A. ANALYSIS\nok"));
        let recorder = Arc::new(RecordingObserver::default());
        let ctx = ExecutionContext::new().with_observer(recorder.clone());

        SynthesizeStage::new(generator.clone())
            .run(&Query::new("q"), &state_with_verses(12), &ctx)
            .unwrap();

        let prompt = &generator.prompts()[0];
        assert!(prompt.contains("purport of BG 2.10"));
        assert!(!prompt.contains("BG 2.11"));
        assert!(prompt.contains("Context: Modern challenges and contemporary life"));
        assert_eq!(recorder.events()[0].details["verse_count"], 10);
    }

    #[test]
    fn test_output_is_split_into_sections() {
        let generator = Arc::new(ScriptedGenerator::new(
            "## A. ANALYSIS\n> \"Steady the mind\"\n## B. PRACTICAL GUIDANCE\nAct.\n## C. SPIRITUAL EXERCISES\n1. Sit.",
        ));

        let update = SynthesizeStage::new(generator)
            .run(&Query::new("q"), &state_with_verses(1), &ExecutionContext::new())
            .unwrap();

        assert_eq!(update.analysis.unwrap(), "## A. ANALYSIS\n> Steady the mind");
        assert_eq!(update.guidance.unwrap(), "## B. PRACTICAL GUIDANCE\nAct.");
        assert_eq!(update.exercises.unwrap(), "## C. SPIRITUAL EXERCISES\n1. Sit.");
    }

    #[test]
    fn test_generation_failure_is_stage_fatal() {
        let generator = Arc::new(ScriptedGenerator::failing("timeout"));

        let err = SynthesizeStage::new(generator)
            .run(&Query::new("q"), &state_with_verses(1), &ExecutionContext::new())
            .unwrap_err();

        assert!(matches!(err, StageError::Collaborator(_)));
    }
}
