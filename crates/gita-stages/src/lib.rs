//! Gita Stages: the four research stages run by the pipeline runner.
//!
//! # Pipeline Flow
//!
//! ```text
//! Query → Analyze → Retrieve → Synthesize → Finalize → Answer
//!           ↓          ↓           ↓            ↓
//!       questions   verses     sections    markdown
//! ```

mod analyze;
mod finalize;
mod prompts;
mod render;
mod retrieve;
mod sections;
mod synthesize;

pub use analyze::{parse_questions, AnalyzeStage};
pub use finalize::{verse_display_block, FinalizeStage, DEFAULT_EXERCISES};
pub use render::{render_answer, AnswerDocument};
pub use retrieve::{dedup_verses, RetrieveStage, SEARCH_LIMIT};
pub use sections::{extract_sections, normalize_blockquotes, Sections, EXERCISES_PLACEHOLDER};
pub use synthesize::SynthesizeStage;

use gita_core::{PipelineRunner, ResearchServices, Stage};

/// The stages in execution order: analyze → retrieve → synthesize → finalize.
pub fn research_stages(services: &ResearchServices, search_limit: usize) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(AnalyzeStage::new(services.generator.clone())),
        Box::new(
            RetrieveStage::new(services.search.clone(), services.store.clone())
                .with_limit(search_limit),
        ),
        Box::new(SynthesizeStage::new(services.generator.clone())),
        Box::new(FinalizeStage),
    ]
}

pub fn research_pipeline(services: &ResearchServices) -> PipelineRunner {
    PipelineRunner::new(research_stages(services, SEARCH_LIMIT))
}
