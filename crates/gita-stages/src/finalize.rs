use std::collections::BTreeSet;

use gita_core::{
    ExecutionContext, PipelineState, ProgressEvent, ProgressStep, Query, Stage, StageError,
    StateUpdate, VerseReference,
};

use crate::render::{render_answer, AnswerDocument};

/// Used when the exercises section reaches finalization blank.
pub const DEFAULT_EXERCISES: &str = r#"### Introduction

Based on the verses referenced above, here are practical spiritual exercises you can incorporate into your daily life:

### Daily Practices

1. **Morning Reflection** (Based on **BG 3.30** and other verses)
   - Begin each day by setting an intention to perform your duties without attachment to results
   - Take 5 minutes to reflect on your dharma and how you can serve today

2. **Mindful Action** (Based on **BG 2.48**)
   - Throughout the day, practice performing actions with equanimity
   - When facing challenges, remind yourself: "I do my duty, results are not mine to control"

3. **Evening Contemplation** (Based on the verses above)
   - End each day by reviewing your actions
   - Consider: Did I act according to my dharma? Did I remain detached from outcomes?

### Weekly Practices

4. **Dharma Alignment Review**
   - Weekly, assess if your ambitions align with your duties
   - Adjust your goals to ensure they serve your higher purpose

5. **Service Practice**
   - Dedicate time each week to selfless service
   - This could be helping others, contributing to your community, or supporting a cause

### Long-term Cultivation

6. **Purpose Discovery**
   - Regularly reflect on your true nature and calling
   - Align your career and life choices with your inherent talents and duties

7. **Detachment Practice**
   - Gradually reduce attachment to external validation
   - Focus on the quality of your work rather than praise or criticism

*These exercises are based on the principles found in the verses referenced above. Adapt them to your personal circumstances and lifestyle.*"#;

/// Finalize: assembles the markdown answer from the accumulated state.
pub struct FinalizeStage;

impl Stage for FinalizeStage {
    fn id(&self) -> &'static str {
        "finalize.answer.v1"
    }

    fn run(
        &self,
        _query: &Query,
        state: &PipelineState,
        ctx: &ExecutionContext,
    ) -> Result<StateUpdate, StageError> {
        ctx.emit(ProgressEvent::new(
            ProgressStep::Finalizing,
            "Finalizing answer...",
        ));
        ctx.log("Finalizing comprehensive answer...");

        let top = state.top_verses();
        let verse_ids: Vec<String> = top
            .iter()
            .map(|v| v.verse_id().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let verses_display = top
            .iter()
            .map(verse_display_block)
            .collect::<Vec<_>>()
            .join("\n");

        let exercises = if state.exercises.trim().is_empty() {
            DEFAULT_EXERCISES.to_string()
        } else {
            state.exercises.clone()
        };

        let answer = render_answer(&AnswerDocument {
            query: state.user_query.clone(),
            analysis: state.analysis.clone(),
            guidance: state.guidance.clone(),
            exercises,
            verses_display,
            verse_ids,
        })?;

        Ok(StateUpdate {
            final_answer: Some(answer),
            ..StateUpdate::default()
        })
    }
}

/// Markdown block for one verse: heading, italic transliteration with its
/// line breaks intact, word meanings, and the translation on one line.
pub fn verse_display_block(verse: &VerseReference) -> String {
    let v = &verse.verse;
    let mut block = format!(
        "#### **{}** — Chapter {}, Verse {}\n\n",
        v.verse_id, v.chapter, v.verse_number
    );

    if let Some(t) = non_blank(&v.transliteration) {
        block.push_str(&format!("*{}*\n\n", t));
    }
    if let Some(w) = non_blank(&v.word_meanings) {
        block.push_str(&format!("**Word Meanings:**\n{}\n\n", w));
    }

    let translation = non_blank(&v.translation)
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_else(|| "N/A".to_string());
    block.push_str("> ");
    block.push_str(&translation);
    block
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gita_core::testutil::{verse_record, RecordingObserver};
    use std::sync::Arc;

    fn reference(id: &str, chapter: u32, number: u32) -> VerseReference {
        VerseReference::new(verse_record(id, chapter, number, "translation"), 0.5, "q")
    }

    fn state(verses: Vec<VerseReference>, exercises: &str) -> PipelineState {
        PipelineState {
            user_query: "How to deal with stress?".into(),
            analysis: "analysis text".into(),
            guidance: "guidance text".into(),
            exercises: exercises.into(),
            relevant_verses: verses,
            ..PipelineState::default()
        }
    }

    fn finalize(state: &PipelineState) -> String {
        FinalizeStage
            .run(&Query::new(&state.user_query), state, &ExecutionContext::new())
            .unwrap()
            .final_answer
            .unwrap()
    }

    #[test]
    fn test_display_block_formatting() {
        let mut verse = verse_record("BG 2.47", 2, 47, "You have a right\n  to perform   your duty");
        verse.transliteration = Some("karmaṇy evādhikāras te\nmā phaleṣu kadācana".into());
        verse.word_meanings = Some("karmaṇi — in prescribed duties".into());

        let block = verse_display_block(&VerseReference::new(verse, 0.9, "q"));

        assert_eq!(
            block,
            "#### **BG 2.47** — Chapter 2, Verse 47\n\n\
             *karmaṇy evādhikāras te\nmā phaleṣu kadācana*\n\n\
             **Word Meanings:**\nkarmaṇi — in prescribed duties\n\n\
             > You have a right to perform your duty"
        );
    }

    #[test]
    fn test_display_block_without_optional_fields() {
        let mut verse = verse_record("BG 1.1", 1, 1, "   ");
        verse.transliteration = None;
        verse.word_meanings = Some(" ".into());

        let block = verse_display_block(&VerseReference::new(verse, 0.1, "q"));

        assert_eq!(block, "#### **BG 1.1** — Chapter 1, Verse 1\n\n> N/A");
    }

    #[test]
    fn test_blank_exercises_get_default_list() {
        let answer = finalize(&state(vec![], "  "));

        assert!(answer.contains("7. **Detachment Practice**"));
        assert!(answer.contains("### Weekly Practices"));
    }

    #[test]
    fn test_only_top_ten_verses_are_listed() {
        let verses: Vec<_> = (1..=12).map(|n| reference(&format!("BG 2.{}", n), 2, n)).collect();

        let answer = finalize(&state(verses, "1. Breathe"));

        assert!(answer.contains("**BG 2.10**"));
        assert!(!answer.contains("BG 2.11"));
        assert!(answer.contains("**All Referenced Verses:** BG 2.1, BG 2.10, BG 2.2"));
        assert!(answer.contains("1. Breathe"));
    }

    #[test]
    fn test_same_state_renders_same_answer() {
        let s = state(vec![reference("BG 6.35", 6, 35), reference("BG 2.47", 2, 47)], "x");
        assert_eq!(finalize(&s), finalize(&s));
    }

    #[test]
    fn test_emits_finalizing() {
        let recorder = Arc::new(RecordingObserver::default());
        let ctx = ExecutionContext::new().with_observer(recorder.clone());
        let s = state(vec![], "x");

        FinalizeStage.run(&Query::new("q"), &s, &ctx).unwrap();

        assert_eq!(recorder.steps(), vec![ProgressStep::Finalizing]);
    }
}
