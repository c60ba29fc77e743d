//! Final answer rendering.
//!
//! The answer is markdown, so the registry is configured without HTML
//! escaping. A `join` helper formats identifier lists.
use gita_core::StageError;
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
};
use once_cell::sync::Lazy;
use serde::Serialize;

const ANSWER_TEMPLATE: &str = r#"# 🕉️ Guidance from Bhagavad Gita

---

## 💭 Your Question

> {{query}}

---

## 📖 Analysis

{{analysis}}

---

## 🎯 Practical Guidance

{{guidance}}

---

## 🧘 Spiritual Exercises

{{exercises}}

---

## 📚 Key Verses Referenced

The following verses from the Bhagavad Gita provide the foundation for this guidance:

{{#if verses_display}}{{verses_display}}{{else}}*Verses: {{join verse_ids ", "}}*{{/if}}

---

**All Referenced Verses:** {{join verse_ids ", "}}

---

*This guidance is based on the teachings of **Bhagavad Gita As It Is** by A.C. Bhaktivedanta Swami Prabhupada.*

*All interpretations are grounded in the actual translations and purports from the source text.*
"#;

static REGISTRY: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.register_helper("join", Box::new(JoinHelper));
    handlebars
});

/// Everything the final answer template needs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnswerDocument {
    pub query: String,
    pub analysis: String,
    pub guidance: String,
    pub exercises: String,
    /// Pre-formatted verse blocks, newline separated. Empty when no verses.
    pub verses_display: String,
    /// Sorted, unique.
    pub verse_ids: Vec<String>,
}

pub fn render_answer(doc: &AnswerDocument) -> Result<String, StageError> {
    REGISTRY
        .render_template(ANSWER_TEMPLATE, doc)
        .map_err(|e| StageError::ExecutionFailed(format!("Render error: {}", e)))
}

/// Join an array with a separator
struct JoinHelper;

impl HelperDef for JoinHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let separator = h
            .param(1)
            .and_then(|v| v.value().as_str())
            .unwrap_or(", ");

        if let Some(items) = h.param(0).and_then(|v| v.value().as_array()) {
            let strings: Vec<String> = items
                .iter()
                .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
                .collect();
            out.write(&strings.join(separator))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> AnswerDocument {
        AnswerDocument {
            query: "How to deal with stress?".into(),
            analysis: "## A. ANALYSIS\nStress & <fear>".into(),
            guidance: "Act without attachment.".into(),
            exercises: "1. Breathe".into(),
            verses_display: String::new(),
            verse_ids: vec!["BG 16.1".into(), "BG 2.47".into()],
        }
    }

    #[test]
    fn test_render_contains_every_part() {
        let answer = render_answer(&doc()).unwrap();

        assert!(answer.starts_with("# 🕉️ Guidance from Bhagavad Gita"));
        assert!(answer.contains("> How to deal with stress?"));
        assert!(answer.contains("Stress & <fear>"));
        assert!(answer.contains("## 🧘 Spiritual Exercises\n\n1. Breathe"));
        assert!(answer.contains("**All Referenced Verses:** BG 16.1, BG 2.47"));
    }

    #[test]
    fn test_empty_display_lists_ids_inline() {
        let answer = render_answer(&doc()).unwrap();
        assert!(answer.contains("*Verses: BG 16.1, BG 2.47*"));
    }

    #[test]
    fn test_display_blocks_replace_inline_list() {
        let mut doc = doc();
        doc.verses_display = "#### **BG 2.47** — Chapter 2, Verse 47".into();

        let answer = render_answer(&doc).unwrap();

        assert!(answer.contains("#### **BG 2.47** — Chapter 2, Verse 47"));
        assert!(!answer.contains("*Verses:"));
    }
}
