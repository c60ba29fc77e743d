//! Prompt builders for the generative model.
use gita_core::VerseReference;

pub(crate) fn problem_analysis(query: &str) -> String {
    format!(
        r#"You are an expert spiritual counselor analyzing a modern person's problem or question, with special attention to Gen Z and Gen Alpha challenges.

User's Query: "{query}"

Your task:
1. Identify the core issue or question (consider modern context like digital age, social media, AI, etc.)
2. Extract key themes (e.g., stress, relationships, purpose, decision-making, leadership, resilience, morals, ethics, etc.)
3. Identify which Bhagavad Gita principles might be relevant (karma yoga, dharma, detachment, equanimity, self-knowledge, etc.)
4. Note any generational or modern context (Gen Z, Gen Alpha, digital age, social media, technology, etc.)

Return a structured analysis in this format:
CORE_ISSUE: [one sentence describing the core problem, including modern context if relevant]
KEY_THEMES: [comma-separated list of themes]
RELEVANT_PRINCIPLES: [comma-separated list of Gita concepts]
MODERN_CONTEXT: [note if this involves Gen Z/Gen Alpha, digital age, technology, social media, etc.]
"#
    )
}

pub(crate) fn research_questions(analysis: &str) -> String {
    format!(
        r#"Based on this problem analysis, generate 4-6 specific research questions to search in the Bhagavad Gita:

{analysis}

Generate questions that will help find relevant verses about:
- The specific themes identified
- Leadership, resilience or moral guidance where the analysis calls for it
- Practical application of Gita principles

Make questions specific and focused. Return ONLY the questions, one per line, no numbering."#
    )
}

fn verse_context(verse: &VerseReference) -> String {
    let v = &verse.verse;
    format!(
        "\nVerse {} (Chapter {}, Verse {}):\nTransliteration: {}\nWord Meanings: {}\nTranslation: {}\nPurport: {}\n",
        v.verse_id,
        v.chapter,
        v.verse_number,
        v.transliteration.as_deref().unwrap_or("N/A"),
        v.word_meanings.as_deref().unwrap_or("N/A"),
        v.translation.as_deref().unwrap_or("N/A"),
        v.purport.as_deref().unwrap_or("N/A"),
    )
}

/// Full, untruncated verse text for every verse passed in.
pub(crate) fn synthesis(query: &str, context: &str, verses: &[VerseReference]) -> String {
    let context = if context.trim().is_empty() {
        "Modern challenges and contemporary life"
    } else {
        context
    };
    let verses_context = verses
        .iter()
        .map(verse_context)
        .collect::<Vec<_>>()
        .join("\n---\n");

    format!(
        r####"You are an expert spiritual guide helping a modern person solve their problem using Bhagavad Gita wisdom.

User's Problem: {query}
Context: {context}

Relevant Bhagavad Gita Verses (from the database):
{verses_context}

STRICT INSTRUCTIONS:

1. GROUNDING:
   - ONLY use information from the verses provided above
   - DO NOT use outside knowledge about the Bhagavad Gita
   - If a concept is not in the provided verses, say so explicitly

2. CITATIONS:
   - Always cite the verse ID when referencing a verse (e.g., "As stated in **BG 3.30**...")
   - Quote translations or purports with > blockquotes, without quotation marks inside
   - Label your own interpretation as interpretation

3. SECTIONS (each substantial, use ## and ### headers, lists and blank lines):

## A. ANALYSIS
   How the provided verses address this problem, quoting translations and purports.

## B. PRACTICAL GUIDANCE
   Specific, actionable steps grounded in the verses, with **bold verse IDs**.

## C. SPIRITUAL EXERCISES
   REQUIRED. 5-7 numbered exercises ("### Exercise 1: [Title]"), each citing the verse it is based on,
   covering daily practices, weekly reflections and long-term cultivation.

Your response must be grounded in the verses provided above."####
    )
}
