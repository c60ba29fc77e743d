//! Heuristic splitter for the model's three-part answer.
//!
//! The model is asked for `A. ANALYSIS`, `B. PRACTICAL GUIDANCE` and
//! `C. SPIRITUAL EXERCISES` headings but rarely follows the format exactly,
//! so detection is keyword based and `exercises` has a fallback chain that
//! always ends in non-empty text.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Substituted when no exercises can be located in the generated text.
pub const EXERCISES_PLACEHOLDER: &str = "## Spiritual Exercises\n\n*Exercises are being generated based on the verses referenced above. Please see the full answer for complete guidance with exercises.*";

const EXERCISE_KEYWORDS: [&str; 4] = [
    "spiritual exercises",
    "exercises",
    "c. spiritual",
    "c. exercises",
];
const END_MARKERS: [&str; 3] = ["key verses", "conclusion", "---"];
const END_SEARCH_GUARD: usize = 100;
const MIN_FALLBACK_LEN: usize = 200;

static QUOTED_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^>\s*"([^"]+)"\s*$"#).expect("valid regex"));
static QUOTED_LEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^>\s*"([^"]+)""#).expect("valid regex"));
static QUOTED_INNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^>([^"\n]*)"([^"\n]+)"([^"\n]*)$"#).expect("valid regex"));
static QUOTED_TRAILING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^>\s*"([^"]+)"\s+"#).expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Analysis,
    Guidance,
    Exercises,
}

impl Section {
    fn keywords(self) -> &'static [&'static str] {
        match self {
            Section::Analysis => &["ANALYSIS"],
            Section::Guidance => &["PRACTICAL GUIDANCE", "B. GUIDANCE", "## GUIDANCE"],
            Section::Exercises => &["SPIRITUAL EXERCISES", "C. EXERCISES", "## EXERCISES"],
        }
    }

    fn label(self) -> &'static str {
        match self {
            Section::Analysis => "A.",
            Section::Guidance => "B.",
            Section::Exercises => "C.",
        }
    }

    /// The first section whose keywords match decides; its marker must be
    /// present too, otherwise the line is body text.
    fn detect(line: &str) -> Option<Section> {
        let upper = line.trim().to_uppercase();
        let section = [Section::Analysis, Section::Guidance, Section::Exercises]
            .into_iter()
            .find(|s| s.keywords().iter().any(|k| upper.contains(k)))?;
        (line.contains('#') || upper.contains(section.label())).then_some(section)
    }
}

/// The three named parts of a synthesized answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sections {
    pub analysis: String,
    pub guidance: String,
    /// Never empty.
    pub exercises: String,
}

/// Strips quotation marks the model tends to put inside `>` blockquotes.
pub fn normalize_blockquotes(text: &str) -> String {
    let text = QUOTED_LINE.replace_all(text, "> ${1}");
    let text = QUOTED_LEAD.replace_all(&text, "> ${1}");
    let text = QUOTED_INNER.replace_all(&text, ">${1}${2}${3}");
    QUOTED_TRAILING.replace_all(&text, "> ${1} ").into_owned()
}

pub fn extract_sections(raw: &str) -> Sections {
    let mut analysis = String::new();
    let mut guidance = String::new();
    let mut exercises = String::new();
    let mut current = None;

    for line in raw.split('\n') {
        let header = Section::detect(line);
        if header.is_some() {
            current = header;
        }
        let target = match current {
            Some(Section::Analysis) => &mut analysis,
            Some(Section::Guidance) => &mut guidance,
            Some(Section::Exercises) => &mut exercises,
            None => continue,
        };
        // A header restarts its section, subheadings included.
        if header.is_some() {
            target.clear();
        }
        target.push_str(line);
        target.push('\n');
    }

    let analysis = match analysis.trim() {
        "" => raw.to_string(),
        found => found.to_string(),
    };
    let exercises = match exercises.trim() {
        "" => exercises_fallback(raw).unwrap_or_else(|| EXERCISES_PLACEHOLDER.to_string()),
        found => found.to_string(),
    };

    Sections {
        analysis,
        guidance: guidance.trim().to_string(),
        exercises,
    }
}

/// Slice from the first exercise keyword up to the next end marker.
/// The guard and the minimum length count chars, not bytes.
fn exercises_fallback(raw: &str) -> Option<String> {
    // ASCII lowering keeps byte offsets aligned with `raw`.
    let lower = raw.to_ascii_lowercase();

    EXERCISE_KEYWORDS.iter().find_map(|keyword| {
        let start = lower.find(keyword)?;
        let remaining = &raw[start..];
        let remaining_lower = &lower[start..];

        let guard = remaining
            .char_indices()
            .nth(END_SEARCH_GUARD)
            .map_or(remaining.len(), |(i, _)| i);
        let end = END_MARKERS
            .iter()
            .filter_map(|marker| remaining_lower[guard..].find(marker).map(|i| guard + i))
            .min()
            .unwrap_or(remaining.len());

        let slice = &remaining[..end];
        (slice.chars().count() > MIN_FALLBACK_LEN).then(|| slice.trim().to_string())
    })
}
