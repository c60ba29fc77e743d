//! Raw corpus rows and their normalization into [`VerseRecord`]s.
use gita_core::VerseRecord;
use serde::Deserialize;

/// Notes the source text appends after a chapter's last verse. When one of
/// these shows up where the transliteration should be, it is not verse text.
const CHAPTER_ENDING_PHRASES: [&str; 7] = [
    "thus end",
    "thus ends",
    "end the",
    "ends the",
    "bhaktivedanta purports",
    "concluding statement",
    "end of chapter",
];

/// One row as stored on disk. Older exports carry transliteration and word
/// meanings together in `synonyms`; newer ones have them split already.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVerse {
    pub verse_id: String,
    pub chapter: u32,
    pub verse_number: u32,
    #[serde(default)]
    pub synonyms: Option<String>,
    #[serde(default)]
    pub transliteration: Option<String>,
    #[serde(default)]
    pub word_meanings: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub purport: Option<String>,
}

impl RawVerse {
    pub fn into_record(self) -> VerseRecord {
        let (split_transliteration, split_meanings) = self
            .synonyms
            .as_deref()
            .map(split_synonyms)
            .unwrap_or((None, None));

        VerseRecord {
            verse_id: self.verse_id,
            chapter: self.chapter,
            verse_number: self.verse_number,
            transliteration: non_blank(self.transliteration)
                .or(split_transliteration)
                .filter(|t| !is_chapter_ending(t)),
            word_meanings: non_blank(self.word_meanings).or(split_meanings),
            translation: non_blank(self.translation),
            purport: non_blank(self.purport),
        }
    }
}

/// Splits a combined synonyms block into `(transliteration, word_meanings)`.
///
/// Word meanings start at the first line with an em-dash or a colon; every
/// line before it is transliteration, kept with its line breaks.
pub fn split_synonyms(text: &str) -> (Option<String>, Option<String>) {
    let mut transliteration = Vec::new();
    let mut meanings = Vec::new();
    let mut in_meanings = false;

    for line in text.lines().map(str::trim) {
        if !in_meanings && !line.is_empty() && (line.contains('—') || line.contains(':')) {
            in_meanings = true;
        }
        if in_meanings {
            meanings.push(line);
        } else {
            transliteration.push(line);
        }
    }

    let transliteration = joined(&transliteration).filter(|t| !is_chapter_ending(t));
    (transliteration, joined(&meanings))
}

fn is_chapter_ending(text: &str) -> bool {
    let lower = text.to_lowercase();
    CHAPTER_ENDING_PHRASES.iter().any(|p| lower.contains(p))
}

fn joined(lines: &[&str]) -> Option<String> {
    non_blank(Some(lines.join("\n")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_synonyms() {
        let raw = "karmaṇy evādhikāras te\nmā phaleṣu kadācana\n\nkarmaṇi — in prescribed duties; eva — certainly\nte — of you";

        let (transliteration, meanings) = split_synonyms(raw);

        assert_eq!(transliteration.unwrap(), "karmaṇy evādhikāras te\nmā phaleṣu kadācana");
        assert_eq!(
            meanings.unwrap(),
            "karmaṇi — in prescribed duties; eva — certainly\nte — of you"
        );
    }

    #[test]
    fn test_colon_starts_meanings() {
        let (transliteration, meanings) = split_synonyms("yoga-sthaḥ\nyoga-sthaḥ: steadfast in yoga");

        assert_eq!(transliteration.as_deref(), Some("yoga-sthaḥ"));
        assert_eq!(meanings.as_deref(), Some("yoga-sthaḥ: steadfast in yoga"));
    }

    #[test]
    fn test_chapter_ending_note_is_dropped() {
        let (transliteration, meanings) = split_synonyms(
            "Thus end the Bhaktivedanta Purports to the Second Chapter of the Śrīmad Bhagavad-gītā",
        );

        assert_eq!(transliteration, None);
        assert_eq!(meanings, None);
    }

    #[test]
    fn test_explicit_fields_win_over_synonyms() {
        let record = RawVerse {
            verse_id: "BG 2.47".into(),
            chapter: 2,
            verse_number: 47,
            synonyms: Some("old\nold — meaning".into()),
            transliteration: Some("karmaṇy evādhikāras te".into()),
            translation: Some("  You have a right to perform your duty.  ".into()),
            purport: Some("   ".into()),
            ..RawVerse::default()
        }
        .into_record();

        assert_eq!(record.transliteration.as_deref(), Some("karmaṇy evādhikāras te"));
        assert_eq!(record.word_meanings.as_deref(), Some("old — meaning"));
        assert_eq!(record.translation.as_deref(), Some("You have a right to perform your duty."));
        assert_eq!(record.purport, None);
    }
}
