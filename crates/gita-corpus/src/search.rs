//! Term-overlap search over the verse catalog.
use std::collections::HashSet;
use std::sync::Arc;

use gita_core::{CollaboratorError, CorpusSearch, SearchHit, VerseRecord};

use crate::store::JsonVerseStore;

const STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from",
    "how", "i", "in", "is", "it", "me", "my", "of", "on", "one", "or", "say", "should", "that",
    "the", "their", "this", "to", "what", "when", "which", "who", "why", "with", "you", "your",
];

/// Scores each verse by the share of query terms it contains. Ties keep
/// corpus order.
pub struct LexicalSearch {
    store: Arc<JsonVerseStore>,
    terms: Vec<HashSet<String>>,
}

impl LexicalSearch {
    pub fn new(store: Arc<JsonVerseStore>) -> Self {
        let terms = store.verses().iter().map(verse_terms).collect();
        Self { store, terms }
    }
}

impl CorpusSearch for LexicalSearch {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, CollaboratorError> {
        let query_terms: HashSet<String> = tokenize(query).collect();
        if query_terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .terms
            .iter()
            .enumerate()
            .filter_map(|(i, verse_terms)| {
                let matched = query_terms.iter().filter(|t| verse_terms.contains(*t)).count();
                (matched > 0).then(|| (i, matched as f32 / query_terms.len() as f32))
            })
            .collect();
        // Stable sort keeps corpus order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let verses = self.store.verses();
        let hits: Vec<SearchHit> = scored
            .into_iter()
            .take(limit)
            .map(|(i, score)| SearchHit::new(verses[i].verse_id.clone(), score))
            .collect();

        tracing::debug!(query, hits = hits.len(), "lexical search");
        Ok(hits)
    }
}

fn verse_terms(verse: &VerseRecord) -> HashSet<String> {
    [&verse.translation, &verse.purport, &verse.word_meanings]
        .into_iter()
        .flatten()
        .flat_map(|text| tokenize(text))
        .collect()
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verse(id: &str, translation: &str) -> VerseRecord {
        VerseRecord {
            verse_id: id.to_string(),
            translation: Some(translation.to_string()),
            ..VerseRecord::default()
        }
    }

    fn search() -> LexicalSearch {
        LexicalSearch::new(Arc::new(JsonVerseStore::from_records(vec![
            verse("BG 2.47", "Perform your duty without attachment to the fruits of work."),
            verse("BG 6.35", "The restless mind is controlled by practice and detachment."),
            verse("BG 16.1", "Fearlessness and purification of one's existence."),
            verse("BG 2.48", "Perform your duty equipoised, abandoning all attachment."),
        ])))
    }

    fn ids(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.identity_key.as_str()).collect()
    }

    #[test]
    fn test_ranks_by_term_overlap() {
        let hits = search().search("How to control the restless mind?", 5).unwrap();

        assert_eq!(ids(&hits), vec!["BG 6.35"]);
        assert!((hits[0].score - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_corpus_order_and_limit() {
        let hits = search().search("duty attachment practice", 5).unwrap();
        assert_eq!(ids(&hits), vec!["BG 2.47", "BG 2.48", "BG 6.35"]);
        assert!((hits[2].score - 1.0 / 3.0).abs() < 1e-6);

        let limited = search().search("duty attachment practice", 1).unwrap();
        assert_eq!(ids(&limited), vec!["BG 2.47"]);
    }

    #[test]
    fn test_stop_words_only_matches_nothing() {
        assert!(search().search("what is the", 5).unwrap().is_empty());
    }
}
