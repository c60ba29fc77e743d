//! In-memory verse catalog loaded from a JSON export.
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use gita_core::{CollaboratorError, VerseRecord, VerseStore};
use serde::{Deserialize, Serialize};

use crate::record::RawVerse;
use crate::CorpusError;

/// Query parameters for listing verses. `verse_id` takes precedence, then
/// `chapter` with `verse_number`, then `chapter` alone; anything else lists
/// the whole corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VerseFilter {
    pub chapter: Option<u32>,
    pub verse_number: Option<u32>,
    pub verse_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub total_verses: usize,
    pub chapters: usize,
}

#[derive(Debug, Default)]
pub struct JsonVerseStore {
    verses: Vec<VerseRecord>,
    index: HashMap<String, usize>,
}

impl JsonVerseStore {
    /// Load a JSON array of verse rows from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), verses = store.len(), "verse corpus loaded");
        Ok(store)
    }

    pub fn from_json(content: &str) -> Result<Self, CorpusError> {
        let rows: Vec<RawVerse> = serde_json::from_str(content)?;
        Ok(Self::from_records(rows.into_iter().map(RawVerse::into_record)))
    }

    /// A later record with the same `verse_id` replaces the earlier one in place.
    pub fn from_records(records: impl IntoIterator<Item = VerseRecord>) -> Self {
        let mut store = Self::default();
        for record in records {
            if record.verse_id.is_empty() {
                tracing::warn!(chapter = record.chapter, verse = record.verse_number, "skipping verse without id");
                continue;
            }
            match store.index.get(&record.verse_id) {
                Some(&i) => {
                    tracing::debug!(verse_id = %record.verse_id, "duplicate verse id, replacing");
                    store.verses[i] = record;
                }
                None => {
                    store.index.insert(record.verse_id.clone(), store.verses.len());
                    store.verses.push(record);
                }
            }
        }
        store
    }

    pub fn get(&self, verse_id: &str) -> Option<&VerseRecord> {
        self.index.get(verse_id).map(|&i| &self.verses[i])
    }

    pub fn list(&self, filter: &VerseFilter) -> Vec<&VerseRecord> {
        match filter {
            VerseFilter {
                verse_id: Some(id), ..
            } => self.get(id).into_iter().collect(),
            VerseFilter {
                chapter: Some(chapter),
                verse_number: Some(number),
                ..
            } => self
                .verses
                .iter()
                .filter(|v| v.chapter == *chapter && v.verse_number == *number)
                .collect(),
            VerseFilter {
                chapter: Some(chapter),
                ..
            } => self.verses.iter().filter(|v| v.chapter == *chapter).collect(),
            _ => self.verses.iter().collect(),
        }
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            total_verses: self.verses.len(),
            chapters: self.verses.iter().map(|v| v.chapter).collect::<BTreeSet<_>>().len(),
        }
    }

    pub fn verses(&self) -> &[VerseRecord] {
        &self.verses
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }
}

impl VerseStore for JsonVerseStore {
    fn resolve(&self, identity_key: &str) -> Result<Option<VerseRecord>, CollaboratorError> {
        Ok(self.get(identity_key).cloned())
    }
}
