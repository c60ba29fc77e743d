//! Scripted collaborators and a recording observer for tests.
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::collaborators::{CorpusSearch, SearchHit, TextGenerator, VerseStore};
use crate::data_model::{ProgressEvent, ProgressStep, VerseRecord};
use crate::error::CollaboratorError;
use crate::observer::ProgressObserver;

pub fn verse_record(verse_id: &str, chapter: u32, verse_number: u32, translation: &str) -> VerseRecord {
    VerseRecord {
        verse_id: verse_id.to_string(),
        chapter,
        verse_number,
        transliteration: Some(format!("transliteration of {}", verse_id)),
        word_meanings: Some(format!("word — meaning of {}", verse_id)),
        translation: Some(translation.to_string()),
        purport: Some(format!("purport of {}", verse_id)),
    }
}

/// Answers each prompt with the first rule whose needle it contains.
pub struct ScriptedGenerator {
    rules: Vec<(String, Result<String, CollaboratorError>)>,
    fallback: Result<String, CollaboratorError>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: Ok(fallback.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: Err(CollaboratorError::Generation(message.into())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn when(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Ok(response.into())));
        self
    }

    pub fn fail_when(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules
            .push((needle.into(), Err(CollaboratorError::Generation(message.into()))));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Returns fixed hits per question, or the default hits.
#[derive(Default)]
pub struct StaticSearch {
    default_hits: Vec<SearchHit>,
    by_question: HashMap<String, Vec<SearchHit>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl StaticSearch {
    pub fn new(default_hits: Vec<SearchHit>) -> Self {
        Self {
            default_hits,
            ..Self::default()
        }
    }

    pub fn for_question(mut self, question: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.by_question.insert(question.into(), hits);
        self
    }

    pub fn fail_on(mut self, question: impl Into<String>) -> Self {
        self.failing.insert(question.into());
        self
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl CorpusSearch for StaticSearch {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, CollaboratorError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((query.to_string(), limit));

        if self.failing.contains(query) {
            return Err(CollaboratorError::Search(format!("index unavailable for '{}'", query)));
        }

        let hits = self.by_question.get(query).unwrap_or(&self.default_hits);
        Ok(hits.iter().take(limit).cloned().collect())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    verses: HashMap<String, VerseRecord>,
    failing: HashSet<String>,
}

impl MemoryStore {
    pub fn new(records: Vec<VerseRecord>) -> Self {
        Self {
            verses: records.into_iter().map(|r| (r.verse_id.clone(), r)).collect(),
            failing: HashSet::new(),
        }
    }

    pub fn fail_on(mut self, key: impl Into<String>) -> Self {
        self.failing.insert(key.into());
        self
    }
}

impl VerseStore for MemoryStore {
    fn resolve(&self, identity_key: &str) -> Result<Option<VerseRecord>, CollaboratorError> {
        if self.failing.contains(identity_key) {
            return Err(CollaboratorError::Store(format!("corrupt row for '{}'", identity_key)));
        }
        Ok(self.verses.get(identity_key).cloned())
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ProgressEvent>>,
    logs: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn steps(&self) -> Vec<ProgressStep> {
        self.events().iter().map(|e| e.step).collect()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }

    fn on_log(&self, message: &str) {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
