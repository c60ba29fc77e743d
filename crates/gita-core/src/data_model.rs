//! Data Model: Query, PipelineState, VerseReference, ProgressEvent
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::TOP_VERSES;

/// Immutable input to one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default)]
    pub context: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A verse as held by the persisted store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerseRecord {
    /// Unique corpus key (ex: "BG 2.47")
    pub verse_id: String,
    pub chapter: u32,
    pub verse_number: u32,
    #[serde(default)]
    pub transliteration: Option<String>,
    #[serde(default)]
    pub word_meanings: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub purport: Option<String>,
}

/// A resolved verse plus the research question that surfaced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerseReference {
    #[serde(flatten)]
    pub verse: VerseRecord,
    pub relevance_score: f32,
    pub source_question: String,
}

impl VerseReference {
    pub fn new(verse: VerseRecord, relevance_score: f32, source_question: impl Into<String>) -> Self {
        Self {
            verse,
            relevance_score,
            source_question: source_question.into(),
        }
    }

    pub fn verse_id(&self) -> &str {
        &self.verse.verse_id
    }
}

/// Accumulated state of one run. Owned by the run, never shared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub user_query: String,
    pub problem_context: String,
    pub research_questions: Vec<String>,
    /// Unique by `verse_id`, first occurrence wins.
    pub relevant_verses: Vec<VerseReference>,
    pub analysis: String,
    pub guidance: String,
    pub exercises: String,
    pub final_answer: String,
}

impl PipelineState {
    pub fn from_query(query: &Query) -> Self {
        Self {
            user_query: query.text.clone(),
            problem_context: query.context.clone().unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Merge a stage's partial update. Fields left as `None` are untouched.
    pub fn apply(&mut self, update: StateUpdate) {
        let StateUpdate {
            problem_context,
            research_questions,
            relevant_verses,
            analysis,
            guidance,
            exercises,
            final_answer,
        } = update;

        if let Some(v) = problem_context {
            self.problem_context = v;
        }
        if let Some(v) = research_questions {
            self.research_questions = v;
        }
        if let Some(v) = relevant_verses {
            self.relevant_verses = v;
        }
        if let Some(v) = analysis {
            self.analysis = v;
        }
        if let Some(v) = guidance {
            self.guidance = v;
        }
        if let Some(v) = exercises {
            self.exercises = v;
        }
        if let Some(v) = final_answer {
            self.final_answer = v;
        }
    }

    pub fn top_verses(&self) -> &[VerseReference] {
        let n = self.relevant_verses.len().min(TOP_VERSES);
        &self.relevant_verses[..n]
    }
}

/// Partial update returned by a stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub problem_context: Option<String>,
    pub research_questions: Option<Vec<String>>,
    pub relevant_verses: Option<Vec<VerseReference>>,
    pub analysis: Option<String>,
    pub guidance: Option<String>,
    pub exercises: Option<String>,
    pub final_answer: Option<String>,
}

/// Result payload shared by the blocking endpoint and the `completed` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub answer: String,
    pub analysis: String,
    pub guidance: String,
    pub exercises: String,
    pub verses: Vec<VerseReference>,
    pub query: String,
}

impl ResearchResponse {
    pub fn from_state(state: &PipelineState) -> Self {
        Self {
            answer: state.final_answer.clone(),
            analysis: state.analysis.clone(),
            guidance: state.guidance.clone(),
            exercises: state.exercises.clone(),
            verses: state.top_verses().to_vec(),
            query: state.user_query.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStep {
    /// Wire-only acknowledgement sent before any pipeline event.
    Connected,
    Analyzing,
    QuestionsGenerated,
    Researching,
    SearchingVerse,
    VersesFound,
    Synthesizing,
    Finalizing,
    Completed,
    Error,
}

impl ProgressStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Analyzing => "analyzing",
            Self::QuestionsGenerated => "questions_generated",
            Self::Researching => "researching",
            Self::SearchingVerse => "searching_verse",
            Self::VersesFound => "verses_found",
            Self::Synthesizing => "synthesizing",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// A unit of observability emitted during a run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub step: ProgressStep,
    pub message: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl ProgressEvent {
    pub fn new(step: ProgressStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn connected() -> Self {
        Self::new(ProgressStep::Connected, "Connected, starting research...")
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ProgressStep::Error, message)
    }

    pub fn completed(response: &ResearchResponse) -> Self {
        let details = match serde_json::to_value(response) {
            Ok(Value::Object(map)) => map,
            _ => {
                tracing::warn!("research response did not serialize to an object");
                Map::new()
            }
        };
        Self {
            step: ProgressStep::Completed,
            message: "Research complete!".to_string(),
            details,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.step.is_terminal()
    }
}
