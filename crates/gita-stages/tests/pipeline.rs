//! End-to-end runs of the research pipeline over scripted collaborators.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use gita_core::testutil::{verse_record, MemoryStore, RecordingObserver, ScriptedGenerator, StaticSearch};
use gita_core::{
    spawn_streaming_run, ExecutionContext, NoopObserver, ProgressStep, Query, ResearchResponse,
    ResearchServices, SearchHit, WireEvent,
};
use gita_stages::{research_pipeline, EXERCISES_PLACEHOLDER};

const SYNTHESIS: &str = "## A. ANALYSIS\n\
As stated in **BG 2.47**, you have a right to your duty.\n\n\
## B. PRACTICAL GUIDANCE\n\
Focus on the work, not the outcome (**BG 6.35**).\n\n\
## C. SPIRITUAL EXERCISES\n\
### Exercise 1: Steady breathing\n\
Practice daily, based on **BG 6.35**.\n";

fn services(hits: Vec<SearchHit>, generator: ScriptedGenerator) -> ResearchServices {
    ResearchServices::new(
        Arc::new(StaticSearch::new(hits)),
        Arc::new(MemoryStore::new(vec![
            verse_record("BG 2.47", 2, 47, "You have a right to perform your prescribed duty"),
            verse_record("BG 6.35", 6, 35, "The mind is restless, but it can be controlled"),
            verse_record("BG 16.1", 16, 1, "Fearlessness, purification of one's existence"),
        ])),
        Arc::new(generator),
    )
}

fn scripted() -> ScriptedGenerator {
    ScriptedGenerator::new("")
        .when("structured analysis", "CORE_ISSUE: Stress at work\nKEY_THEMES: stress, duty")
        .when(
            "research questions",
            "What does the Gita say about stress?\nHow can the restless mind be controlled?",
        )
        .when("STRICT INSTRUCTIONS", SYNTHESIS)
}

fn stress_hits() -> Vec<SearchHit> {
    vec![
        SearchHit::new("BG 2.47", 0.92),
        SearchHit::new("BG 6.35", 0.88),
        SearchHit::new("BG 16.1", 0.71),
    ]
}

#[test]
fn test_stress_question_end_to_end() {
    let runner = research_pipeline(&services(stress_hits(), scripted()));
    let recorder = Arc::new(RecordingObserver::default());
    let ctx = ExecutionContext::new().with_observer(recorder.clone());

    let outcome = runner.run(&Query::new("How to deal with stress?"), &ctx).unwrap();
    let response = ResearchResponse::from_state(&outcome.state);

    assert_eq!(runner.pipeline_id(), "analyze→retrieve→synthesize→finalize");
    assert_eq!(response.verses.len(), 3);
    assert!(!response.analysis.is_empty());
    assert!(!response.guidance.is_empty());
    assert!(!response.exercises.is_empty());
    assert!(response.answer.contains("BG 2.47"));
    assert_eq!(response.query, "How to deal with stress?");
    assert_eq!(outcome.reports.len(), 4);

    assert_eq!(
        recorder.steps(),
        vec![
            ProgressStep::Analyzing,
            ProgressStep::QuestionsGenerated,
            ProgressStep::Researching,
            ProgressStep::SearchingVerse,
            ProgressStep::SearchingVerse,
            ProgressStep::VersesFound,
            ProgressStep::Synthesizing,
            ProgressStep::Finalizing,
        ]
    );
}

#[test]
fn test_zero_results_still_produce_an_answer() {
    let generator = ScriptedGenerator::new("")
        .when("structured analysis", "CORE_ISSUE: unknown")
        .when("research questions", "Anything?")
        .when("STRICT INSTRUCTIONS", "The verses provided do not cover this.");
    let runner = research_pipeline(&services(vec![], generator));

    let outcome = runner.run(&Query::new("Something obscure"), &ExecutionContext::new()).unwrap();

    assert!(outcome.state.relevant_verses.is_empty());
    assert_eq!(outcome.state.analysis, "The verses provided do not cover this.");
    assert_eq!(outcome.state.exercises, EXERCISES_PLACEHOLDER);
    assert!(outcome.state.final_answer.contains("**All Referenced Verses:**"));
}

#[test]
fn test_final_answer_is_deterministic() {
    let run = || {
        research_pipeline(&services(stress_hits(), scripted()))
            .run(&Query::new("How to deal with stress?"), &ExecutionContext::new())
            .unwrap()
    };

    let first = run();
    let second = run();

    assert_eq!(first.state.final_answer, second.state.final_answer);
    let hashes = |o: &gita_core::RunOutcome| {
        o.reports.iter().map(|r| r.out_hash.clone()).collect::<Vec<_>>()
    };
    assert_eq!(hashes(&first), hashes(&second));
}

#[test]
fn test_synthesis_failure_stops_before_finalize() {
    let generator = ScriptedGenerator::new("")
        .fail_when("STRICT INSTRUCTIONS", "model overloaded")
        .when("structured analysis", "CORE_ISSUE: Stress at work")
        .when("research questions", "What does the Gita say about stress?");
    let runner = research_pipeline(&services(stress_hits(), generator));

    let err = runner
        .run(&Query::new("How to deal with stress?"), &ExecutionContext::new())
        .unwrap_err();

    assert!(err.to_string().starts_with("synthesize.guidance.v1"));
}

async fn collect_events(services: ResearchServices, query: &str) -> Vec<WireEvent> {
    let runner = Arc::new(research_pipeline(&services));
    spawn_streaming_run(runner, Query::new(query), Arc::new(NoopObserver))
        .with_poll_interval(Duration::from_millis(20))
        .into_stream()
        .filter(|e| futures::future::ready(!matches!(e, WireEvent::Heartbeat)))
        .collect()
        .await
}

fn steps(events: &[WireEvent]) -> Vec<ProgressStep> {
    events
        .iter()
        .filter_map(|e| match e {
            WireEvent::Data(event) => Some(event.step),
            WireEvent::Heartbeat => None,
        })
        .collect()
}

#[tokio::test]
async fn test_streamed_run_ends_with_single_completed() {
    let events = collect_events(services(stress_hits(), scripted()), "How to deal with stress?").await;
    let steps = steps(&events);

    assert_eq!(steps.first(), Some(&ProgressStep::Connected));
    assert_eq!(steps.last(), Some(&ProgressStep::Completed));
    assert_eq!(steps.iter().filter(|s| s.is_terminal()).count(), 1);

    let Some(WireEvent::Data(completed)) = events.last() else {
        panic!("expected a data event");
    };
    let verses = completed.details["verses"].as_array().unwrap();
    assert_eq!(verses.len(), 3);
    assert!(completed.details["answer"].as_str().unwrap().contains("BG 2.47"));
}

#[tokio::test]
async fn test_streamed_failure_ends_with_single_error() {
    let generator = ScriptedGenerator::failing("invalid api key");
    let events = collect_events(services(stress_hits(), generator), "How to deal with stress?").await;
    let steps = steps(&events);

    assert_eq!(steps.last(), Some(&ProgressStep::Error));
    assert_eq!(steps.iter().filter(|s| s.is_terminal()).count(), 1);
    assert!(!steps.contains(&ProgressStep::Completed));
}
