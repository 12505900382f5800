//! Integration test: completed sessions persisted to sled feed the weekly profile.
//!
//! ## Scenario
//! 1. Finalize sessions on two dates: the profile stays locked at 2/3.
//! 2. Add a third date: the profile unlocks with per-session rows and highlights.
//! 3. Narrate the unlocked profile with a scripted model, then with a failing one.

mod common;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use common::ScriptedGenerator;
use solace_core::prompts::{DEEP_PROFILE_FALLBACK, NEXT_WEEK_PLAN_FALLBACK};
use solace_core::session::SessionInsights;
use solace_core::{
    aggregate, CheckinResult, EmotionDistribution, EmotionLabel, EmotionScoreRecord, GenerationHint,
    SessionArchive, SessionFinalizer, SessionState, SledSessionArchive, TextGenerator, TurnPhase, TurnRecord,
    WeeklyNarrator, WeeklyProfile,
};
use std::sync::Arc;

struct NarratorModel;

#[async_trait]
impl TextGenerator for NarratorModel {
    async fn generate(&self, prompt: &str, _hint: GenerationHint) -> CheckinResult<String> {
        if prompt.contains("senior clinical psychologist") {
            return Ok("OVERALL EMOTIONAL STATE\nMostly upbeat.\nPERSONALIZED RECOMMENDATIONS\nKeep running.".to_string());
        }
        if prompt.contains("wellness coach") {
            return Ok("Plan: protect your evening runs.".to_string());
        }
        if prompt.contains("Clinical Data Analyst") {
            return Ok(r#"{"triggers": "deadline", "happy_moments": "evening run", "suggestions": "sleep by 11"}"#.to_string());
        }
        Ok(String::new())
    }
}

fn finished_session(id: &str, emotion: EmotionLabel) -> SessionState {
    let mut s = SessionState::new(id);
    s.schedule = "work and a run".to_string();
    s.emotion_scores.push(EmotionScoreRecord::schedule_placeholder());
    s.turns.push(TurnRecord {
        turn: 1,
        user: "work and a run".to_string(),
        reply: "Nice plan.".to_string(),
        emotion: EmotionLabel::Neutral,
    });
    for turn in 2..=4 {
        s.emotion_scores.push(EmotionScoreRecord {
            turn,
            scores: EmotionDistribution::zeros().with(emotion, 0.7),
            emotion,
        });
        s.turns.push(TurnRecord {
            turn,
            user: format!("answer {turn}"),
            reply: "Tell me more.".to_string(),
            emotion,
        });
    }
    s.primary_turns = 11;
    s
}

#[tokio::test]
async fn weekly_profile_unlocks_on_third_distinct_date() {
    let dir = tempfile::tempdir().unwrap();
    let archive: Arc<SledSessionArchive> = Arc::new(SledSessionArchive::open_path(dir.path()).unwrap());
    let finalizer = SessionFinalizer::new(Arc::new(NarratorModel), Some(archive.clone()));

    let day = |d: u32, h: u32| Utc.with_ymd_and_hms(2026, 10, d, h, 0, 0).unwrap();

    finalizer
        .finalize_at(&finished_session("a", EmotionLabel::Happiness), "ana", TurnPhase::Primary, day(5, 20))
        .await;
    finalizer
        .finalize_at(&finished_session("b", EmotionLabel::Sadness), "ana", TurnPhase::Primary, day(5, 22))
        .await;
    finalizer
        .finalize_at(&finished_session("c", EmotionLabel::Fear), "ana", TurnPhase::Primary, day(6, 21))
        .await;

    let records = archive.load_all("ana").unwrap();
    assert_eq!(records.len(), 3);
    let profile = aggregate(&records);
    assert!(!profile.is_unlocked());
    assert_eq!(profile.progress_label(), "2/3");

    finalizer
        .finalize_at(&finished_session("d", EmotionLabel::Happiness), "ana", TurnPhase::Primary, day(8, 19))
        .await;

    assert_eq!(archive.list_dates("ana").unwrap(), vec!["2026-10-08", "2026-10-06", "2026-10-05"]);
    assert_eq!(archive.load_for_date("ana", "2026-10-05").unwrap().unwrap().session_id, "b");

    let records = archive.load_all("ana").unwrap();
    let WeeklyProfile::Unlocked(insights) = aggregate(&records) else {
        panic!("expected unlocked profile");
    };
    assert_eq!(insights.days_logged, 3);
    assert_eq!(insights.sessions.len(), 4);
    assert_eq!(insights.sessions[2].dominant_emotion, Some(EmotionLabel::Fear));
    assert_eq!(insights.repeated_stressors.len(), 4);
    assert_eq!(insights.moments_of_joy[0], "evening run");
    assert_eq!(insights.daily.len(), 3);
    assert!((insights.daily[0].happiness_index - 50.0).abs() < 1e-9);

    let narrative = WeeklyNarrator::new(Arc::new(NarratorModel)).narrate(&insights).await;
    assert_eq!(narrative.sections.len(), 2);
    assert_eq!(narrative.sections[0].header, "OVERALL EMOTIONAL STATE");
    assert_eq!(narrative.sections[1].body, "Keep running.");
    assert_eq!(narrative.plan, "Plan: protect your evening runs.");

    let fallback = WeeklyNarrator::new(Arc::new(ScriptedGenerator::failing())).narrate(&insights).await;
    assert_eq!(fallback.profile, DEEP_PROFILE_FALLBACK);
    assert_eq!(fallback.plan, NEXT_WEEK_PLAN_FALLBACK);
}

#[tokio::test]
async fn unparseable_summary_persists_fallback_insights() {
    let dir = tempfile::tempdir().unwrap();
    let archive = Arc::new(SledSessionArchive::open_path(dir.path()).unwrap());

    // Prose around a JSON object still parses.
    let finalizer = SessionFinalizer::new(Arc::new(ScriptedGenerator::new()), Some(archive.clone()));
    let record = finalizer
        .finalize(&finished_session("z", EmotionLabel::Anger), "bo", TurnPhase::Primary)
        .await;
    assert_eq!(record.insights.triggers, "late meeting");

    // Prose with no JSON object at all.
    let prose = SessionFinalizer::new(
        Arc::new(ScriptedGenerator::with_summary("A calm day overall; nothing stood out as stressful.")),
        Some(archive.clone()),
    );
    let record = prose
        .finalize(&finished_session("x", EmotionLabel::Anger), "bo", TurnPhase::Primary)
        .await;
    assert_eq!(record.insights, SessionInsights::fallback());

    // Truncated JSON.
    let truncated = SessionFinalizer::new(
        Arc::new(ScriptedGenerator::with_summary(r#"{"triggers": "late meeting", "happy_"#)),
        Some(archive.clone()),
    );
    let record = truncated
        .finalize(&finished_session("w", EmotionLabel::Anger), "bo", TurnPhase::Primary)
        .await;
    assert_eq!(record.insights, SessionInsights::fallback());

    let stored = archive.load_all("bo").unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().filter(|r| r.session_id != "z").all(|r| r.insights == SessionInsights::fallback()));
}

#[tokio::test]
async fn failed_summary_generation_persists_fallback_insights() {
    let dir = tempfile::tempdir().unwrap();
    let archive = Arc::new(SledSessionArchive::open_path(dir.path()).unwrap());
    let failing = SessionFinalizer::new(Arc::new(ScriptedGenerator::failing()), Some(archive.clone()));
    let record = failing
        .finalize(&finished_session("y", EmotionLabel::Anger), "bo", TurnPhase::Primary)
        .await;
    assert_eq!(record.insights, SessionInsights::fallback());
    assert_eq!(archive.load_all("bo").unwrap().len(), 1);
}
