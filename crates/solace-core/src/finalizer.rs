//! Session finalization: structured insight extraction plus the completed-session record.
//!
//! Model output is free-form; the first `{...}` span is parsed as JSON. Any generation or
//! parse failure yields [`SessionInsights::fallback`]. Persistence failures are logged and
//! never change the returned record.

use crate::prompts::clinical_summary_prompt;
use crate::session::{CompletedSessionRecord, SessionInsights, SessionState, TurnPhase};
use crate::traits::{GenerationHint, SessionArchive, TextGenerator};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

static JSON_OBJECT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").ok());

#[derive(Deserialize)]
struct InsightsBody {
    triggers: Option<serde_json::Value>,
    happy_moments: Option<serde_json::Value>,
    suggestions: Option<serde_json::Value>,
}

fn field_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Extracts insights from raw model output. `None` when no JSON object can be recovered.
/// Fields absent from an otherwise valid object fall back individually.
pub fn parse_insights(raw: &str) -> Option<SessionInsights> {
    let candidate = JSON_OBJECT
        .as_ref()
        .and_then(|re| re.find(raw))
        .map(|m| m.as_str())
        .unwrap_or(raw);
    let body: InsightsBody = serde_json::from_str(candidate).ok()?;
    let fallback = SessionInsights::fallback();
    Some(SessionInsights {
        triggers: field_text(body.triggers).unwrap_or(fallback.triggers),
        happy_moments: field_text(body.happy_moments).unwrap_or(fallback.happy_moments),
        suggestions: field_text(body.suggestions).unwrap_or(fallback.suggestions),
    })
}

pub struct SessionFinalizer {
    generator: Arc<dyn TextGenerator>,
    archive: Option<Arc<dyn SessionArchive>>,
}

impl SessionFinalizer {
    pub fn new(generator: Arc<dyn TextGenerator>, archive: Option<Arc<dyn SessionArchive>>) -> Self {
        Self { generator, archive }
    }

    /// Requests the extraction for the whole transcript and schedule.
    pub async fn extract_insights(&self, session: &SessionState) -> SessionInsights {
        let prompt = clinical_summary_prompt(&session.schedule, &session.turns);
        match self.generator.generate(&prompt, GenerationHint::Text).await {
            Ok(raw) => parse_insights(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    target: "solace::finalizer",
                    session_id = %session.session_id,
                    "summary output was not parseable JSON; using fallback insights"
                );
                SessionInsights::fallback()
            }),
            Err(e) => {
                tracing::warn!(
                    target: "solace::finalizer",
                    session_id = %session.session_id,
                    error = %e,
                    "summary generation failed; using fallback insights"
                );
                SessionInsights::fallback()
            }
        }
    }

    /// Builds and persists the record for a terminated phase. Invoked once per phase termination.
    pub async fn finalize(&self, session: &SessionState, username: &str, phase: TurnPhase) -> CompletedSessionRecord {
        self.finalize_at(session, username, phase, Utc::now()).await
    }

    pub async fn finalize_at(
        &self,
        session: &SessionState,
        username: &str,
        phase: TurnPhase,
        at: DateTime<Utc>,
    ) -> CompletedSessionRecord {
        let insights = self.extract_insights(session).await;
        let record = CompletedSessionRecord::from_session(session, username, insights, phase, at);

        match &self.archive {
            Some(archive) => {
                if let Err(e) = archive.save(&record) {
                    tracing::error!(
                        target: "solace::finalizer",
                        session_id = %record.session_id,
                        username = %record.username,
                        error = %e,
                        "failed to persist completed session"
                    );
                }
            }
            None => {
                tracing::warn!(
                    target: "solace::finalizer",
                    session_id = %record.session_id,
                    "no session archive configured; completed session not persisted"
                );
            }
        }

        tracing::info!(
            target: "solace::finalizer",
            session_id = %record.session_id,
            ?phase,
            turns = record.turns.len(),
            "session finalized"
        );
        record
    }
}
