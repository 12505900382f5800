//! Completed-session record: the persisted shape read by history and weekly reporting.

use super::state::{EmotionScoreRecord, SessionState, TurnPhase, TurnRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder insight value that reporting treats as empty.
pub const NOT_AVAILABLE: &str = "N/A";

/// Structured extraction produced at finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInsights {
    #[serde(default)]
    pub triggers: String,
    #[serde(default)]
    pub happy_moments: String,
    #[serde(default)]
    pub suggestions: String,
}

impl SessionInsights {
    /// Generic text used when extraction fails or returns something unparseable.
    pub fn fallback() -> Self {
        Self {
            triggers: "Specific stress patterns were too complex to categorize this session.".to_string(),
            happy_moments: "User mentioned personal highlights that are being processed.".to_string(),
            suggestions: "Review your session notes and focus on maintaining your evening routine.".to_string(),
        }
    }
}

/// Immutable record written once per phase termination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSessionRecord {
    /// `YYYYMMDD_HHMMSS`, used for ordering within a day.
    pub timestamp: String,
    /// Calendar date `YYYY-MM-DD`; weekly unlocking counts distinct values.
    pub date: String,
    pub session_id: String,
    pub username: String,
    pub schedule: String,
    pub turns: Vec<TurnRecord>,
    pub emotion_scores: Vec<EmotionScoreRecord>,
    pub insights: SessionInsights,
    /// Reply of the terminal turn.
    pub closing_text: String,
    /// Phase whose termination produced this record.
    #[serde(default)]
    pub phase: TurnPhase,
}

impl CompletedSessionRecord {
    pub fn from_session(
        session: &SessionState,
        username: &str,
        insights: SessionInsights,
        phase: TurnPhase,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp: at.format("%Y%m%d_%H%M%S").to_string(),
            date: at.format("%Y-%m-%d").to_string(),
            session_id: session.session_id.clone(),
            username: username.to_string(),
            schedule: session.schedule.clone(),
            turns: session.turns.clone(),
            emotion_scores: session.emotion_scores.clone(),
            insights,
            closing_text: session.closing_text(),
            phase,
        }
    }
}
