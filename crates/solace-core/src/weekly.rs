//! Weekly aggregation over completed sessions, plus the generation-backed narrative.
//!
//! Reporting stays locked until sessions span at least three distinct calendar dates; a locked
//! profile only reports progress. Turn 1 (schedule collection) is excluded from every
//! per-turn statistic.

use crate::emotion::EmotionLabel;
use crate::prompts::{
    deep_profile_prompt, next_week_plan_prompt, DEEP_PROFILE_FALLBACK, NEXT_WEEK_PLAN_FALLBACK,
    PROFILE_SECTION_HEADERS,
};
use crate::session::{CompletedSessionRecord, EmotionScoreRecord, NOT_AVAILABLE};
use crate::traits::{GenerationHint, TextGenerator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Distinct session dates required before weekly reporting unlocks.
pub const UNLOCK_DAYS: usize = 3;

/// One row per completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummaryRow {
    pub date: String,
    /// `None` when the session has no turns beyond the schedule.
    pub dominant_emotion: Option<EmotionLabel>,
    pub triggers: String,
    pub happy_moments: String,
    pub suggestions: String,
}

/// Mood statistics for one calendar date (turns > 1 of every session on that date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMood {
    pub date: String,
    pub emotion_counts: BTreeMap<EmotionLabel, u32>,
    /// Share of turns whose dominant emotion is happiness, 0..=100.
    pub happiness_index: f64,
    /// Mean of each turn's highest score.
    pub average_surety: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyInsights {
    pub days_logged: usize,
    pub sessions: Vec<SessionSummaryRow>,
    pub daily: Vec<DailyMood>,
    pub repeated_stressors: Vec<String>,
    pub moments_of_joy: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WeeklyProfile {
    Locked { days_logged: usize },
    Unlocked(WeeklyInsights),
}

impl WeeklyProfile {
    pub fn days_logged(&self) -> usize {
        match self {
            WeeklyProfile::Locked { days_logged } => *days_logged,
            WeeklyProfile::Unlocked(insights) => insights.days_logged,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self, WeeklyProfile::Unlocked(_))
    }

    /// `n/3`, capped at the requirement.
    pub fn progress_label(&self) -> String {
        format!("{}/{}", self.days_logged().min(UNLOCK_DAYS), UNLOCK_DAYS)
    }

    pub fn days_remaining(&self) -> usize {
        UNLOCK_DAYS.saturating_sub(self.days_logged())
    }
}

fn dialog_turns(scores: &[EmotionScoreRecord]) -> impl Iterator<Item = &EmotionScoreRecord> {
    scores.iter().filter(|s| s.turn > 1)
}

/// Most frequent per-turn emotion over turns > 1. Ties go to the earlier label in the fixed order.
pub fn dominant_emotion(record: &CompletedSessionRecord) -> Option<EmotionLabel> {
    let mut counts = [0u32; 7];
    for score in dialog_turns(&record.emotion_scores) {
        counts[score.emotion as usize] += 1;
    }
    let mut best: Option<(EmotionLabel, u32)> = None;
    for label in EmotionLabel::ALL {
        let n = counts[label as usize];
        if n > 0 && best.map_or(true, |(_, top)| n > top) {
            best = Some((label, n));
        }
    }
    best.map(|(label, _)| label)
}

fn is_meaningful(text: &str) -> bool {
    let t = text.trim();
    !t.is_empty() && t != NOT_AVAILABLE
}

/// Reduces completed sessions (chronological) into a weekly profile.
pub fn aggregate(sessions: &[CompletedSessionRecord]) -> WeeklyProfile {
    let dates: BTreeSet<&str> = sessions.iter().map(|s| s.date.as_str()).collect();
    let days_logged = dates.len();
    if days_logged < UNLOCK_DAYS {
        tracing::debug!(target: "solace::weekly", days_logged, "weekly profile locked");
        return WeeklyProfile::Locked { days_logged };
    }

    let rows: Vec<SessionSummaryRow> = sessions
        .iter()
        .map(|s| SessionSummaryRow {
            date: s.date.clone(),
            dominant_emotion: dominant_emotion(s),
            triggers: s.insights.triggers.clone(),
            happy_moments: s.insights.happy_moments.clone(),
            suggestions: s.insights.suggestions.clone(),
        })
        .collect();

    let repeated_stressors = sessions
        .iter()
        .map(|s| s.insights.triggers.trim())
        .filter(|t| is_meaningful(t))
        .map(str::to_string)
        .collect();
    let moments_of_joy = sessions
        .iter()
        .map(|s| s.insights.happy_moments.trim())
        .filter(|t| is_meaningful(t))
        .map(str::to_string)
        .collect();

    tracing::info!(target: "solace::weekly", days_logged, sessions = sessions.len(), "weekly profile unlocked");

    WeeklyProfile::Unlocked(WeeklyInsights {
        days_logged,
        sessions: rows,
        daily: daily_moods(sessions),
        repeated_stressors,
        moments_of_joy,
    })
}

fn daily_moods(sessions: &[CompletedSessionRecord]) -> Vec<DailyMood> {
    let mut by_date: BTreeMap<&str, Vec<&EmotionScoreRecord>> = BTreeMap::new();
    for s in sessions {
        by_date
            .entry(s.date.as_str())
            .or_default()
            .extend(dialog_turns(&s.emotion_scores));
    }

    by_date
        .into_iter()
        .map(|(date, turns)| {
            let mut emotion_counts = BTreeMap::new();
            for t in &turns {
                *emotion_counts.entry(t.emotion).or_insert(0u32) += 1;
            }
            let (happiness_index, average_surety) = if turns.is_empty() {
                (0.0, 0.0)
            } else {
                let n = turns.len() as f64;
                let happy = turns.iter().filter(|t| t.emotion == EmotionLabel::Happiness).count() as f64;
                let surety = turns.iter().map(|t| t.scores.max_score()).sum::<f64>();
                (happy / n * 100.0, surety / n)
            };
            DailyMood {
                date: date.to_string(),
                emotion_counts,
                happiness_index,
                average_surety,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Narrative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSection {
    /// One of the fixed profile headers, or empty for text before the first header.
    pub header: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyNarrative {
    pub profile: String,
    pub sections: Vec<ProfileSection>,
    pub plan: String,
}

fn as_header(line: &str) -> Option<&'static str> {
    let cleaned = line
        .trim()
        .trim_matches(|c: char| c == '*' || c == '#' || c == ':' || c.is_whitespace())
        .to_uppercase();
    PROFILE_SECTION_HEADERS.iter().copied().find(|h| *h == cleaned)
}

/// Splits profile text into `(header, body)` sections on lines that are exactly a known header.
pub fn parse_profile_sections(text: &str) -> Vec<ProfileSection> {
    let mut sections: Vec<ProfileSection> = Vec::new();
    for line in text.lines() {
        let stripped = line.trim();
        if let Some(header) = as_header(stripped) {
            sections.push(ProfileSection {
                header: header.to_string(),
                body: String::new(),
            });
        } else if !stripped.is_empty() {
            if sections.is_empty() {
                sections.push(ProfileSection {
                    header: String::new(),
                    body: String::new(),
                });
            }
            if let Some(current) = sections.last_mut() {
                if !current.body.is_empty() {
                    current.body.push('\n');
                }
                current.body.push_str(stripped);
            }
        }
    }
    sections
}

fn session_line(row: &SessionSummaryRow) -> String {
    format!(
        "Date: {} | Dominant: {} | Triggers: {} | Happy: {}",
        row.date,
        row.dominant_emotion.map(|e| e.as_str()).unwrap_or(NOT_AVAILABLE),
        row.triggers,
        row.happy_moments
    )
}

/// Generation-backed weekly narrative. Only meaningful for unlocked profiles.
pub struct WeeklyNarrator {
    generator: Arc<dyn TextGenerator>,
}

impl WeeklyNarrator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn deep_profile(&self, insights: &WeeklyInsights) -> String {
        let lines: Vec<String> = insights.sessions.iter().map(session_line).collect();
        match self
            .generator
            .generate(&deep_profile_prompt(&lines), GenerationHint::Text)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(target: "solace::weekly", error = %e, "deep profile generation failed; using fallback");
                DEEP_PROFILE_FALLBACK.to_string()
            }
        }
    }

    pub async fn next_week_plan(&self, insights: &WeeklyInsights) -> String {
        let prompt = next_week_plan_prompt(&insights.repeated_stressors, &insights.moments_of_joy);
        match self.generator.generate(&prompt, GenerationHint::Text).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(target: "solace::weekly", error = %e, "plan generation failed; using fallback");
                NEXT_WEEK_PLAN_FALLBACK.to_string()
            }
        }
    }

    pub async fn narrate(&self, insights: &WeeklyInsights) -> WeeklyNarrative {
        let profile = self.deep_profile(insights).await;
        let plan = self.next_week_plan(insights).await;
        WeeklyNarrative {
            sections: parse_profile_sections(&profile),
            profile,
            plan,
        }
    }
}
