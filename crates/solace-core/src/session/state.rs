//! Per-session mutable state and the turn counters that drive the state machine.

use crate::emotion::{EmotionDistribution, EmotionLabel};
use serde::{Deserialize, Serialize};

/// Terminal counter value of the primary phase (schedule turn + ten dialog turns).
pub const PRIMARY_TURN_LIMIT: u32 = 11;
/// Terminal counter value of the extension phase.
pub const EXTENSION_TURN_LIMIT: u32 = 5;
/// Counter value up to which the dialog asks about positives; later turns ask about a challenge.
pub const POSITIVE_PHASE_LAST_TURN: u32 = 6;
/// How many previous turns are handed to context resolution.
pub const RESOLUTION_HISTORY_TURNS: usize = 2;

/// Which counter a request advances. Supplied by the caller on every turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnPhase {
    #[default]
    Primary,
    Extension,
}

impl TurnPhase {
    pub fn from_extension_flag(is_extension: bool) -> Self {
        if is_extension {
            TurnPhase::Extension
        } else {
            TurnPhase::Primary
        }
    }

    pub fn limit(&self) -> u32 {
        match self {
            TurnPhase::Primary => PRIMARY_TURN_LIMIT,
            TurnPhase::Extension => EXTENSION_TURN_LIMIT,
        }
    }
}

/// Coarse state of the primary conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    /// Turn 1: the next utterance is stored as the day's schedule.
    AwaitingSchedule,
    /// Turns 2..=11.
    InDialog,
    /// Further primary turns are rejected.
    Concluded,
}

/// One exchange. Appended once per processed turn, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: u32,
    /// Resolved user utterance (raw text on turn 1 or when resolution failed).
    pub user: String,
    pub reply: String,
    pub emotion: EmotionLabel,
}

/// Full fused distribution for one turn, parallel to [`TurnRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScoreRecord {
    pub turn: u32,
    pub scores: EmotionDistribution,
    pub emotion: EmotionLabel,
}

impl EmotionScoreRecord {
    /// Turn-one placeholder: all-zero scores, neutral.
    pub fn schedule_placeholder() -> Self {
        Self {
            turn: 1,
            scores: EmotionDistribution::zeros(),
            emotion: EmotionLabel::Neutral,
        }
    }
}

/// Mutable state owned by the session store and mutated only by the turn orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub turns: Vec<TurnRecord>,
    pub emotion_scores: Vec<EmotionScoreRecord>,
    /// Starts at 1; the schedule turn moves it to 2.
    pub primary_turns: u32,
    /// Starts at 0.
    pub extension_turns: u32,
    pub schedule: String,
    /// Phase of the most recent processed turn.
    pub phase: TurnPhase,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            turns: Vec::new(),
            emotion_scores: Vec::new(),
            primary_turns: 1,
            extension_turns: 0,
            schedule: String::new(),
            phase: TurnPhase::Primary,
        }
    }

    pub fn counter(&self, phase: TurnPhase) -> u32 {
        match phase {
            TurnPhase::Primary => self.primary_turns,
            TurnPhase::Extension => self.extension_turns,
        }
    }

    /// True when a request for `phase` must be answered with "concluded" and no mutation.
    /// Primary rejects once the counter exceeds 11; extension once it reaches 5.
    pub fn is_past_limit(&self, phase: TurnPhase) -> bool {
        match phase {
            TurnPhase::Primary => self.primary_turns > PRIMARY_TURN_LIMIT,
            TurnPhase::Extension => self.extension_turns >= EXTENSION_TURN_LIMIT,
        }
    }

    pub fn stage(&self) -> SessionStage {
        if self.primary_turns > PRIMARY_TURN_LIMIT {
            SessionStage::Concluded
        } else if self.primary_turns == 1 {
            SessionStage::AwaitingSchedule
        } else {
            SessionStage::InDialog
        }
    }

    /// Advances the counter for `phase` and returns the new value.
    pub fn advance(&mut self, phase: TurnPhase) -> u32 {
        self.phase = phase;
        match phase {
            TurnPhase::Primary => {
                self.primary_turns += 1;
                self.primary_turns
            }
            TurnPhase::Extension => {
                self.extension_turns += 1;
                self.extension_turns
            }
        }
    }

    /// Index recorded on the next emotion score: the primary counter before advancing,
    /// continued past it during the extension phase.
    pub fn next_score_turn(&self, phase: TurnPhase) -> u32 {
        match phase {
            TurnPhase::Primary => self.primary_turns,
            TurnPhase::Extension => self.primary_turns + self.extension_turns,
        }
    }

    /// Last `n` exchanges, oldest first.
    pub fn recent_turns(&self, n: usize) -> &[TurnRecord] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Reply of the final exchange (the closing summary once a phase has ended).
    pub fn closing_text(&self) -> String {
        self.turns.last().map(|t| t.reply.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_awaits_schedule() {
        let s = SessionState::new("abc");
        assert_eq!(s.primary_turns, 1);
        assert_eq!(s.extension_turns, 0);
        assert_eq!(s.stage(), SessionStage::AwaitingSchedule);
        assert!(!s.is_past_limit(TurnPhase::Primary));
        assert!(!s.is_past_limit(TurnPhase::Extension));
    }

    #[test]
    fn limits_follow_phase_rules() {
        let mut s = SessionState::new("abc");
        s.primary_turns = 11;
        assert!(!s.is_past_limit(TurnPhase::Primary));
        s.primary_turns = 12;
        assert!(s.is_past_limit(TurnPhase::Primary));
        assert_eq!(s.stage(), SessionStage::Concluded);

        s.extension_turns = 4;
        assert!(!s.is_past_limit(TurnPhase::Extension));
        s.extension_turns = 5;
        assert!(s.is_past_limit(TurnPhase::Extension));
    }

    #[test]
    fn advance_moves_only_the_active_counter() {
        let mut s = SessionState::new("abc");
        assert_eq!(s.advance(TurnPhase::Primary), 2);
        assert_eq!(s.advance(TurnPhase::Extension), 1);
        assert_eq!(s.primary_turns, 2);
        assert_eq!(s.extension_turns, 1);
        assert_eq!(s.phase, TurnPhase::Extension);
    }

    #[test]
    fn recent_turns_is_bounded() {
        let mut s = SessionState::new("abc");
        assert!(s.recent_turns(2).is_empty());
        for i in 1..=3 {
            s.turns.push(TurnRecord {
                turn: i,
                user: format!("u{i}"),
                reply: format!("b{i}"),
                emotion: EmotionLabel::Neutral,
            });
        }
        let recent = s.recent_turns(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].user, "u2");
        assert_eq!(s.closing_text(), "b3");
    }
}
