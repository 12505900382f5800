//! Turn orchestrator: the per-session check-in state machine.
//!
//! A session starts by collecting the day's schedule (turn 1, no fusion), then runs dialog
//! turns 2..=11 in the primary phase. An optional extension phase keeps its own counter and
//! ends at 5. Each dialog turn resolves context, fuses the emotion signals, asks for the next
//! reply, and appends to the transcript. Reaching a terminal counter finalizes the session
//! before the turn returns.
//!
//! Signal-source failures never abort a turn: resolution falls back to the raw utterance with
//! uniform 0.1 scores, a missing or failing classifier contributes zeros, audio problems drop
//! back to text-only fusion, and reply generation falls back to fixed text.

use crate::emotion::{fuse_text_signals, fuse_with_audio, EmotionDistribution, EmotionLabel};
use crate::finalizer::SessionFinalizer;
use crate::prompts::{
    acknowledgment_prompt, dialog_reply_prompt, parse_resolution, resolution_prompt, DialogPrompt,
    PhaseInstruction, Resolution, ACKNOWLEDGMENT_FALLBACK, CLOSING_REPLY_FALLBACK, DIALOG_REPLY_FALLBACK,
};
use crate::session::{
    CompletedSessionRecord, EmotionScoreRecord, SessionStage, SessionState, SessionStore, TurnPhase, TurnRecord,
    RESOLUTION_HISTORY_TURNS,
};
use crate::traits::{
    AudioEmotionClassifier, AudioFeatureExtractor, GenerationHint, SessionArchive, TextEmotionClassifier,
    TextGenerator,
};
use serde::Serialize;
use std::sync::Arc;

/// Reply sent for requests past the active phase's limit.
pub const CONCLUDED_MESSAGE: &str = "Session is concluded.";

/// Caller identifier used when none is supplied.
pub const DEFAULT_USERNAME: &str = "Guest";

/// One incoming turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub session_id: String,
    pub text: Option<String>,
    pub audio: Option<Vec<u8>>,
    pub phase: TurnPhase,
    pub username: String,
}

impl TurnRequest {
    pub fn new(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            text: Some(text.into()),
            audio: None,
            phase: TurnPhase::Primary,
            username: DEFAULT_USERNAME.to_string(),
        }
    }

    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn in_phase(mut self, phase: TurnPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn for_user(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }
}

/// Result of a processed turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub reply: String,
    pub emotion: EmotionLabel,
    /// Counter of the active phase after this turn.
    pub current_turn: u32,
    pub is_final: bool,
    /// Every emotion score recorded so far, turn 1 placeholder included.
    pub analytics: Vec<EmotionScoreRecord>,
    /// Utterance after context resolution (raw text on turn 1).
    pub resolved_text: String,
    /// Record written when this turn terminated a phase.
    #[serde(skip)]
    pub completed: Option<CompletedSessionRecord>,
}

#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// Request arrived after the active phase ended; nothing was changed.
    Concluded { message: String },
    Reply(TurnReply),
}

impl TurnOutcome {
    pub fn is_concluded(&self) -> bool {
        matches!(self, TurnOutcome::Concluded { .. })
    }

    pub fn reply(&self) -> Option<&TurnReply> {
        match self {
            TurnOutcome::Reply(r) => Some(r),
            TurnOutcome::Concluded { .. } => None,
        }
    }
}

pub struct TurnOrchestrator {
    sessions: Arc<SessionStore>,
    generator: Arc<dyn TextGenerator>,
    text_classifier: Option<Arc<dyn TextEmotionClassifier>>,
    audio_extractor: Option<Arc<dyn AudioFeatureExtractor>>,
    audio_classifier: Option<Arc<dyn AudioEmotionClassifier>>,
    finalizer: SessionFinalizer,
}

impl TurnOrchestrator {
    pub fn new(sessions: Arc<SessionStore>, generator: Arc<dyn TextGenerator>) -> Self {
        let finalizer = SessionFinalizer::new(generator.clone(), None);
        Self {
            sessions,
            generator,
            text_classifier: None,
            audio_extractor: None,
            audio_classifier: None,
            finalizer,
        }
    }

    pub fn with_text_classifier(mut self, classifier: Arc<dyn TextEmotionClassifier>) -> Self {
        self.text_classifier = Some(classifier);
        self
    }

    pub fn with_audio(
        mut self,
        extractor: Arc<dyn AudioFeatureExtractor>,
        classifier: Arc<dyn AudioEmotionClassifier>,
    ) -> Self {
        self.audio_extractor = Some(extractor);
        self.audio_classifier = Some(classifier);
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn SessionArchive>) -> Self {
        self.finalizer = SessionFinalizer::new(self.generator.clone(), Some(archive));
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Processes one turn. Turns for the same session id are serialized on the session lock.
    pub async fn handle_turn(&self, request: TurnRequest) -> TurnOutcome {
        let TurnRequest {
            session_id,
            text,
            audio,
            phase,
            username,
        } = request;

        let handle = self.sessions.get_or_create(&session_id);
        let mut session = handle.lock().await;

        if session.is_past_limit(phase) {
            tracing::info!(
                target: "solace::orchestrator",
                session_id = %session_id,
                ?phase,
                counter = session.counter(phase),
                "turn rejected: phase concluded"
            );
            return TurnOutcome::Concluded {
                message: CONCLUDED_MESSAGE.to_string(),
            };
        }

        let raw = text.unwrap_or_default();
        if phase == TurnPhase::Primary && session.stage() == SessionStage::AwaitingSchedule {
            return TurnOutcome::Reply(self.schedule_turn(&mut session, raw).await);
        }

        let audio = audio.filter(|bytes| !bytes.is_empty());
        let reply = self.dialog_turn(&mut session, raw, audio, phase, &username).await;
        if reply.completed.is_some() {
            self.sessions.mark_finalized(&session_id);
        }
        TurnOutcome::Reply(reply)
    }

    // -----------------------------------------------------------------------
    // Turn 1
    // -----------------------------------------------------------------------

    async fn schedule_turn(&self, session: &mut SessionState, raw: String) -> TurnReply {
        session.schedule = raw.clone();
        let current_turn = session.advance(TurnPhase::Primary);

        let reply = match self
            .generator
            .generate(&acknowledgment_prompt(&raw), GenerationHint::Text)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(target: "solace::orchestrator", session_id = %session.session_id, error = %e, "acknowledgment generation failed; using fallback");
                ACKNOWLEDGMENT_FALLBACK.to_string()
            }
        };

        session.turns.push(TurnRecord {
            turn: 1,
            user: raw.clone(),
            reply: reply.clone(),
            emotion: EmotionLabel::Neutral,
        });
        session.emotion_scores.push(EmotionScoreRecord::schedule_placeholder());

        tracing::info!(target: "solace::orchestrator", session_id = %session.session_id, turn = 1, "schedule collected");

        TurnReply {
            reply,
            emotion: EmotionLabel::Neutral,
            current_turn,
            is_final: false,
            analytics: session.emotion_scores.clone(),
            resolved_text: raw,
            completed: None,
        }
    }

    // -----------------------------------------------------------------------
    // Dialog turns
    // -----------------------------------------------------------------------

    async fn dialog_turn(
        &self,
        session: &mut SessionState,
        raw: String,
        audio: Option<Vec<u8>>,
        phase: TurnPhase,
        username: &str,
    ) -> TurnReply {
        let resolution = self.resolve(session, &raw).await;
        let classifier_scores = self.classify_text(&session.session_id, &resolution.resolved_text).await;
        let text_fused = fuse_text_signals(&classifier_scores, &resolution.scores);
        let audio_scores = match audio {
            Some(bytes) => self.classify_audio(&session.session_id, bytes).await,
            None => None,
        };
        let scores = fuse_with_audio(&text_fused, audio_scores.as_ref());
        let emotion = scores.dominant();

        let turn = session.next_score_turn(phase);
        session.emotion_scores.push(EmotionScoreRecord { turn, scores, emotion });

        let counter = session.advance(phase);
        let is_final = counter == phase.limit();
        let instruction = PhaseInstruction::for_counter(counter);

        let prompt = dialog_reply_prompt(&DialogPrompt {
            utterance: &resolution.resolved_text,
            emotion,
            schedule: &session.schedule,
            turn: counter,
            instruction,
            is_final,
        });
        let reply = match self.generator.generate(&prompt, GenerationHint::Text).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(target: "solace::orchestrator", session_id = %session.session_id, turn, error = %e, "reply generation failed; using fallback");
                if is_final {
                    CLOSING_REPLY_FALLBACK.to_string()
                } else {
                    DIALOG_REPLY_FALLBACK.to_string()
                }
            }
        };

        session.turns.push(TurnRecord {
            turn,
            user: resolution.resolved_text.clone(),
            reply: reply.clone(),
            emotion,
        });

        tracing::info!(
            target: "solace::orchestrator",
            session_id = %session.session_id,
            turn,
            counter,
            ?phase,
            emotion = %emotion,
            with_audio = audio_scores.is_some(),
            is_final,
            "turn processed"
        );

        let completed = if is_final {
            Some(self.finalizer.finalize(session, username, phase).await)
        } else {
            None
        };

        TurnReply {
            reply,
            emotion,
            current_turn: counter,
            is_final,
            analytics: session.emotion_scores.clone(),
            resolved_text: resolution.resolved_text,
            completed,
        }
    }

    async fn resolve(&self, session: &SessionState, raw: &str) -> Resolution {
        let prompt = resolution_prompt(raw, session.recent_turns(RESOLUTION_HISTORY_TURNS), &session.schedule);
        match self.generator.generate(&prompt, GenerationHint::Json).await {
            Ok(out) => parse_resolution(&out, raw).unwrap_or_else(|e| {
                tracing::warn!(target: "solace::orchestrator", session_id = %session.session_id, error = %e, "resolution output unparseable; using raw text");
                Resolution::fallback(raw)
            }),
            Err(e) => {
                tracing::warn!(target: "solace::orchestrator", session_id = %session.session_id, error = %e, "context resolution failed; using raw text");
                Resolution::fallback(raw)
            }
        }
    }

    async fn classify_text(&self, session_id: &str, text: &str) -> EmotionDistribution {
        let Some(classifier) = &self.text_classifier else {
            return EmotionDistribution::zeros();
        };
        match classifier.classify(text).await {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!(target: "solace::orchestrator", session_id, error = %e, "text classifier failed; treating as unavailable");
                EmotionDistribution::zeros()
            }
        }
    }

    /// Audio stage scores, or `None` to fall back to text-only fusion.
    async fn classify_audio(&self, session_id: &str, bytes: Vec<u8>) -> Option<EmotionDistribution> {
        let (Some(extractor), Some(classifier)) = (&self.audio_extractor, &self.audio_classifier) else {
            return None;
        };
        let extractor = extractor.clone();
        let features = match tokio::task::spawn_blocking(move || extractor.extract(&bytes)).await {
            Ok(Ok(features)) => features,
            Ok(Err(e)) => {
                tracing::warn!(target: "solace::orchestrator", session_id, error = %e, "audio feature extraction failed; text-only fusion");
                return None;
            }
            Err(e) => {
                tracing::warn!(target: "solace::orchestrator", session_id, error = %e, "audio extraction task failed; text-only fusion");
                return None;
            }
        };
        match classifier.classify(&features).await {
            Ok(scores) => Some(scores),
            Err(e) => {
                tracing::warn!(target: "solace::orchestrator", session_id, error = %e, "audio classifier failed; text-only fusion");
                None
            }
        }
    }
}
