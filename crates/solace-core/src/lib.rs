//! Solace core: a turn-limited wellness check-in engine.
//!
//! Fuses text-classifier, language-model, and optional audio emotion signals per turn, drives
//! the session state machine, finalizes completed sessions into a sled archive, and reduces the
//! archive into weekly profiles. HTTP lives in the `solace-gateway` add-on.

pub mod archive;
pub mod audio;
pub mod classifiers;
pub mod config;
pub mod emotion;
pub mod error;
pub mod finalizer;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod session;
pub mod traits;
pub mod weekly;

pub use archive::SledSessionArchive;
pub use audio::WavFeatureExtractor;
pub use classifiers::{HttpAudioClassifier, HttpTextClassifier};
pub use config::CheckinConfig;
pub use emotion::{
    fuse_text_signals, fuse_with_audio, select_weights, EmotionDistribution, EmotionLabel, FusionDecision,
    FusionWeights, Valence,
};
pub use error::{CheckinError, CheckinResult};
pub use finalizer::SessionFinalizer;
pub use llm::OpenAiCompatGenerator;
pub use orchestrator::{TurnOrchestrator, TurnOutcome, TurnReply, TurnRequest, CONCLUDED_MESSAGE, DEFAULT_USERNAME};
pub use session::{
    CompletedSessionRecord, EmotionScoreRecord, SessionInsights, SessionStage, SessionState, SessionStore, TurnPhase,
    TurnRecord,
};
pub use traits::{
    AudioEmotionClassifier, AudioFeatureExtractor, AudioFeatures, GenerationHint, SessionArchive,
    TextEmotionClassifier, TextGenerator,
};
pub use weekly::{aggregate, WeeklyInsights, WeeklyNarrative, WeeklyNarrator, WeeklyProfile};
