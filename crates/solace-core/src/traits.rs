//! Capability seams the core depends on: text generation, emotion classifiers,
//! audio feature extraction, and the completed-session archive.
//!
//! The orchestrator only sees these traits; concrete HTTP / sled implementations
//! live in `llm`, `classifiers`, `audio`, and `archive`.

use crate::emotion::EmotionDistribution;
use crate::error::CheckinResult;
use crate::session::CompletedSessionRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Output-shape hint passed with a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationHint {
    #[default]
    Text,
    /// Ask the backend for a JSON object (context resolution).
    Json,
}

/// Black-box "generate text from prompt". May fail; callers own the fallback.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, hint: GenerationHint) -> CheckinResult<String>;
}

/// Text emotion classifier (fast, local-ish, brittle on tone).
#[async_trait]
pub trait TextEmotionClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> CheckinResult<EmotionDistribution>;
}

/// Prosody feature vector extracted from one recorded turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub sample_rate: u32,
    pub values: Vec<f32>,
}

/// Turns an uploaded recording into features for the audio classifier.
pub trait AudioFeatureExtractor: Send + Sync {
    fn extract(&self, audio: &[u8]) -> CheckinResult<AudioFeatures>;
}

/// Audio emotion classifier over extracted features.
#[async_trait]
pub trait AudioEmotionClassifier: Send + Sync {
    async fn classify(&self, features: &AudioFeatures) -> CheckinResult<EmotionDistribution>;
}

/// Persistence for completed sessions. Written once per phase termination, read by history
/// and weekly reporting.
pub trait SessionArchive: Send + Sync {
    fn save(&self, record: &CompletedSessionRecord) -> CheckinResult<()>;

    /// Distinct session dates (`YYYY-MM-DD`) for a user, newest first.
    fn list_dates(&self, username: &str) -> CheckinResult<Vec<String>>;

    /// Latest record stored for a user on the given date.
    fn load_for_date(&self, username: &str, date: &str) -> CheckinResult<Option<CompletedSessionRecord>>;

    /// Every record for a user, oldest first.
    fn load_all(&self, username: &str) -> CheckinResult<Vec<CompletedSessionRecord>>;
}
