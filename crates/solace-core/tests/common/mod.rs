//! Scripted in-memory capabilities shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use solace_core::{
    AudioEmotionClassifier, AudioFeatureExtractor, AudioFeatures, CheckinError, CheckinResult,
    CompletedSessionRecord, EmotionDistribution, GenerationHint, SessionArchive, TextEmotionClassifier,
    TextGenerator,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Answers by prompt kind. Resolution and summary answer with fixed bodies unless overridden.
pub struct ScriptedGenerator {
    pub resolution: Option<String>,
    pub summary: Option<String>,
    pub fail_all: bool,
    pub prompts: Mutex<Vec<(String, GenerationHint)>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            resolution: None,
            summary: None,
            fail_all: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    pub fn with_resolution(body: &str) -> Self {
        Self {
            resolution: Some(body.to_string()),
            ..Self::new()
        }
    }

    pub fn with_summary(body: &str) -> Self {
        Self {
            summary: Some(body.to_string()),
            ..Self::new()
        }
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p.contains(needle))
            .count()
    }

    pub fn hints_for(&self, needle: &str) -> Vec<GenerationHint> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p.contains(needle))
            .map(|(_, h)| *h)
            .collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, hint: GenerationHint) -> CheckinResult<String> {
        self.prompts.lock().unwrap().push((prompt.to_string(), hint));
        if self.fail_all {
            return Err(CheckinError::Generation("scripted failure".to_string()));
        }
        if prompt.contains("The user shared this schedule") {
            return Ok("Thanks for sharing. What was the best part of your day?".to_string());
        }
        if prompt.contains("Resolve context") {
            return Ok(self.resolution.clone().unwrap_or_else(|| {
                r#"{"resolved_text": "resolved utterance", "scores": {"happiness": 0.6, "neutral": 0.2}}"#.to_string()
            }));
        }
        if prompt.contains("Clinical Data Analyst") {
            if let Some(summary) = &self.summary {
                return Ok(summary.clone());
            }
            return Ok(
                r#"Summary: {"triggers": "late meeting", "happy_moments": "evening run", "suggestions": "stretch before bed"}"#
                    .to_string(),
            );
        }
        if prompt.contains("IS_FINAL_TURN: True") {
            return Ok("You did well today. Try a short breathing exercise tonight.".to_string());
        }
        Ok("What else stood out to you today?".to_string())
    }
}

/// Returns the same distribution every time and counts calls.
pub struct FixedClassifier {
    pub scores: EmotionDistribution,
    pub calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn new(scores: EmotionDistribution) -> Self {
        Self {
            scores,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextEmotionClassifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> CheckinResult<EmotionDistribution> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores)
    }
}

#[async_trait]
impl AudioEmotionClassifier for FixedClassifier {
    async fn classify(&self, _features: &AudioFeatures) -> CheckinResult<EmotionDistribution> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores)
    }
}

pub struct StubExtractor {
    pub fail: bool,
}

impl AudioFeatureExtractor for StubExtractor {
    fn extract(&self, _audio: &[u8]) -> CheckinResult<AudioFeatures> {
        if self.fail {
            return Err(CheckinError::AudioFeatures("corrupt recording".to_string()));
        }
        Ok(AudioFeatures {
            sample_rate: 16_000,
            values: vec![0.1; 7],
        })
    }
}

#[derive(Default)]
pub struct MemoryArchive {
    pub records: Mutex<Vec<CompletedSessionRecord>>,
}

impl MemoryArchive {
    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl SessionArchive for MemoryArchive {
    fn save(&self, record: &CompletedSessionRecord) -> CheckinResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn list_dates(&self, username: &str) -> CheckinResult<Vec<String>> {
        let mut dates: Vec<String> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.username == username)
            .map(|r| r.date.clone())
            .collect();
        dates.sort();
        dates.dedup();
        dates.reverse();
        Ok(dates)
    }

    fn load_for_date(&self, username: &str, date: &str) -> CheckinResult<Option<CompletedSessionRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.username == username && r.date == date)
            .last()
            .cloned())
    }

    fn load_all(&self, username: &str) -> CheckinResult<Vec<CompletedSessionRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.username == username)
            .cloned()
            .collect())
    }
}

/// Archive whose writes always fail.
pub struct BrokenArchive;

impl SessionArchive for BrokenArchive {
    fn save(&self, _record: &CompletedSessionRecord) -> CheckinResult<()> {
        Err(CheckinError::Generation("disk full".to_string()))
    }

    fn list_dates(&self, _username: &str) -> CheckinResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn load_for_date(&self, _username: &str, _date: &str) -> CheckinResult<Option<CompletedSessionRecord>> {
        Ok(None)
    }

    fn load_all(&self, _username: &str) -> CheckinResult<Vec<CompletedSessionRecord>> {
        Ok(Vec::new())
    }
}
