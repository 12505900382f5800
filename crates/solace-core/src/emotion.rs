//! Emotion labels, distributions, and the two-stage fusion heuristic.
//!
//! Stage one merges the local text classifier with the language-model estimate using
//! conflict-aware weights. Stage two re-weights the result toward the audio classifier
//! when a voice recording accompanied the turn. Weights and the confidence threshold are
//! fixed business rules; they are not configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Classifier weight / language-model weight when the signals conflict or the classifier is unsure.
pub const DEFERRING_WEIGHTS: FusionWeights = FusionWeights { classifier: 0.20, llm: 0.80 };
/// Classifier weight / language-model weight when the classifier is confident and agrees.
pub const CONFIDENT_WEIGHTS: FusionWeights = FusionWeights { classifier: 0.70, llm: 0.30 };
/// Classifier top-label score below this defers to the language model.
pub const CLASSIFIER_CONFIDENCE_THRESHOLD: f64 = 0.70;
/// Share of the text-fused score kept when audio is present.
pub const AUDIO_STAGE_TEXT_WEIGHT: f64 = 0.3;
/// Share given to the audio classifier when audio is present.
pub const AUDIO_STAGE_AUDIO_WEIGHT: f64 = 0.7;

/// The closed label set. Declaration order is the fixed iteration order used for tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Neutral,
    Anger,
    Disgust,
    Fear,
    Happiness,
    Sadness,
    Surprise,
}

/// Valence group of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Valence {
    Positive,
    Negative,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 7] = [
        EmotionLabel::Neutral,
        EmotionLabel::Anger,
        EmotionLabel::Disgust,
        EmotionLabel::Fear,
        EmotionLabel::Happiness,
        EmotionLabel::Sadness,
        EmotionLabel::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Anger => "anger",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Happiness => "happiness",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Surprise => "surprise",
        }
    }

    /// Parses a label from classifier or model output. Accepts common aliases
    /// (`happy`, `joy`, `angry`, `sad`, ...). Unknown labels yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "neutral" | "calm" => Some(EmotionLabel::Neutral),
            "anger" | "angry" => Some(EmotionLabel::Anger),
            "disgust" | "disgusted" => Some(EmotionLabel::Disgust),
            "fear" | "fearful" | "scared" => Some(EmotionLabel::Fear),
            "happiness" | "happy" | "joy" | "joyful" => Some(EmotionLabel::Happiness),
            "sadness" | "sad" => Some(EmotionLabel::Sadness),
            "surprise" | "surprised" => Some(EmotionLabel::Surprise),
            _ => None,
        }
    }

    pub fn valence(&self) -> Valence {
        match self {
            EmotionLabel::Happiness | EmotionLabel::Surprise | EmotionLabel::Neutral => Valence::Positive,
            EmotionLabel::Anger | EmotionLabel::Disgust | EmotionLabel::Fear | EmotionLabel::Sadness => {
                Valence::Negative
            }
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score per label. Scores are non-negative and need not sum to 1.
/// Every label is always present; labels an upstream signal omitted are 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct EmotionDistribution {
    scores: [f64; 7],
}

impl EmotionDistribution {
    /// All labels at 0.0 (unavailable classifier, turn-one placeholder).
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Every label at the same score (e.g. 0.1 for the low-confidence resolution fallback).
    pub fn uniform(score: f64) -> Self {
        Self { scores: [sanitize(score); 7] }
    }

    /// Builds a distribution from `(label, score)` pairs. Unknown labels are ignored;
    /// repeated labels keep the last score.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut out = Self::zeros();
        for (label, score) in pairs {
            if let Some(label) = EmotionLabel::parse(label) {
                out.set(label, score);
            }
        }
        out
    }

    pub fn get(&self, label: EmotionLabel) -> f64 {
        self.scores[label.index()]
    }

    pub fn set(&mut self, label: EmotionLabel, score: f64) {
        self.scores[label.index()] = sanitize(score);
    }

    pub fn with(mut self, label: EmotionLabel, score: f64) -> Self {
        self.set(label, score);
        self
    }

    /// Iterates in the fixed label order.
    pub fn iter(&self) -> impl Iterator<Item = (EmotionLabel, f64)> + '_ {
        EmotionLabel::ALL.iter().map(move |l| (*l, self.get(*l)))
    }

    /// Arg-max label and its score. Ties go to the first label in the fixed order.
    pub fn top(&self) -> (EmotionLabel, f64) {
        let mut best = (EmotionLabel::Neutral, self.get(EmotionLabel::Neutral));
        for (label, score) in self.iter().skip(1) {
            if score > best.1 {
                best = (label, score);
            }
        }
        best
    }

    /// Dominant emotion (arg-max, fixed-order tie-break).
    pub fn dominant(&self) -> EmotionLabel {
        self.top().0
    }

    /// Highest score in the distribution ("surety" in weekly reporting).
    pub fn max_score(&self) -> f64 {
        self.top().1
    }

    fn weighted_sum(a: &Self, wa: f64, b: &Self, wb: f64) -> Self {
        let mut out = Self::zeros();
        for label in EmotionLabel::ALL {
            out.set(label, a.get(label) * wa + b.get(label) * wb);
        }
        out
    }
}

fn sanitize(score: f64) -> f64 {
    if score.is_finite() && score > 0.0 {
        score
    } else {
        0.0
    }
}

impl From<BTreeMap<String, f64>> for EmotionDistribution {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self::from_pairs(map.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}

impl From<EmotionDistribution> for BTreeMap<String, f64> {
    fn from(dist: EmotionDistribution) -> Self {
        dist.iter().map(|(l, s)| (l.as_str().to_string(), s)).collect()
    }
}

// ---------------------------------------------------------------------------
// Fusion
// ---------------------------------------------------------------------------

/// Weight pair applied in the text stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub classifier: f64,
    pub llm: f64,
}

/// How the text stage chose its weights. Logged per turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionDecision {
    pub top_classifier: EmotionLabel,
    pub top_llm: EmotionLabel,
    pub classifier_confidence: f64,
    /// Classifier says positive valence while the language model says negative.
    /// The reverse direction is deliberately not a conflict.
    pub conflict: bool,
    pub weights: FusionWeights,
}

/// Chooses text-stage weights for a classifier / language-model pair.
pub fn select_weights(classifier: &EmotionDistribution, llm: &EmotionDistribution) -> FusionDecision {
    let (top_classifier, classifier_confidence) = classifier.top();
    let top_llm = llm.dominant();
    let conflict = top_classifier.valence() == Valence::Positive && top_llm.valence() == Valence::Negative;
    let weights = if conflict || classifier_confidence < CLASSIFIER_CONFIDENCE_THRESHOLD {
        DEFERRING_WEIGHTS
    } else {
        CONFIDENT_WEIGHTS
    };
    FusionDecision {
        top_classifier,
        top_llm,
        classifier_confidence,
        conflict,
        weights,
    }
}

/// Text stage: `classifier × w_c + llm × w_l` for every label.
pub fn fuse_text_signals(classifier: &EmotionDistribution, llm: &EmotionDistribution) -> EmotionDistribution {
    let decision = select_weights(classifier, llm);
    tracing::debug!(
        target: "solace::fusion",
        top_classifier = %decision.top_classifier,
        top_llm = %decision.top_llm,
        confidence = decision.classifier_confidence,
        conflict = decision.conflict,
        w_classifier = decision.weights.classifier,
        w_llm = decision.weights.llm,
        "text fusion weights selected"
    );
    EmotionDistribution::weighted_sum(classifier, decision.weights.classifier, llm, decision.weights.llm)
}

/// Audio stage: `text × 0.3 + audio × 0.7` when audio is present, else the text result unchanged.
pub fn fuse_with_audio(text_fused: &EmotionDistribution, audio: Option<&EmotionDistribution>) -> EmotionDistribution {
    match audio {
        Some(audio) => EmotionDistribution::weighted_sum(
            text_fused,
            AUDIO_STAGE_TEXT_WEIGHT,
            audio,
            AUDIO_STAGE_AUDIO_WEIGHT,
        ),
        None => *text_fused,
    }
}
