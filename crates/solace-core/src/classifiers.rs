//! HTTP emotion classifiers (text and audio) sharing one response decoder.

use crate::emotion::EmotionDistribution;
use crate::error::{CheckinError, CheckinResult};
use crate::traits::{AudioEmotionClassifier, AudioFeatures, TextEmotionClassifier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Accepted classifier bodies: `[{label, score}]`, the pipeline-style `[[{label, score}]]`,
/// or a flat `{label: score}` map.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClassifierBody {
    Pairs(Vec<LabelScore>),
    Batched(Vec<Vec<LabelScore>>),
    Map(BTreeMap<String, f64>),
}

impl ClassifierBody {
    fn into_distribution(self) -> EmotionDistribution {
        match self {
            ClassifierBody::Pairs(pairs) => {
                EmotionDistribution::from_pairs(pairs.iter().map(|p| (p.label.as_str(), p.score)))
            }
            ClassifierBody::Batched(batches) => batches
                .into_iter()
                .next()
                .map(|pairs| EmotionDistribution::from_pairs(pairs.iter().map(|p| (p.label.as_str(), p.score))))
                .unwrap_or_default(),
            ClassifierBody::Map(map) => EmotionDistribution::from(map),
        }
    }
}

/// Decodes a classifier response body into a distribution over the fixed label set.
pub fn decode_classifier_body(raw: &str) -> CheckinResult<EmotionDistribution> {
    let body: ClassifierBody = serde_json::from_str(raw)
        .map_err(|e| CheckinError::Classifier(format!("unrecognized classifier response: {}", e)))?;
    Ok(body.into_distribution())
}

async fn post_for_distribution<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
) -> CheckinResult<EmotionDistribution> {
    let res = client.post(url).json(body).send().await?;
    if !res.status().is_success() {
        let status = res.status();
        return Err(CheckinError::Classifier(format!("{} returned {}", url, status)));
    }
    let text = res.text().await?;
    decode_classifier_body(&text)
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

/// POSTs `{"text": ...}` to a classification endpoint.
pub struct HttpTextClassifier {
    url: String,
    client: reqwest::Client,
}

impl HttpTextClassifier {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            client: build_client(timeout),
        }
    }
}

#[async_trait]
impl TextEmotionClassifier for HttpTextClassifier {
    async fn classify(&self, text: &str) -> CheckinResult<EmotionDistribution> {
        post_for_distribution(&self.client, &self.url, &TextRequest { text }).await
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

/// POSTs the extracted feature vector to an audio classification endpoint.
pub struct HttpAudioClassifier {
    url: String,
    client: reqwest::Client,
}

impl HttpAudioClassifier {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            client: build_client(timeout),
        }
    }
}

#[async_trait]
impl AudioEmotionClassifier for HttpAudioClassifier {
    async fn classify(&self, features: &AudioFeatures) -> CheckinResult<EmotionDistribution> {
        post_for_distribution(&self.client, &self.url, features).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionLabel;

    #[test]
    fn decodes_label_score_pairs_with_aliases() {
        let d = decode_classifier_body(r#"[{"label":"joy","score":0.8},{"label":"angry","score":0.1}]"#).unwrap();
        assert_eq!(d.dominant(), EmotionLabel::Happiness);
        assert!((d.get(EmotionLabel::Anger) - 0.1).abs() < 1e-9);
        assert_eq!(d.get(EmotionLabel::Fear), 0.0);
    }

    #[test]
    fn decodes_batched_and_map_bodies() {
        let d = decode_classifier_body(r#"[[{"label":"sadness","score":0.6}]]"#).unwrap();
        assert_eq!(d.dominant(), EmotionLabel::Sadness);

        let d = decode_classifier_body(r#"{"fear": 0.3, "neutral": 0.2}"#).unwrap();
        assert_eq!(d.dominant(), EmotionLabel::Fear);
    }

    #[test]
    fn rejects_unrecognized_body() {
        let err = decode_classifier_body(r#""nope""#).unwrap_err();
        assert!(matches!(err, CheckinError::Classifier(_)));
    }
}
