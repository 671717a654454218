//! # Sentiment Classification
//!
//! Converts review text into a `(stars, label)` pair.
//!
//! ## Pipeline
//! 1. POST the trimmed text to the configured inference endpoint
//!    (`{"inputs": <text>}`, bearer token). Bounded timeout, two attempts
//!    with a short fixed backoff on transient failures only.
//! 2. Map the best `(label, score)` entry to a star baseline. Thresholds
//!    live in [`Config`](crate::config::Config) so they can be tuned
//!    without code changes.
//! 3. Run the ordered keyword rules from [`crate::rules`] over the text.
//! 4. On any irrecoverable upstream failure, return the neutral fallback
//!    (3 stars, confidence 0, raw label "fallback").
//!
//! The classifier never raises to its caller. Review submission must not
//! fail because the inference service is down.
//!
//! ## Response shape
//! The endpoint returns a JSON array of `{label, score}` objects, possibly
//! nested one level (`[[{...}]]`). The highest-scoring entry wins.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::{
    config::Config,
    models::{Label, ReviewSentiment},
    rules::apply_rules,
};

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    five_star_min: f64,
    four_star_min: f64,
    one_star_min: f64,
}

pub struct SentimentClassifier {
    client: Client,
    endpoint: String,
    token: Option<String>,
    model_version: String,
    timeout: Duration,
    attempts: u32,
    backoff: Duration,
    thresholds: Thresholds,
}

#[derive(Error, Debug)]
enum InferError {
    #[error("inference endpoint not configured")]
    Unconfigured,

    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference returned status {0}")]
    Status(StatusCode),

    #[error("inference response missing label/score")]
    Malformed,
}

impl InferError {
    fn is_transient(&self) -> bool {
        match self {
            InferError::Transport(e) => !e.is_decode(),
            InferError::Status(code) => code.is_server_error(),
            _ => false,
        }
    }
}

impl SentimentClassifier {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.inference_url.clone(),
            token: config.inference_token.clone(),
            model_version: format!("hf:{}", config.model_id),
            timeout: Duration::from_millis(config.inference_timeout_ms),
            attempts: config.inference_attempts.max(1),
            backoff: Duration::from_millis(config.inference_backoff_ms),
            thresholds: Thresholds {
                five_star_min: config.positive_five_star,
                four_star_min: config.positive_four_star,
                one_star_min: config.negative_one_star,
            },
        }
    }

    /// Written into the audit record alongside each analysis.
    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// `None` only for empty/whitespace text. Every upstream failure mode
    /// degrades to [`ReviewSentiment::fallback`].
    pub async fn classify(&self, text: &str) -> Option<ReviewSentiment> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let (raw_label, score) = match self.infer(text).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Classification unavailable, using fallback: {e}");
                return Some(ReviewSentiment::fallback());
            }
        };

        let confidence = score.clamp(0.0, 1.0);
        let (stars, label) = self.stars_for(Label::parse(&raw_label), confidence);
        let (stars, label) = apply_rules(text, stars, label);

        Some(ReviewSentiment {
            stars,
            label,
            confidence,
            raw_label,
        })
    }

    async fn infer(&self, text: &str) -> Result<(String, f64), InferError> {
        if self.endpoint.is_empty() {
            return Err(InferError::Unconfigured);
        }
        let token = self.token.as_deref().ok_or(InferError::Unconfigured)?;

        let mut last = InferError::Unconfigured;

        for attempt in 0..self.attempts {
            if attempt > 0 {
                sleep(self.backoff).await;
            }

            match self.attempt(token, text).await {
                Ok(pair) => return Ok(pair),
                Err(e) if e.is_transient() => {
                    warn!("Inference attempt {} failed: {e}", attempt + 1);
                    last = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last)
    }

    async fn attempt(&self, token: &str, text: &str) -> Result<(String, f64), InferError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(&json!({ "inputs": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferError::Status(status));
        }

        let body: Value = response.json().await?;
        best_entry(&body).ok_or(InferError::Malformed)
    }

    fn stars_for(&self, label: Label, score: f64) -> (u8, Label) {
        match label {
            Label::Positive if score >= self.thresholds.five_star_min => (5, Label::Positive),
            Label::Positive if score >= self.thresholds.four_star_min => (4, Label::Positive),
            Label::Positive => (3, Label::Positive),
            Label::Negative if score >= self.thresholds.one_star_min => (1, Label::Negative),
            Label::Negative => (2, Label::Negative),
            Label::Neutral => (3, Label::Neutral),
        }
    }
}

/// Picks the highest-scoring `{label, score}` entry out of a flat or
/// one-level-nested array. `None` when no usable entry exists.
fn best_entry(value: &Value) -> Option<(String, f64)> {
    let outer = value.as_array()?;
    let entries = match outer.first() {
        Some(Value::Array(inner)) => inner.as_slice(),
        _ => outer.as_slice(),
    };

    entries
        .iter()
        .filter_map(|entry| {
            let label = entry.get("label")?.as_str()?;
            let score = entry.get("score")?.as_f64()?;
            Some((label.to_string(), score))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::{best_entry, SentimentClassifier};
    use crate::{config::Config, models::Label};
    use serde_json::json;

    fn test_config() -> Config {
        Config {
            port: 0,
            redis_url: String::new(),
            inference_url: "http://127.0.0.1:1/models/test".to_string(),
            model_id: "test".to_string(),
            inference_token: Some("token".to_string()),
            inference_timeout_ms: 1000,
            inference_attempts: 2,
            inference_backoff_ms: 10,
            positive_five_star: 0.99,
            positive_four_star: 0.80,
            negative_one_star: 0.995,
        }
    }

    #[test]
    fn test_stars_mapping_positive() {
        let classifier = SentimentClassifier::new(&test_config());

        assert_eq!(
            classifier.stars_for(Label::Positive, 0.99),
            (5, Label::Positive)
        );
        assert_eq!(
            classifier.stars_for(Label::Positive, 0.98),
            (4, Label::Positive)
        );
        assert_eq!(
            classifier.stars_for(Label::Positive, 0.80),
            (4, Label::Positive)
        );
        assert_eq!(
            classifier.stars_for(Label::Positive, 0.79),
            (3, Label::Positive)
        );
    }

    #[test]
    fn test_stars_mapping_negative() {
        let classifier = SentimentClassifier::new(&test_config());

        assert_eq!(
            classifier.stars_for(Label::Negative, 0.995),
            (1, Label::Negative)
        );
        assert_eq!(
            classifier.stars_for(Label::Negative, 0.99),
            (2, Label::Negative)
        );
    }

    #[test]
    fn test_stars_mapping_neutral_any_confidence() {
        let classifier = SentimentClassifier::new(&test_config());

        assert_eq!(
            classifier.stars_for(Label::Neutral, 1.0),
            (3, Label::Neutral)
        );
        assert_eq!(
            classifier.stars_for(Label::Neutral, 0.0),
            (3, Label::Neutral)
        );
    }

    #[test]
    fn test_best_entry_flat_array() {
        let body = json!([
            { "label": "negative", "score": 0.2 },
            { "label": "positive", "score": 0.7 }
        ]);

        assert_eq!(best_entry(&body), Some(("positive".to_string(), 0.7)));
    }

    #[test]
    fn test_best_entry_nested_array() {
        let body = json!([[
            { "label": "positive", "score": 0.1 },
            { "label": "neutral", "score": 0.6 }
        ]]);

        assert_eq!(best_entry(&body), Some(("neutral".to_string(), 0.6)));
    }

    #[test]
    fn test_best_entry_rejects_malformed() {
        assert_eq!(best_entry(&json!({ "error": "loading" })), None);
        assert_eq!(best_entry(&json!([])), None);
        assert_eq!(best_entry(&json!([{ "label": "positive" }])), None);
        assert_eq!(best_entry(&json!([{ "score": 0.9 }])), None);
    }

    #[tokio::test]
    async fn test_empty_text_returns_none() {
        let classifier = SentimentClassifier::new(&test_config());

        assert_eq!(classifier.classify("").await, None);
        assert_eq!(classifier.classify("   \n\t").await, None);
    }

    #[tokio::test]
    async fn test_missing_token_skips_call_and_falls_back() {
        let mut config = test_config();
        config.inference_token = None;

        let classifier = SentimentClassifier::new(&config);
        let result = classifier.classify("Produk biasa saja").await;

        assert_eq!(
            result,
            Some(crate::models::ReviewSentiment::fallback())
        );
    }

    #[tokio::test]
    async fn test_missing_endpoint_skips_call_and_falls_back() {
        let mut config = test_config();
        config.inference_url = String::new();

        let classifier = SentimentClassifier::new(&config);
        let result = classifier.classify("Produk biasa saja").await;

        assert_eq!(
            result,
            Some(crate::models::ReviewSentiment::fallback())
        );
    }
}
