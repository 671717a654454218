use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub redis_url: String,
    /// Full inference endpoint URL. Empty means unconfigured; the classifier
    /// then goes straight to fallback instead of sending a malformed request.
    pub inference_url: String,
    pub model_id: String,
    pub inference_token: Option<String>,
    pub inference_timeout_ms: u64,
    pub inference_attempts: u32,
    pub inference_backoff_ms: u64,
    /// Confidence thresholds for the score-to-stars mapping. Tunable without
    /// code changes; the defaults compensate for upstream overconfidence.
    pub positive_five_star: f64,
    pub positive_four_star: f64,
    pub negative_one_star: f64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "1111"),
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379"),
            inference_url: try_load("HF_INFERENCE_URL", ""),
            model_id: try_load("HF_MODEL_ID", ""),
            inference_token: read_secret("HF_API_TOKEN"),
            inference_timeout_ms: try_load("HF_TIMEOUT_MS", "10000"),
            inference_attempts: try_load("HF_ATTEMPTS", "2"),
            inference_backoff_ms: try_load("HF_BACKOFF_MS", "500"),
            positive_five_star: try_load("SENTIMENT_FIVE_STAR_MIN", "0.99"),
            positive_four_star: try_load("SENTIMENT_FOUR_STAR_MIN", "0.80"),
            negative_one_star: try_load("SENTIMENT_ONE_STAR_MIN", "0.995"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Secrets come from docker secret files, with a plain env var fallback for
/// local runs. A missing secret is not fatal here: the classifier treats it
/// as "unconfigured" and degrades to fallback.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    if let Ok(s) = read_to_string(&path) {
        return Some(s.trim().to_string());
    }

    env::var(secret_name).ok().or_else(|| {
        warn!("Secret {secret_name} not found in {path} or environment");
        None
    })
}
