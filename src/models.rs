use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse polarity of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Positive,
    Neutral,
    Negative,
}

impl Label {
    /// Upstream labels are free-form strings. Anything that is not a known
    /// positive/negative token collapses to neutral.
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "positive" => Label::Positive,
            "negative" => Label::Negative,
            _ => Label::Neutral,
        }
    }

    /// Star thresholds shared with the listing aggregation: >=4 positive,
    /// ==3 neutral, <=2 negative.
    pub fn from_stars(stars: u8) -> Self {
        match stars {
            4.. => Label::Positive,
            3 => Label::Neutral,
            _ => Label::Negative,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Positive => "positive",
            Label::Neutral => "neutral",
            Label::Negative => "negative",
        }
    }
}

/// Final outcome of classifying one review text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSentiment {
    pub stars: u8,
    pub label: Label,
    pub confidence: f64,
    /// Unmodified upstream label token, or "fallback". Kept for audit,
    /// never interpreted downstream.
    pub raw_label: String,
}

impl ReviewSentiment {
    pub fn fallback() -> Self {
        Self {
            stars: 3,
            label: Label::Neutral,
            confidence: 0.0,
            raw_label: "fallback".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Done,
}

/// One review per buyer per product, keyed "{buyer_id}:{product_id}".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub review_id: String,
    pub product_id: u64,
    pub buyer_id: u64,
    pub review_text: String,
    pub rating: u8,
    pub sentiment: Option<Label>,
    pub analysis_status: AnalysisStatus,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn id_for(buyer_id: u64, product_id: u64) -> String {
        format!("{buyer_id}:{product_id}")
    }
}

/// Audit row mirroring the latest analysis of a review. One per review id,
/// overwritten on reanalysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub review_id: String,
    pub category: Label,
    pub model_version: String,
    pub analyzed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::Label;

    #[test]
    fn test_parse_known_labels() {
        assert_eq!(Label::parse("positive"), Label::Positive);
        assert_eq!(Label::parse("NEGATIVE"), Label::Negative);
        assert_eq!(Label::parse("neutral"), Label::Neutral);
    }

    #[test]
    fn test_parse_unknown_label_is_neutral() {
        assert_eq!(Label::parse("LABEL_2"), Label::Neutral);
        assert_eq!(Label::parse(""), Label::Neutral);
    }

    #[test]
    fn test_from_stars_thresholds() {
        assert_eq!(Label::from_stars(5), Label::Positive);
        assert_eq!(Label::from_stars(4), Label::Positive);
        assert_eq!(Label::from_stars(3), Label::Neutral);
        assert_eq!(Label::from_stars(2), Label::Negative);
        assert_eq!(Label::from_stars(1), Label::Negative);
    }
}
