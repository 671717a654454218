use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State as AxumState},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    database::{
        has_completed_purchase, reviews_for_buyer, reviews_for_product, upsert_audit,
        upsert_review,
    },
    error::AppError,
    models::{AnalysisStatus, Label, Review, ReviewSentiment, SentimentRecord},
    state::State,
};

const MIN_REVIEW_TEXT: usize = 5;

#[derive(Deserialize)]
pub struct StoreReview {
    pub product_id: u64,
    pub buyer_id: u64,
    pub review_text: String,
    pub rating: Option<u8>,
}

#[derive(Deserialize)]
pub struct BuyerQuery {
    pub buyer_id: u64,
}

#[derive(Serialize)]
pub struct ReviewsResponse {
    pub data: Vec<Review>,
    pub meta: ReviewMeta,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ReviewMeta {
    pub count: usize,
    pub avg_rating: f64,
    pub distribution: BTreeMap<u8, usize>,
    pub sentiment: SentimentCounts,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

/// Create or overwrite the caller's review of a product, classify its text
/// and persist the merged outcome. Classifier unavailability never fails
/// this request; only validation and the purchase gate do.
pub async fn store_review_handler(
    AxumState(state): AxumState<Arc<State>>,
    body: Bytes,
) -> Result<Json<Review>, AppError> {
    let payload = parse_store_review(&body)?;
    let text = payload.review_text.trim().to_string();
    validate(&text, payload.rating)?;

    let purchased = has_completed_purchase(
        state.redis_connection.clone(),
        payload.buyer_id,
        payload.product_id,
    )
    .await?;
    if !purchased {
        return Err(AppError::NotPurchased);
    }

    let mut review = Review {
        review_id: Review::id_for(payload.buyer_id, payload.product_id),
        product_id: payload.product_id,
        buyer_id: payload.buyer_id,
        review_text: text.clone(),
        rating: payload.rating.unwrap_or(3),
        sentiment: None,
        analysis_status: AnalysisStatus::Processing,
        updated_at: Utc::now(),
    };
    upsert_review(state.redis_connection.clone(), &review).await?;

    let analysis = state.classifier.classify(&text).await;

    let (rating, label) = merge_outcome(payload.rating, analysis.as_ref());
    review.rating = rating;
    review.sentiment = Some(label);
    review.analysis_status = AnalysisStatus::Done;
    review.updated_at = Utc::now();

    upsert_review(state.redis_connection.clone(), &review).await?;

    if analysis.is_some() {
        let record = SentimentRecord {
            review_id: review.review_id.clone(),
            category: label,
            model_version: state.classifier.model_version().to_string(),
            analyzed_at: review.updated_at,
        };
        upsert_audit(state.redis_connection.clone(), &record).await?;
    }

    Ok(Json(review))
}

pub async fn product_reviews_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(product_id): Path<u64>,
) -> Result<Json<ReviewsResponse>, AppError> {
    let reviews = reviews_for_product(state.redis_connection.clone(), product_id).await?;
    let meta = build_meta(&reviews);

    Ok(Json(ReviewsResponse {
        data: reviews,
        meta,
    }))
}

pub async fn my_reviews_handler(
    AxumState(state): AxumState<Arc<State>>,
    Query(query): Query<BuyerQuery>,
) -> Result<Json<Vec<Review>>, AppError> {
    let reviews = reviews_for_buyer(state.redis_connection.clone(), query.buyer_id).await?;

    Ok(Json(reviews))
}

fn parse_store_review(body: &[u8]) -> Result<StoreReview, AppError> {
    serde_json::from_slice(body).map_err(|_| AppError::MalformedPayload)
}

fn validate(text: &str, rating: Option<u8>) -> Result<(), AppError> {
    if text.chars().count() < MIN_REVIEW_TEXT {
        return Err(AppError::InvalidReview("review_text must be at least 5 characters"));
    }
    if let Some(rating) = rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::InvalidReview("rating must be between 1 and 5"));
        }
    }

    Ok(())
}

/// Decision table for the stored `(rating, sentiment)` pair.
///
/// | user rating | classifier | rating        | sentiment              |
/// |-------------|------------|---------------|------------------------|
/// | present     | ran        | user's        | classifier label       |
/// | present     | no text    | user's        | derived from rating    |
/// | absent      | ran        | classifier's  | classifier label       |
/// | absent      | no text    | 3             | neutral                |
///
/// "ran" includes the fallback outcome, whose label is neutral. The last
/// row is unreachable behind validation but kept total.
pub fn merge_outcome(
    user_rating: Option<u8>,
    analysis: Option<&ReviewSentiment>,
) -> (u8, Label) {
    match (user_rating, analysis) {
        (Some(rating), Some(sentiment)) => (rating, sentiment.label),
        (Some(rating), None) => (rating, Label::from_stars(rating)),
        (None, Some(sentiment)) => (sentiment.stars, sentiment.label),
        (None, None) => (3, Label::Neutral),
    }
}

fn build_meta(reviews: &[Review]) -> ReviewMeta {
    let count = reviews.len();

    let avg_rating = if count == 0 {
        0.0
    } else {
        let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
        (sum as f64 / count as f64 * 10.0).round() / 10.0
    };

    let mut distribution: BTreeMap<u8, usize> = (1..=5).map(|stars| (stars, 0)).collect();
    for review in reviews {
        *distribution.entry(review.rating).or_insert(0) += 1;
    }

    // Sentiment counts come from the stored rating, not the label, matching
    // the original listing endpoint.
    let sentiment = SentimentCounts {
        positive: reviews.iter().filter(|r| r.rating >= 4).count(),
        neutral: reviews.iter().filter(|r| r.rating == 3).count(),
        negative: reviews.iter().filter(|r| r.rating <= 2).count(),
    };

    ReviewMeta {
        count,
        avg_rating,
        distribution,
        sentiment,
    }
}
