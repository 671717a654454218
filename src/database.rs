//! # Redis
//!
//! RAM database backing the review workflow.
//!
//! ## Layout
//!
//! - `reviews:{product_id}` hash: field `{buyer_id}`, value JSON review.
//!   One review per buyer per product falls out of the hash key, and
//!   re-submitting overwrites in place.
//! - `buyer_reviews:{buyer_id}` hash: field `{product_id}`, value JSON
//!   review. Second index for the "my reviews" listing; written together
//!   with the product hash.
//! - `sentiment_audit` hash: field review id, value JSON audit record.
//!   One record per review id, latest analysis wins. HSET is a plain
//!   overwrite, so out-of-order concurrent completions for the same review
//!   resolve to last write, which is the behavior we want.
//! - `purchases:{buyer_id}` set of product ids with a completed
//!   transaction. Populated by the transaction subsystem; read here only
//!   to gate review eligibility.

use std::time::Duration;

use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};

use crate::{
    error::AppError,
    models::{Review, SentimentRecord},
};

const AUDIT_KEY: &str = "sentiment_audit";

pub async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).unwrap();
    let connection_manager = client
        .get_connection_manager_with_config(config)
        .await
        .unwrap();

    connection_manager
}

pub async fn has_completed_purchase(
    mut conn: ConnectionManager,
    buyer_id: u64,
    product_id: u64,
) -> Result<bool, AppError> {
    let purchased: bool = conn
        .sismember(format!("purchases:{buyer_id}"), product_id)
        .await?;

    Ok(purchased)
}

pub async fn upsert_review(mut conn: ConnectionManager, review: &Review) -> Result<(), AppError> {
    let json = serde_json::to_string(review)?;

    let _: () = conn
        .hset(
            format!("reviews:{}", review.product_id),
            review.buyer_id,
            &json,
        )
        .await?;
    let _: () = conn
        .hset(
            format!("buyer_reviews:{}", review.buyer_id),
            review.product_id,
            &json,
        )
        .await?;

    Ok(())
}

pub async fn upsert_audit(
    mut conn: ConnectionManager,
    record: &SentimentRecord,
) -> Result<(), AppError> {
    let json = serde_json::to_string(record)?;

    let _: () = conn.hset(AUDIT_KEY, &record.review_id, json).await?;

    Ok(())
}

pub async fn reviews_for_product(
    conn: ConnectionManager,
    product_id: u64,
) -> Result<Vec<Review>, AppError> {
    load_reviews(conn, format!("reviews:{product_id}")).await
}

pub async fn reviews_for_buyer(
    conn: ConnectionManager,
    buyer_id: u64,
) -> Result<Vec<Review>, AppError> {
    load_reviews(conn, format!("buyer_reviews:{buyer_id}")).await
}

async fn load_reviews(mut conn: ConnectionManager, key: String) -> Result<Vec<Review>, AppError> {
    let raw: Vec<String> = conn.hvals(key).await?;

    let mut reviews = raw
        .iter()
        .map(|json| serde_json::from_str(json))
        .collect::<Result<Vec<Review>, _>>()?;

    // Latest first, matching the original listing order.
    reviews.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    Ok(reviews)
}
