//! # Emotix Server
//!
//! Review backend for the Emotix marketplace. Buyers who completed a
//! purchase can review the product; every review text is pushed through a
//! sentiment-classification pipeline that blends an external ML inference
//! call with deterministic keyword corrections and degrades to a neutral
//! fallback when the inference service is unavailable.
//!
//!
//!
//! # General Infrastructure
//! - Axum HTTP server fronting the review workflow
//! - Redis holds reviews, the per-review sentiment audit record, and the
//!   completed-purchase sets written by the transaction subsystem
//! - Hugging Face style inference endpoint for text classification,
//!   configured through environment variables and docker secrets
//!
//!
//!
//! # Notes
//!
//! ## Why rules on top of the model
//! The upstream classifier is overconfident on moderate scores and misses
//! marketplace-specific phrasing ("belum dicoba" is not a complaint,
//! "penipu" is fatal regardless of score). The star thresholds only hand
//! out 1 or 5 stars at very high confidence, and an ordered keyword pass
//! corrects the known misclassifications afterwards. See [`sentiment`] and
//! [`rules`].
//!
//! ## Degradation
//! The classifier never fails a review submission. Inference being down
//! means a neutral 3-star analysis with confidence 0, not an error.

use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};

use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod routes;
pub mod rules;
pub mod sentiment;
pub mod state;

use routes::{my_reviews_handler, product_reviews_handler, store_review_handler};
use state::State;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/reviews", post(store_review_handler))
        .route("/reviews/me", get(my_reviews_handler))
        .route("/products/{product_id}/reviews", get(product_reviews_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
