//! Countersign API server
//!
//! HTTP surface over the approval workflow: document lifecycle, reviewer
//! chain transitions, placement editing, and final-artifact composition.

mod error;
mod handlers;
mod models;
mod state;
mod storage;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "countersign_api=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = Arc::new(AppState::new().await?);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/blobs", post(handlers::upload_blob))
        .route("/api/blobs/:id", get(handlers::get_blob))
        .route("/api/documents", post(handlers::create_document))
        .route("/api/documents/:id", get(handlers::get_document))
        .route(
            "/api/documents/:id/placements",
            put(handlers::set_placements),
        )
        .route(
            "/api/documents/:id/revision",
            post(handlers::upload_revision),
        )
        .route("/api/documents/:id/submit", post(handlers::submit))
        .route("/api/documents/:id/approve", post(handlers::approve_review))
        .route("/api/documents/:id/reject", post(handlers::reject_review))
        .route("/api/documents/:id/reassign", post(handlers::reassign))
        .route(
            "/api/documents/:id/final-approve",
            post(handlers::final_approve),
        )
        .route("/api/documents/:id/resubmit", post(handlers::resubmit))
        .route("/api/documents/:id/comments", post(handlers::add_comment))
        .route("/api/documents/:id/history", get(handlers::get_history))
        .route("/api/documents/:id/overlay", get(handlers::get_overlay))
        .route("/api/documents/:id/artifact", get(handlers::get_artifact))
        .route(
            "/api/queues/awaiting/:actor_id",
            get(handlers::queue_awaiting),
        )
        .route(
            "/api/queues/rejected/:author_id",
            get(handlers::queue_rejected),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("Countersign API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
