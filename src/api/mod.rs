// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP surface
//!
//! Thin axum layer over [`RagService`]: one ask endpoint and a health
//! endpoint. Callers always get well-formed JSON, either an answer with
//! sources or `{"error": ...}`, never a stack trace or a hung connection
//! (the completion call underneath is time-bounded).

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::generation::GenerationError;
use crate::service::{RagService, RagError};
use crate::version;

#[derive(Clone)]
struct AppState {
    service: Arc<RagService>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
    state: &'static str,
    indexed_counties: usize,
}

/// Build the application router
pub fn router(service: Arc<RagService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ask", post(ask_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// Bind and serve until ctrl-c
pub async fn serve(service: Arc<RagService>, listen_addr: &str) -> anyhow::Result<()> {
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("Listening on {}", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running",
        version: version::VERSION_NUMBER.to_string(),
        state: state.service.state().await.as_str(),
        indexed_counties: state.service.indexed_count().await,
    })
}

async fn ask_handler(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> impl IntoResponse {
    match state.service.ask(&request.query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => {
            warn!("ask failed [{}]: {}", err.error_code(), err);
            let status = match &err {
                RagError::EmptyQuery => StatusCode::BAD_REQUEST,
                RagError::Generation(GenerationError::MissingCredential) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                RagError::Generation(GenerationError::Timeout { .. }) => {
                    StatusCode::GATEWAY_TIMEOUT
                }
                RagError::Generation(_) => StatusCode::BAD_GATEWAY,
                RagError::Embedding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ErrorResponse {
                    error: err.user_message(),
                }),
            )
                .into_response()
        }
    }
}
