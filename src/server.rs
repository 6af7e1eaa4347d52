//! HTTP surface over the record store.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::models::{GradeStats, Learner};
use crate::stats;
use crate::store::RecordStore;
use crate::validity;

pub const FALLBACK_MESSAGE: &str = "Seems like we messed up somewhere...";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,
    #[error("Internal Server Error")]
    Store(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::Store(err) => {
                tracing::error!(error = ?err, "store query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

fn fallback_error(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, FALLBACK_MESSAGE).into_response()
}

/// Lists learner records failing any validity rule.
///
/// Responds 204 with the records as a body.
pub async fn invalid_learners_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<Learner>>), ApiError> {
    let learners = state.store.learners().await?;
    let invalid = validity::find_invalid(&learners);
    info!(scanned = learners.len(), invalid = invalid.len(), "checked learner records");
    Ok((StatusCode::NO_CONTENT, Json(invalid)))
}

pub async fn global_stats_handler(State(state): State<AppState>) -> Result<Json<GradeStats>, ApiError> {
    let grades = state.store.grades().await?;
    stats::global_stats(&grades).map(Json).ok_or(ApiError::NotFound)
}

pub async fn class_stats_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GradeStats>, ApiError> {
    let Some(class_id) = stats::coerce_class_id(&id) else {
        return Err(ApiError::NotFound);
    };

    let grades = state.store.class_grades(class_id).await?;
    stats::class_stats(&grades).map(Json).ok_or(ApiError::NotFound)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(invalid_learners_handler))
        .route("/grades/stats", get(global_stats_handler))
        .route("/grades/stats/{id}", get(class_stats_handler))
        .layer(CatchPanicLayer::custom(fallback_error))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Server is running on port: {}", port);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
