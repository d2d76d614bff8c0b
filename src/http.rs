//! HTTP boundary over [`DeletionService`].

use std::net::SocketAddr;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::cascade::{
    BlockedReport, CascadeError, DeactivationOutcome, DeleteOptions, DeleteOutcome,
    DeletionReport, DeletionService, PreviewReport,
};
use crate::error::AppError;
use crate::graph::GraphDefinition;

#[derive(Clone)]
pub struct AppState {
    pub service: DeletionService,
}

pub fn build_router(service: DeletionService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/graph", get(graph))
        .route("/entities/:entity/:id", delete(delete_record))
        .route("/entities/:entity/:id/dependents", get(dependents))
        .route("/entities/:entity/:id/deactivate", post(deactivate))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

pub async fn serve(service: DeletionService, bind: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    tracing::info!(target: "asset_admin", event = "http_listen", addr = %listener.local_addr()?);
    axum::serve(listener, build_router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!(target: "asset_admin", event = "http_stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(target: "asset_admin", event = "signal_handler_failed", error = %err);
    }
}

#[derive(Debug)]
pub enum ApiError {
    Cascade(CascadeError),
    BadRequest(String),
}

impl From<CascadeError> for ApiError {
    fn from(err: CascadeError) -> Self {
        ApiError::Cascade(err)
    }
}

fn status_of(err: &CascadeError) -> StatusCode {
    match err {
        CascadeError::UnknownEntity(_) => StatusCode::BAD_REQUEST,
        CascadeError::NotFound { .. } => StatusCode::NOT_FOUND,
        CascadeError::BlockedByDependents { .. } | CascadeError::CascadeIncomplete { .. } => {
            StatusCode::CONFLICT
        }
        CascadeError::SoftDeleteUnsupported { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CascadeError::RootTableMissing(_)
        | CascadeError::Identifier(_)
        | CascadeError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Cascade(CascadeError::BlockedByDependents {
                entity,
                record_id,
                dependents,
                warnings,
            }) => (
                StatusCode::CONFLICT,
                Json(BlockedReport::new(&entity, &record_id, &dependents, &warnings)),
            )
                .into_response(),
            ApiError::Cascade(err) => {
                let status = status_of(&err);
                let kind = err.kind();
                if status.is_server_error() {
                    tracing::error!(target: "asset_admin", event = "http_error", error = %err);
                }
                let app = AppError::from(err);
                (
                    status,
                    Json(json!({
                        "error": kind,
                        "code": app.code,
                        "message": app.message,
                        "context": app.context,
                    })),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "BadRequest",
                    "code": "HTTP/BAD_REQUEST",
                    "message": message,
                    "context": {},
                })),
            )
                .into_response(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub cascade: bool,
    pub fallback: Option<String>,
}

impl DeleteParams {
    fn options(&self) -> Result<DeleteOptions, ApiError> {
        let soft_fallback = match self.fallback.as_deref() {
            None => false,
            Some("soft") => true,
            Some(other) => {
                return Err(ApiError::BadRequest(format!(
                    "unsupported fallback {other:?}; only \"soft\" is accepted"
                )))
            }
        };
        Ok(DeleteOptions {
            cascade: self.cascade,
            soft_fallback,
        })
    }
}

async fn health(State(state): State<AppState>) -> Response {
    let graph = state.service.graph();
    let db_ok = sqlx::query("SELECT 1")
        .execute(state.service.pool())
        .await
        .is_ok();
    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if db_ok { "ok" } else { "degraded" },
            "graphVersion": graph.version(),
            "entities": graph.len(),
        })),
    )
        .into_response()
}

async fn graph(State(state): State<AppState>) -> Json<GraphDefinition> {
    Json(state.service.graph().to_definition())
}

async fn delete_record(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let options = params.options()?;
    let outcome = state.service.delete(&entity, &id, options).await?;
    Ok(match outcome {
        DeleteOutcome::Deleted(summary) => Json(DeletionReport::from(&summary)).into_response(),
        DeleteOutcome::Deactivated(outcome) => Json(outcome).into_response(),
    })
}

async fn dependents(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> Result<Json<PreviewReport>, ApiError> {
    Ok(Json(state.service.preview(&entity, &id).await?))
}

async fn deactivate(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> Result<Json<DeactivationOutcome>, ApiError> {
    Ok(Json(state.service.deactivate(&entity, &id).await?))
}
