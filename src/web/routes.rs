use crate::error::AppError;
use crate::exchange::ExchangeEngine;
use crate::slack::RequestVerifier;
use axum::{
    body::Body,
    extract::{Form, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use secretmessage_types::{InteractionCallback, Message, SlashCommand};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Largest request body accepted from Slack
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state for all routes
#[derive(Clone, Debug)]
pub struct AppState {
    pub engine: ExchangeEngine,
    pub verifier: Arc<RequestVerifier>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Form body of `POST /interactive`
#[derive(Debug, Deserialize)]
pub struct InteractiveForm {
    pub payload: String,
}

/// Handler: POST /slash
pub async fn slash(State(state): State<AppState>, Form(command): Form<SlashCommand>) -> Json<Message> {
    Json(state.engine.handle_slash(&command).await)
}

/// Handler: POST /interactive
pub async fn interactive(
    State(state): State<AppState>,
    Form(form): Form<InteractiveForm>,
) -> Result<Json<Message>, AppError> {
    let callback: InteractionCallback = serde_json::from_str(&form.payload).map_err(|e| {
        warn!("Malformed interaction payload: {}", e);
        AppError::validation("malformed interaction payload")
    })?;
    Ok(Json(state.engine.handle_interaction(&callback).await))
}

/// Middleware: reject anything Slack did not sign before it reaches a
/// handler. The body is buffered so the handler can still read it.
pub async fn verify_slack_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return AppError::Authentication.into_response();
        }
    };

    if let Err(e) = state.verifier.verify(&parts.headers, &bytes) {
        warn!(path = %parts.uri.path(), "Rejected unsigned request: {}", e);
        return AppError::Authentication.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Create the web router
pub fn create_router(state: AppState) -> Router {
    let slack_routes = Router::new()
        .route("/slash", post(slash))
        .route("/interactive", post(interactive))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            verify_slack_request,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(slack_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
