//! HTTP request handlers

use super::admission::admission_control;
use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, ConversationResponse, ErrorResponse, GateStatus, HealthResponse,
    SkillsResponse,
};
use super::AppState;
use crate::agent::{AgentError, AgentEvent};
use crate::gate::{AdmissionTicket, ConcurrencyGate};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Buffered events per streaming run
const EVENT_BUFFER: usize = 32;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Heavy endpoints (admission controlled)
        .route("/api/chat", post(chat))
        .route("/api/chat/stream", post(chat_stream))
        // Read-only endpoints
        .route("/api/conversations/:id", get(get_conversation))
        .route("/api/skills", get(list_skills))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_control,
        ))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let run = state.orchestrator.run(req.conversation_id, &req.message);

    let outcome = tokio::time::timeout(state.request_timeout, run)
        .await
        .map_err(|_| {
            tracing::warn!(
                timeout_secs = state.request_timeout.as_secs(),
                "Chat request timed out"
            );
            AppError::Timeout(format!(
                "LLM_PROVIDER_ERROR: provider unavailable — request timed out after {}s",
                state.request_timeout.as_secs()
            ))
        })?
        .map_err(|e| AppError::from_agent(&state, &e))?;

    Ok(Json(ChatResponse {
        conversation_id: outcome.conversation_id,
        response_text: outcome.response_text,
        usage: outcome.usage,
    }))
}

async fn chat_stream(
    State(state): State<AppState>,
    ticket: Option<Extension<AdmissionTicket>>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let cancel = CancellationToken::new();
    let on_disconnect = cancel.clone().drop_guard();

    tokio::spawn(async move {
        let run = state
            .orchestrator
            .run_streaming(req.conversation_id, &req.message, &tx);

        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("Client disconnected, cancelling streaming run");
            }
            result = tokio::time::timeout(state.request_timeout, run) => {
                if result.is_err() {
                    tracing::warn!(
                        timeout_secs = state.request_timeout.as_secs(),
                        "Streaming chat request timed out"
                    );
                    let _ = tx
                        .send(AgentEvent::Error {
                            message: format!(
                                "LLM_PROVIDER_ERROR: provider unavailable — request timed out after {}s",
                                state.request_timeout.as_secs()
                            ),
                        })
                        .await;
                }
            }
        }

        // Free the admission slot before the stream reports its end
        drop(ticket);
        drop(tx);
    });

    sse_stream(rx, on_disconnect).into_response()
}

// ============================================================
// Read-only endpoints
// ============================================================

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let turns = state
        .orchestrator
        .conversations()
        .snapshot(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("conversation '{id}' not found")))?;

    Ok(Json(ConversationResponse {
        conversation_id: id,
        turns,
    }))
}

async fn list_skills(State(state): State<AppState>) -> Json<SkillsResponse> {
    Json(SkillsResponse {
        skills: state.orchestrator.skills().list(),
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    fn status(gate: &ConcurrencyGate) -> GateStatus {
        GateStatus {
            capacity: gate.capacity(),
            in_use: gate.in_use(),
        }
    }

    Json(HealthResponse {
        status: "ok",
        model: state.orchestrator.model_id().to_string(),
        provider_gate: status(state.orchestrator.provider_gate()),
        admission_gate: status(state.admission.gate()),
    })
}

// ============================================================
// Error Handling
// ============================================================

/// Handler failure; every message is already in `<CODE>: <detail>` form
/// except `BadRequest` and `NotFound`
#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Timeout(String),
    Internal(String),
}

impl AppError {
    fn from_agent(state: &AppState, error: &AgentError) -> Self {
        match error {
            AgentError::EmptyMessage => AppError::BadRequest(error.to_string()),
            AgentError::Provider(_) => AppError::BadGateway(state.orchestrator.classify(error)),
            AgentError::RoundLimitExceeded(_) | AgentError::Gate(_) => {
                AppError::Internal(state.orchestrator.classify(error))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
