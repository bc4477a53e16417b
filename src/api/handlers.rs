//! HTTP request handlers

use super::types::{
    AckResponse, ChatMessageRequest, ErrorResponse, RenameRequest, SystemInfoResponse,
};
use super::AppState;
use crate::db::{Conversation, DbError, Message};
use crate::runtime::{SessionStore, TurnError};
use crate::state_machine::{FailureKind, TurnOutcome};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat turns
        .route("/api/chat_message", post(chat_message))
        // Conversation management
        .route("/api/conversations", get(list_conversations))
        .route(
            "/api/conversations/:id",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/api/conversations/:id/name", put(rename_conversation))
        .route(
            "/api/conversations/:id/messages",
            get(list_messages).delete(clear_messages),
        )
        // Model info
        .route("/api/system_info", get(system_info))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn chat_message(
    State(state): State<AppState>,
    payload: Result<Json<ChatMessageRequest>, JsonRejection>,
) -> Result<Json<TurnOutcome>, AppError> {
    let Json(req) = payload?;
    let outcome = state
        .orchestrator
        .run_turn(req.conversation_id, req.question)
        .await?;
    Ok(Json(outcome))
}

// ============================================================
// Conversations
// ============================================================

async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let conversations = state.orchestrator.store().list_sessions().await?;
    Ok(Json(conversations))
}

async fn get_conversation(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Conversation>, AppError> {
    let Path(id) = id?;
    let conversation = state.orchestrator.store().get_session(id).await?;
    Ok(Json(conversation))
}

async fn rename_conversation(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<Conversation>, AppError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name must not be empty".to_string()));
    }

    let conversation = state.orchestrator.store().rename(id, name).await?;
    Ok(Json(conversation))
}

async fn delete_conversation(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<AckResponse>, AppError> {
    let Path(id) = id?;
    state.orchestrator.store().delete_session(id).await?;
    Ok(Json(AckResponse::new(format!("Conversation {id} deleted"))))
}

// ============================================================
// Messages
// ============================================================

async fn list_messages(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Message>>, AppError> {
    let Path(id) = id?;
    let turns = state.orchestrator.store().list_turns(id).await?;
    Ok(Json(turns))
}

async fn clear_messages(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<AckResponse>, AppError> {
    let Path(id) = id?;
    let removed = state.orchestrator.store().clear_turns(id).await?;
    Ok(Json(AckResponse::new(format!(
        "Deleted {removed} messages from conversation {id}"
    ))))
}

// ============================================================
// System info
// ============================================================

async fn system_info(State(state): State<AppState>) -> Json<SystemInfoResponse> {
    Json(SystemInfoResponse {
        model: state.orchestrator.model_id().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::ConversationNotFound(_) => AppError::NotFound(e.to_string()),
            DbError::Sqlite(_) | DbError::Transaction(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<TurnError> for AppError {
    fn from(e: TurnError) -> Self {
        match e.kind {
            FailureKind::BadRequest => AppError::BadRequest(e.message),
            FailureKind::SessionNotFound => AppError::NotFound(e.message),
            FailureKind::NamingFailed
            | FailureKind::CompletionFailed
            | FailureKind::PersistenceFailed
            | FailureKind::InvariantViolation => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
