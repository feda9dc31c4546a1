use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use nunzio_agent::MessageHandler;
use nunzio_core::domain::workout::UserId;
use nunzio_core::errors::InterfaceError;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct MessagesState {
    handler: MessageHandler,
    /// Empty means every user id is accepted.
    allowed_user_ids: Arc<HashSet<String>>,
}

impl MessagesState {
    pub fn new(handler: MessageHandler, allowed_user_ids: &[String]) -> Self {
        let allowed = allowed_user_ids.iter().map(|id| id.trim().to_string()).collect();
        Self { handler, allowed_user_ids: Arc::new(allowed) }
    }

    fn is_allowed(&self, user_id: &str) -> bool {
        self.allowed_user_ids.is_empty() || self.allowed_user_ids.contains(user_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub user_id: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_message().to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: MessagesState) -> Router {
    Router::new().route("/v1/messages", post(post_message)).with_state(state)
}

/// Thin adapter: the handler never fails, so only request-level problems
/// become error responses.
pub async fn post_message(
    State(state): State<MessagesState>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = request.user_id.trim();
    let text = request.text.trim();

    if user_id.is_empty() || text.is_empty() {
        return Err(ApiError(InterfaceError::BadRequest {
            message: "user_id and text are required".to_string(),
            correlation_id: Uuid::new_v4().to_string(),
        }));
    }

    if !state.is_allowed(user_id) {
        let correlation_id = Uuid::new_v4().to_string();
        warn!(
            event_name = "server.message.forbidden",
            correlation_id = %correlation_id,
            user_id = %user_id,
            "message from user outside the allow-list"
        );
        return Err(ApiError(InterfaceError::Forbidden {
            message: format!("user `{user_id}` is not allowed"),
            correlation_id,
        }));
    }

    let response = state.handler.process(text, &UserId::new(user_id), false).await;
    Ok(Json(MessageResponse { response }))
}
