//! HTTP request handlers

use super::types::{
    ConversationDetailResponse, ConversationRequest, ConversationResponse, ErrorResponse,
    HealthResponse,
};
use super::AppState;
use crate::debate::DebateError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/conversation", post(converse))
        .route("/conversation/:id", get(get_conversation))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.debate.storage_status().into(),
        llm_model: state.debate.model_id().to_string(),
    })
}

async fn converse(
    State(state): State<AppState>,
    body: Result<Json<ConversationRequest>, JsonRejection>,
) -> Result<Json<ConversationResponse>, AppError> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let message = request
        .message
        .ok_or_else(|| AppError::BadRequest("message is required".to_string()))?;

    let conversation = state
        .debate
        .converse(request.conversation_id.as_deref(), &message)
        .await?;

    Ok(Json(ConversationResponse::from(&conversation)))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetailResponse>, AppError> {
    let conversation = state.debate.conversation(&id).await?;
    Ok(Json(ConversationDetailResponse::from(&conversation)))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl From<DebateError> for AppError {
    fn from(e: DebateError) -> Self {
        match e {
            DebateError::EmptyMessage
            | DebateError::MessageTooLong
            | DebateError::InvalidConversationId(_) => AppError::BadRequest(e.to_string()),
            DebateError::ConversationNotFound(_) => AppError::NotFound(e.to_string()),
            DebateError::GenerationUnavailable(ref llm) => {
                tracing::warn!(
                    kind = ?llm.kind,
                    error = %llm.message,
                    "Generation backend unavailable"
                );
                AppError::Unavailable(e.to_string())
            }
            DebateError::Storage(_) | DebateError::Inconsistent(_) => {
                tracing::error!(error = %e, "Request failed");
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use crate::debate::DebateService;
    use crate::llm::LlmError;
    use crate::store::FallbackStore;
    use crate::testing::MockLlm;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with(llm: Arc<MockLlm>, store: FallbackStore) -> Router {
        create_router(AppState::new(DebateService::new(llm, Arc::new(store))))
    }

    fn app(llm: Arc<MockLlm>) -> Router {
        app_with(llm, FallbackStore::memory())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn post_json(app: &Router, body: Value) -> (StatusCode, Value) {
        let request = Request::post("/conversation")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    async fn get_path(app: &Router, path: &str) -> (StatusCode, Value) {
        send(app, Request::get(path).body(Body::empty()).unwrap()).await
    }

    #[tokio::test]
    async fn test_health_reports_storage() {
        let app = app(Arc::new(MockLlm::new()));
        let (status, body) = get_path(&app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["llm_model"], "mock");
        assert_eq!(
            body["storage"],
            json!({"configured": "memory", "active": "memory", "fallback": false})
        );
    }

    #[tokio::test]
    async fn test_health_reports_fallback() {
        let app = app_with(
            Arc::new(MockLlm::new()),
            FallbackStore::degraded(StorageBackend::Redis),
        );
        let (_, body) = get_path(&app, "/health").await;
        assert_eq!(
            body["storage"],
            json!({"configured": "redis", "active": "memory", "fallback": true})
        );
    }

    #[tokio::test]
    async fn test_first_message() {
        let app = app(Arc::new(MockLlm::new()));
        let (status, body) = post_json(
            &app,
            json!({"conversation_id": null, "message": "Pineapple belongs on pizza"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(!body["conversation_id"].as_str().unwrap().is_empty());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0],
            json!({"role": "user", "message": "Pineapple belongs on pizza"})
        );
        assert_eq!(messages[1]["role"], "bot");
        assert!(!messages[1]["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follow_up_and_fetch() {
        let app = app(Arc::new(MockLlm::new()));
        let (_, first) = post_json(&app, json!({"message": "Pineapple is great"})).await;
        let id = first["conversation_id"].as_str().unwrap().to_string();

        let (status, second) =
            post_json(&app, json!({"conversation_id": id, "message": "Really"})).await;
        assert_eq!(status, StatusCode::OK);
        let messages = second["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[..2], first["messages"].as_array().unwrap()[..]);

        let (status, detail) = get_path(&app, &format!("/conversation/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["topic"], "Pineapple on pizza");
        assert_eq!(detail["stance"], "Pineapple has no place on a pizza");
        assert_eq!(detail["messages"], second["messages"]);
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let app = app(Arc::new(MockLlm::new()));

        let (status, body) = post_json(&app, json!({"conversation_id": null})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "message is required");

        let (status, _) = post_json(&app, json!({"message": "   "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(&app, json!({"message": "x".repeat(1001)})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            post_json(&app, json!({"conversation_id": "nope", "message": "hi"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::post("/conversation")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_not_found() {
        let app = app(Arc::new(MockLlm::new()));
        let id = uuid::Uuid::new_v4().to_string();

        let (status, _) = post_json(&app, json!({"conversation_id": id, "message": "hi"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get_path(&app, &format!("/conversation/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generation_failure_is_unavailable() {
        let llm = Arc::new(MockLlm::new());
        let app = app(llm.clone());
        let (_, first) = post_json(&app, json!({"message": "Pineapple is great"})).await;
        let id = first["conversation_id"].as_str().unwrap().to_string();

        llm.queue_error(LlmError::network("connection refused"));
        let (status, body) =
            post_json(&app, json!({"conversation_id": id, "message": "Still great"})).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("unavailable"));

        let (_, detail) = get_path(&app, &format!("/conversation/{id}")).await;
        assert_eq!(detail["messages"], first["messages"]);
    }
}
