//! Chat Router - HTTP endpoints around one shared conversation
//!
//! Requests are serialised through a mutex so turns never interleave in
//! the history.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use coda_chat::ConversationService;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Chat service state
#[derive(Clone)]
pub struct ChatState {
    pub conversation: Arc<Mutex<ConversationService>>,
}

impl ChatState {
    pub fn new(conversation: ConversationService) -> Self {
        Self {
            conversation: Arc::new(Mutex::new(conversation)),
        }
    }
}

/// Create the chat router
pub fn create_router(state: ChatState) -> Router {
    Router::new()
        .route("/api/chat/message", post(message_handler))
        .route("/api/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(conversation: ConversationService, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("HTTP Server listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(ChatState::new(conversation))).await?;
    Ok(())
}

// === Handlers ===

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

async fn message_handler(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    if request.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "message must not be blank" })),
        )
            .into_response();
    }

    info!(len = request.message.len(), "POST /api/chat/message");
    let mut conversation = state.conversation.lock().await;
    match conversation.send_message(&request.message).await {
        Ok(response) => {
            info!(len = response.len(), "Response generated");
            Json(ChatResponse { response }).into_response()
        }
        Err(err) => {
            error!(error = %err, "Chat turn failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(state): State<ChatState>) -> impl IntoResponse {
    let conversation = state.conversation.lock().await;
    Json(json!({
        "status": "healthy",
        "service": "coda-agent",
        "version": env!("CARGO_PKG_VERSION"),
        "session_id": conversation.session_id(),
        "provider": conversation.provider_name(),
        "started_at": conversation.started_at().to_rfc3339(),
        "turns": conversation.history().len()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coda_chat::ConversationConfig;
    use coda_core::{Error, Result};
    use coda_llm::{ModelProvider, ModelRequest, ModelResponse};
    use serde_json::Value;
    use std::net::SocketAddr;

    struct CountingProvider;

    #[async_trait]
    impl ModelProvider for CountingProvider {
        async fn send_message(&self, request: ModelRequest) -> Result<ModelResponse> {
            let last = request.messages.last().map(|m| m.content.as_str()).unwrap_or("");
            if last == "boom" {
                return Err(Error::provider(
                    "counting",
                    std::io::Error::new(std::io::ErrorKind::Other, "upstream 500"),
                ));
            }
            Ok(ModelResponse::text(format!("turns={}", request.messages.len())))
        }

        fn provider_name(&self) -> &str {
            "counting"
        }

        fn model(&self) -> &str {
            "counting-1"
        }
    }

    async fn spawn_server() -> SocketAddr {
        let conversation =
            ConversationService::without_tools(Arc::new(CountingProvider), ConversationConfig::default());
        let router = create_router(ChatState::new(conversation));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    async fn post_message(addr: SocketAddr, message: &str) -> (u16, Value) {
        let response = reqwest::Client::new()
            .post(format!("http://{}/api/chat/message", addr))
            .json(&json!({ "message": message }))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_messages_share_one_conversation() {
        let addr = spawn_server().await;

        let (status, body) = post_message(addr, "hello").await;
        assert_eq!(status, 200);
        assert_eq!(body["response"], "turns=1");

        let (_, body) = post_message(addr, "again").await;
        assert_eq!(body["response"], "turns=3");
    }

    #[tokio::test]
    async fn test_failed_turn_is_bad_gateway() {
        let addr = spawn_server().await;
        let (status, body) = post_message(addr, "boom").await;
        assert_eq!(status, 502);
        assert!(body["error"].as_str().unwrap().contains("upstream 500"));
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let addr = spawn_server().await;
        let (status, _) = post_message(addr, "   ").await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn test_health() {
        let addr = spawn_server().await;
        let body: Value = reqwest::get(format!("http://{}/api/health", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["provider"], "counting");
        assert_eq!(body["turns"], 0);
        assert!(body["started_at"].as_str().unwrap().contains('T'));
    }
}
