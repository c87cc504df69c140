//! JSON API for chat sessions.
//!
//! Each session id maps to its own conversation memory. A chat request
//! locks that session for the whole turn, so a session answers one message
//! at a time while other sessions proceed independently.

use crate::SharedState;
use axum::{
    Json, Router,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    routing::{get, post},
};
use paperchat_agent::{AssemblyError, TurnError, TurnInput};
use paperchat_core::{Attachment, Exchange, SessionId};
use paperchat_memory::MemoryStats;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Build the `/v1` router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/sessions", post(create_session_handler))
        .route("/sessions/{id}", axum::routing::delete(delete_session_handler))
        .route(
            "/sessions/{id}/history",
            get(history_handler).put(import_history_handler),
        )
        .route("/sessions/{id}/memory", get(memory_handler))
        .route("/sessions/{id}/clear", post(clear_handler))
        .with_state(state)
}

// ── Request / response types ──────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    /// Source name of the document used for this turn
    pub document: Option<String>,
    pub warnings: Vec<String>,
    pub memory: MemoryStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub memory: MemoryStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub exchanges: Vec<Exchange>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportHistoryRequest {
    pub exchanges: Vec<Exchange>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// "invalid_input", "transient", "fatal" or "not_found"
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryStats>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, kind: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            kind: kind.into(),
            memory: None,
        }),
    )
}

fn not_found(id: &SessionId) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("Session {id} not found"),
    )
}

/// 413 when the body limit was hit, 400 for any other broken form.
fn form_error(err: MultipartError) -> ApiError {
    let status = err.status();
    let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
        format!("Upload rejected: {}", err.body_text())
    } else {
        format!("Malformed form data: {}", err.body_text())
    };
    api_error(status, "invalid_input", error)
}

fn turn_error_response(err: &TurnError, memory: Option<MemoryStats>) -> ApiError {
    let (status, kind) = match err {
        TurnError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        TurnError::Backend(e) if e.is_transient() => (StatusCode::SERVICE_UNAVAILABLE, "transient"),
        TurnError::Backend(_) => (StatusCode::BAD_GATEWAY, "fatal"),
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: kind.into(),
            memory,
        }),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// Multipart fields: `message` (required), `session_id`, `file`.
async fn chat_handler(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<ChatResponse>, ApiError> {
    let mut session_id: Option<String> = None;
    let mut message = String::new();
    let mut attachment: Option<Attachment> = None;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "session_id" => {
                let value = field.text().await.unwrap_or_default();
                if !value.trim().is_empty() {
                    session_id = Some(value.trim().to_string());
                }
            }
            "message" => {
                message = field.text().await.map_err(form_error)?;
            }
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(form_error)?;
                // Browsers send an empty part when no file was chosen
                if !file_name.is_empty() && !bytes.is_empty() {
                    attachment = Some(Attachment::new(file_name, bytes.to_vec()));
                }
            }
            other => warn!(field = other, "Ignoring unknown form field"),
        }
    }

    let id = session_id.map_or_else(SessionId::new, SessionId::from);
    info!(
        session = %id,
        message_chars = message.chars().count(),
        attachment = attachment.as_ref().map(|a| a.file_name.as_str()),
        "v1/chat request"
    );

    // Rejected input must not create a session: a new one can evict another
    if message.trim().is_empty() {
        let stats = match state.sessions.get(&id).await {
            Some(memory) => Some(memory.lock().await.stats()),
            None => None,
        };
        let err = TurnError::from(AssemblyError::EmptyUserMessage);
        return Err(turn_error_response(&err, stats));
    }

    let memory = state.sessions.get_or_create(&id).await;
    let mut memory = memory.lock().await;

    let input = TurnInput {
        message,
        attachment,
    };

    match state.engine.handle_turn(&mut memory, input).await {
        Ok(outcome) => Ok(Json(ChatResponse {
            session_id: id.to_string(),
            reply: outcome.reply,
            document: outcome.document,
            warnings: outcome.warnings,
            memory: outcome.stats,
        })),
        Err(e) => {
            error!(session = %id, error = %e, "Turn failed");
            Err(turn_error_response(&e, Some(memory.stats())))
        }
    }
}

async fn create_session_handler(
    State(state): State<SharedState>,
) -> (StatusCode, Json<SessionResponse>) {
    let id = SessionId::new();
    let memory = state.sessions.get_or_create(&id).await;
    let stats = memory.lock().await.stats();
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: id.to_string(),
            memory: stats,
        }),
    )
}

async fn history_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let id = SessionId(id);
    let memory = state.sessions.get(&id).await.ok_or_else(|| not_found(&id))?;
    let exchanges = memory.lock().await.export();
    Ok(Json(HistoryResponse {
        session_id: id.to_string(),
        exchanges,
    }))
}

async fn import_history_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ImportHistoryRequest>,
) -> Json<SessionResponse> {
    let id = SessionId(id);
    let memory = state.sessions.get_or_create(&id).await;
    let mut memory = memory.lock().await;
    memory.import(payload.exchanges);
    info!(session = %id, kept = memory.size(), "Imported history");
    Json(SessionResponse {
        session_id: id.to_string(),
        memory: memory.stats(),
    })
}

async fn memory_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = SessionId(id);
    let memory = state.sessions.get(&id).await.ok_or_else(|| not_found(&id))?;
    let stats = memory.lock().await.stats();
    Ok(Json(SessionResponse {
        session_id: id.to_string(),
        memory: stats,
    }))
}

async fn clear_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = SessionId(id);
    let memory = state.sessions.get(&id).await.ok_or_else(|| not_found(&id))?;
    let mut memory = memory.lock().await;
    memory.clear();
    info!(session = %id, "Cleared conversation memory");
    Ok(Json(SessionResponse {
        session_id: id.to_string(),
        memory: memory.stats(),
    }))
}

async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = SessionId(id);
    if state.sessions.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GatewayState;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use paperchat_agent::ChatEngine;
    use paperchat_core::{
        BackendError, GenerationBackend, GenerationRequest, GenerationResponse, Role,
    };
    use paperchat_documents::DocumentReader;
    use paperchat_memory::SessionStore;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "paperchat-test-boundary";

    /// Echoes the last line of the prompt back.
    struct MockBackend;

    #[async_trait::async_trait]
    impl GenerationBackend for MockBackend {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, BackendError> {
            let last = request.prompt.lines().last().unwrap_or_default().to_string();
            Ok(GenerationResponse {
                text: format!("echo: {last}"),
                usage: None,
                model: "mock-model".into(),
            })
        }
    }

    struct DownBackend(BackendError);

    #[async_trait::async_trait]
    impl GenerationBackend for DownBackend {
        fn name(&self) -> &str {
            "down"
        }

        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, BackendError> {
            Err(self.0.clone())
        }
    }

    fn state_with(backend: Arc<dyn GenerationBackend>) -> SharedState {
        let engine = ChatEngine::new(backend, Arc::new(DocumentReader::new()), "mock-model", "SYS");
        Arc::new(GatewayState::new(engine, SessionStore::new(4, 10), 1024 * 1024))
    }

    fn test_state() -> SharedState {
        state_with(Arc::new(MockBackend))
    }

    /// Build a multipart body from text fields and an optional file.
    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn chat_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn chat_creates_session_and_replies() {
        let app = v1_router(test_state());

        let response = app
            .oneshot(chat_request(multipart_body(&[("message", "Hello")], None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let chat: ChatResponse = json(response).await;
        assert!(!chat.session_id.is_empty());
        assert_eq!(chat.reply, "echo: User: Hello");
        assert_eq!(chat.memory.current_messages, 2);
        assert_eq!(chat.memory.max_messages, 4);
    }

    #[tokio::test]
    async fn chat_continues_existing_session() {
        let state = test_state();

        for msg in ["one", "two", "three"] {
            let app = v1_router(state.clone());
            let body = multipart_body(&[("session_id", "s1"), ("message", msg)], None);
            let response = app.oneshot(chat_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let memory = state.sessions.get(&SessionId::from("s1")).await.unwrap();
        let memory = memory.lock().await;
        // Capacity 4: the first pair was evicted
        assert_eq!(memory.size(), 4);
        assert_eq!(memory.get_all()[0].text(), "two");
    }

    #[tokio::test]
    async fn chat_with_text_attachment_reports_document() {
        let app = v1_router(test_state());
        let body = multipart_body(
            &[("message", "Summarize")],
            Some(("notes.txt", b"The meeting moved to Tuesday.")),
        );

        let response = app.oneshot(chat_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let chat: ChatResponse = json(response).await;
        assert_eq!(chat.document.as_deref(), Some("notes.txt"));
        assert!(chat.warnings.is_empty());
    }

    #[tokio::test]
    async fn unsupported_attachment_is_a_warning() {
        let app = v1_router(test_state());
        let body = multipart_body(&[("message", "Look")], Some(("photo.png", b"\x89PNG")));

        let response = app.oneshot(chat_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let chat: ChatResponse = json(response).await;
        assert!(chat.document.is_none());
        assert_eq!(chat.warnings.len(), 1);
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let app = v1_router(test_state());
        let response = app
            .oneshot(chat_request(multipart_body(&[("message", "  ")], None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let err: ErrorResponse = json(response).await;
        assert_eq!(err.kind, "invalid_input");
        assert!(err.memory.is_none());
    }

    #[tokio::test]
    async fn rejected_message_does_not_evict_live_session() {
        let engine = ChatEngine::new(
            Arc::new(MockBackend),
            Arc::new(DocumentReader::new()),
            "mock-model",
            "SYS",
        );
        let state = Arc::new(GatewayState::new(engine, SessionStore::new(4, 1), 1024));
        let live = SessionId::from("live");
        state
            .sessions
            .get_or_create(&live)
            .await
            .lock()
            .await
            .append(Exchange::user("keep me"));

        let response = v1_router(state.clone())
            .oneshot(chat_request(multipart_body(&[("message", " ")], None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(state.sessions.len().await, 1);
        let memory = state.sessions.get(&live).await.unwrap();
        assert_eq!(memory.lock().await.size(), 1);
    }

    #[tokio::test]
    async fn empty_message_on_known_session_reports_its_memory() {
        let state = test_state();
        let body = multipart_body(&[("session_id", "k1"), ("message", "first")], None);
        v1_router(state.clone()).oneshot(chat_request(body)).await.unwrap();

        let body = multipart_body(&[("session_id", "k1"), ("message", "")], None);
        let response = v1_router(state).oneshot(chat_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let err: ErrorResponse = json(response).await;
        assert_eq!(err.memory.unwrap().current_messages, 2);
    }

    #[tokio::test]
    async fn truncated_form_is_bad_request_not_too_large() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cut.txt\"\r\n\r\npartial conte"
        );
        let response = v1_router(test_state())
            .oneshot(chat_request(body.into_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let err: ErrorResponse = json(response).await;
        assert_eq!(err.kind, "invalid_input");
    }

    #[tokio::test]
    async fn transient_backend_error_is_503_and_memory_untouched() {
        let state = state_with(Arc::new(DownBackend(BackendError::RateLimited {
            retry_after_secs: 5,
        })));
        let app = v1_router(state.clone());

        let body = multipart_body(&[("session_id", "busy"), ("message", "hi")], None);
        let response = app.oneshot(chat_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ErrorResponse = json(response).await;
        assert_eq!(err.kind, "transient");
        assert_eq!(err.memory.unwrap().current_messages, 0);
    }

    #[tokio::test]
    async fn fatal_backend_error_is_502() {
        let app = v1_router(state_with(Arc::new(DownBackend(
            BackendError::AuthenticationFailed("bad key".into()),
        ))));
        let response = app
            .oneshot(chat_request(multipart_body(&[("message", "hi")], None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let err: ErrorResponse = json(response).await;
        assert_eq!(err.kind, "fatal");
    }

    #[tokio::test]
    async fn create_session_then_inspect_memory() {
        let state = test_state();

        let response = v1_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: SessionResponse = json(response).await;
        assert_eq!(created.memory.remaining_capacity, 4);

        let response = v1_router(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/sessions/{}/memory", created.session_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        for uri in ["/sessions/nope/history", "/sessions/nope/memory"] {
            let response = v1_router(test_state())
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn import_history_then_read_it_back() {
        let state = test_state();
        let payload = serde_json::json!({
            "exchanges": [
                {"role": "user", "text": "a"},
                {"role": "assistant", "text": "b"},
                {"role": "user", "text": "c"},
                {"role": "assistant", "text": "d"},
                {"role": "user", "text": "e"},
                {"role": "assistant", "text": "f"}
            ]
        });

        let response = v1_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/sessions/imported/history")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let imported: SessionResponse = json(response).await;
        assert_eq!(imported.memory.current_messages, 4);

        let response = v1_router(state)
            .oneshot(
                Request::builder()
                    .uri("/sessions/imported/history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let history: HistoryResponse = json(response).await;
        let texts: Vec<&str> = history.exchanges.iter().map(|e| e.text()).collect();
        assert_eq!(texts, vec!["c", "d", "e", "f"]);
        assert_eq!(history.exchanges[0].role(), Role::User);
    }

    #[tokio::test]
    async fn clear_empties_session_memory() {
        let state = test_state();
        let body = multipart_body(&[("session_id", "c1"), ("message", "remember me")], None);
        v1_router(state.clone())
            .oneshot(chat_request(body))
            .await
            .unwrap();

        let response = v1_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sessions/c1/clear")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cleared: SessionResponse = json(response).await;
        assert_eq!(cleared.memory.current_messages, 0);
        assert!(state.sessions.get(&SessionId::from("c1")).await.is_some());
    }

    #[tokio::test]
    async fn delete_session() {
        let state = test_state();
        state.sessions.get_or_create(&SessionId::from("d1")).await;

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri("/sessions/d1")
                .body(Body::empty())
                .unwrap()
        };

        let response = v1_router(state.clone()).oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = v1_router(state).oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
