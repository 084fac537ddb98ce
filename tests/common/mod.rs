#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub fn valid_key() -> String {
    format!("gsk_{}", "Zx9".repeat(16))
}

pub fn question_json(correct: &str) -> String {
    json!({
        "question": "Which nerve supplies the deltoid muscle?",
        "options": ["A) Axillary", "B) Radial", "C) Median", "D) Ulnar"],
        "correctAnswer": correct,
        "explanation": "The axillary nerve (C5, C6) supplies deltoid and teres minor.",
        "subject": "Anatomy"
    })
    .to_string()
}

/// What the stub answers to the next chat completion.
pub enum Reply {
    /// A well formed completion whose message content is this string.
    Content(String),
    /// A raw JSON body.
    Body(Value),
    Status(StatusCode),
}

pub struct StubState {
    models_status: Mutex<StatusCode>,
    replies: Mutex<VecDeque<Reply>>,
    completions: AtomicUsize,
    model_checks: AtomicUsize,
    last_request: Mutex<Option<(String, Value)>>,
}

/// OpenAI compatible provider served on an ephemeral local port.
#[derive(Clone)]
pub struct StubProvider {
    pub base_url: String,
    state: Arc<StubState>,
}

impl StubProvider {
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState {
            models_status: Mutex::new(StatusCode::OK),
            replies: Mutex::new(VecDeque::new()),
            completions: AtomicUsize::new(0),
            model_checks: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        });
        let app = Router::new()
            .route("/v1/models", get(models))
            .route("/v1/chat/completions", post(completions))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub provider");
        let addr = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub provider");
        });

        Self {
            base_url: format!("http://{addr}/v1"),
            state,
        }
    }

    pub fn reject_keys(&self) {
        *self.state.models_status.lock().unwrap() = StatusCode::UNAUTHORIZED;
    }

    pub fn push(&self, reply: Reply) {
        self.state.replies.lock().unwrap().push_back(reply);
    }

    pub fn completions(&self) -> usize {
        self.state.completions.load(Ordering::SeqCst)
    }

    pub fn model_checks(&self) -> usize {
        self.state.model_checks.load(Ordering::SeqCst)
    }

    /// Authorization header and JSON body of the last completion request.
    pub fn last_request(&self) -> Option<(String, Value)> {
        self.state.last_request.lock().unwrap().clone()
    }
}

async fn models(State(state): State<Arc<StubState>>) -> Response {
    state.model_checks.fetch_add(1, Ordering::SeqCst);
    let status = *state.models_status.lock().unwrap();
    if status.is_success() {
        Json(json!({ "object": "list", "data": [{ "id": "mixtral-8x7b-32768" }] })).into_response()
    } else {
        (status, Json(json!({ "error": { "message": "Invalid API Key" } }))).into_response()
    }
}

async fn completions(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.completions.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *state.last_request.lock().unwrap() = Some((auth, body));

    let reply = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Reply::Content(question_json("A")));
    match reply {
        Reply::Content(content) => Json(json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        }))
        .into_response(),
        Reply::Body(body) => Json(body).into_response(),
        Reply::Status(status) => (status, "upstream failure").into_response(),
    }
}
