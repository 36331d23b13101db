//! Local stand-in for the inference backend.
//!
//! Serves `GET /health` and `POST /chat` (multipart) with canned replies, plus
//! optional latency and failure injection for exercising the client's retry,
//! cooldown and health paths by hand.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(name = "mock-backend")]
#[command(about = "Mock chat backend for local testing", long_about = None)]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8001")]
    bind: SocketAddr,

    /// Answer every Nth chat request with 503 (0 disables).
    #[arg(long, default_value_t = 0)]
    fail_every: u64,

    /// Delay added to every chat reply.
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Report unhealthy on /health.
    #[arg(long)]
    unhealthy: bool,
}

#[derive(Clone)]
struct AppState {
    fail_every: u64,
    latency: Duration,
    unhealthy: bool,
    requests: Arc<AtomicU64>,
    sessions: Arc<Mutex<HashMap<String, usize>>>,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (status, Json(json!({ "detail": detail.into() })))
}

#[derive(Debug, Default)]
struct ChatForm {
    message: Option<String>,
    kind: Option<String>,
    session_id: Option<String>,
    user_id: Option<String>,
    username: Option<String>,
    audio: Option<(Option<String>, usize)>,
}

async fn read_form(mut multipart: Multipart) -> Result<ChatForm, ApiError> {
    let bad = |e: axum::extract::multipart::MultipartError| {
        api_error(StatusCode::BAD_REQUEST, format!("invalid multipart body: {}", e))
    };
    let mut form = ChatForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad)?;
                form.audio = Some((content_type, bytes.len()));
            }
            _ => {
                let text = field.text().await.map_err(bad)?;
                match name.as_str() {
                    "message" => form.message = Some(text),
                    "type" => form.kind = Some(text),
                    "sessionId" => form.session_id = Some(text),
                    "userId" => form.user_id = Some(text),
                    "username" => form.username = Some(text),
                    _ => {}
                }
            }
        }
    }
    Ok(form)
}

fn canned_reply(message: &str) -> String {
    let lower = message.to_lowercase();
    if lower.contains("f1") || lower.contains("formula") {
        "I can help you with F1 predictions and analysis! Check the latest qualifying results and driver form.".to_string()
    } else if lower.contains("bet") {
        "For betting insights I can look at match statistics, team performance and historical data.".to_string()
    } else if lower.contains("hello") || lower.contains("hi") {
        "Hello! I'm your assistant for sports and F1 analysis. How can I help today?".to_string()
    } else {
        format!("I understand you said: '{}'. What would you like to know?", message)
    }
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let status = if state.unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(json!({
            "status": if state.unhealthy { "unhealthy" } else { "healthy" },
            "service": "mock-chat-backend",
            "backend_client": { "url": null, "available": false },
        })),
    )
}

async fn chat(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let n = state.requests.fetch_add(1, Ordering::SeqCst) + 1;
    if !state.latency.is_zero() {
        tokio::time::sleep(state.latency).await;
    }
    if state.fail_every > 0 && n % state.fail_every == 0 {
        tracing::warn!(request = n, "Injecting failure");
        return Err(api_error(StatusCode::SERVICE_UNAVAILABLE, "injected failure"));
    }

    let form = read_form(multipart).await?;
    let (Some(message), Some(kind), Some(session_id), Some(_user_id), Some(username)) = (
        form.message,
        form.kind,
        form.session_id,
        form.user_id,
        form.username,
    ) else {
        return Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, "missing form field"));
    };

    if kind != "text" && kind != "voice" {
        return Err(api_error(StatusCode::BAD_REQUEST, "Type must be 'text' or 'voice'"));
    }

    let turn = {
        let mut sessions = state.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let count = sessions.entry(session_id.clone()).or_insert(0);
        *count += 1;
        *count
    };
    tracing::info!(
        kind = %kind,
        username = %username,
        session_id = %session_id,
        turn,
        "Chat request"
    );

    if kind == "voice" {
        let Some((content_type, size)) = form.audio else {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "Audio file required for voice messages",
            ));
        };
        if content_type.is_some_and(|ct| !ct.starts_with("audio/")) {
            return Err(api_error(StatusCode::BAD_REQUEST, "File must be an audio file"));
        }
        tracing::debug!(bytes = size, "Voice payload received");
        return Ok(Json(json!({
            "message": "I received your voice message, but speech-to-text is not available here. Please use text messages for now.",
            "type": "voice",
            "audioUrl": null,
        })));
    }

    Ok(Json(json!({
        "message": canned_reply(&message),
        "type": "text",
        "audioUrl": null,
    })))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    chatline::observability::logging::init(&chatline::config::ObservabilityConfig::default());

    let state = AppState {
        fail_every: args.fail_every,
        latency: Duration::from_millis(args.latency_ms),
        unhealthy: args.unhealthy,
        requests: Arc::new(AtomicU64::new(0)),
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Mock backend listening");
    axum::serve(listener, app).await?;
    Ok(())
}
