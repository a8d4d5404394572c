use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{CoralogixError, Result};
use crate::mcp::{process_request, tool_catalog, RpcRequest};
use crate::service::LogService;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(0);

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LogService>,
    pub sessions: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<Event>>>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_status(e: &CoralogixError) -> StatusCode {
    match e {
        CoralogixError::UnknownTool(_) | CoralogixError::NotFound(_) => StatusCode::NOT_FOUND,
        CoralogixError::ConfigError(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoralogixError::TimeRangeError { .. } | CoralogixError::InvalidRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        CoralogixError::BackendError { .. } | CoralogixError::TransportError(_) => {
            StatusCode::BAD_GATEWAY
        }
        CoralogixError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_reply(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

async fn list_tools_handler() -> impl IntoResponse {
    Json(json!({ "tools": tool_catalog() }))
}

/// Plain REST invocation: the body is the tool's argument object, the reply its payload.
async fn call_tool_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    let arguments = match payload {
        Ok(Json(v)) => v,
        Err(JsonRejection::MissingJsonContentType(_)) => Value::Null,
        Err(e) => return error_reply(StatusCode::BAD_REQUEST, format!("invalid request body: {e}")),
    };

    match state.service.call(&name, arguments).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => error_reply(error_status(&e), e.to_string()),
    }
}

async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let session_id = format!(
        "{}-{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0),
        NEXT_SESSION.fetch_add(1, Ordering::Relaxed)
    );

    // MCP expects the message endpoint as the first event, relative to this server.
    let endpoint_url = format!("/message?session_id={}", session_id);
    let _ = tx.send(Event::default().event("endpoint").data(endpoint_url));

    let closed = tx.clone();
    state
        .sessions
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(session_id.clone(), tx);

    // The receiver lives inside the response stream; it drops when the client disconnects.
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        closed.closed().await;
        debug!(session_id = %session_id, "sse client disconnected");
        sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&session_id);
    });

    let stream = UnboundedReceiverStream::new(rx).map(Ok::<_, axum::Error>);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct MessageQuery {
    session_id: String,
}

async fn message_handler(
    State(state): State<AppState>,
    Query(q): Query<MessageQuery>,
    Json(req): Json<RpcRequest>,
) -> impl IntoResponse {
    let sender = {
        let sessions = state.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(&q.session_id).cloned()
    };

    let Some(sender) = sender else {
        return StatusCode::NOT_FOUND;
    };

    let service = state.service.clone();
    let sessions = state.sessions.clone();
    let session_id = q.session_id;
    tokio::spawn(async move {
        let Some(resp) = process_request(&service, req).await else {
            return;
        };
        let Ok(json_str) = serde_json::to_string(&resp) else {
            return;
        };
        if sender.send(Event::default().event("message").data(json_str)).is_err() {
            warn!(session_id = %session_id, "sse client gone, dropping session");
            sessions
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&session_id);
        }
    });
    StatusCode::ACCEPTED
}

pub fn build_router(service: Arc<LogService>) -> Router {
    let state = AppState {
        service,
        sessions: Arc::new(RwLock::new(HashMap::new())),
    };
    Router::new()
        .route("/tools", get(list_tools_handler))
        .route("/tools/:name", post(call_tool_handler))
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .with_state(state)
}

pub async fn bind_http(config: &ServerConfig) -> Result<TcpListener> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| CoralogixError::ConfigError(format!("bind {addr} failed: {e}")))?;
    info!("HTTP server listening on http://{}", addr);
    Ok(listener)
}

pub async fn serve_listener(listener: TcpListener, service: Arc<LogService>) -> Result<()> {
    axum::serve(listener, build_router(service))
        .await
        .map_err(|e| e.into())
}

pub async fn serve_http(service: Arc<LogService>, config: &ServerConfig) -> Result<()> {
    let listener = bind_http(config).await?;
    serve_listener(listener, service).await
}
