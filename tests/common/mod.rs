//! In-process stand-in for the DataPrime query endpoint.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use coralogix_mcp::client::CoralogixClient;
use coralogix_mcp::config::ConnectionConfig;
use coralogix_mcp::service::LogService;
use serde_json::Value;
use tokio::net::TcpListener;

pub const API_KEY: &str = "test-key";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
struct MockState {
    replies: Arc<Mutex<VecDeque<(u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockBackend {
    pub url: String,
    state: MockState,
    handle: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    /// Each request consumes one scripted reply; once they run out the body is empty.
    pub async fn start(replies: Vec<(u16, &str)>) -> Self {
        let state = MockState::default();
        state
            .replies
            .lock()
            .unwrap()
            .extend(replies.into_iter().map(|(s, b)| (s, b.to_string())));

        let app = Router::new()
            .route("/api/v1/dataprime/query", post(query_handler))
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.body["query"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            api_key: API_KEY.to_string(),
            domain: "example.coralogix.com".to_string(),
            api_url: Some(self.url.clone()),
        }
    }

    pub fn client(&self) -> CoralogixClient {
        CoralogixClient::new(Some(self.connection()))
    }

    pub fn service(&self) -> LogService {
        LogService::new(self.client())
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn query_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().unwrap().push(RecordedRequest {
        authorization: header("authorization"),
        content_type: header("content-type"),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    let (status, reply) = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((200, String::new()));
    (StatusCode::from_u16(status).unwrap(), reply)
}

/// One NDJSON row shaped like a DataPrime result carrying a metadata timestamp.
pub fn row_with_timestamp(timestamp: &str) -> String {
    serde_json::json!({
        "result": {
            "results": [{
                "metadata": [
                    { "key": "logid", "value": "abc" },
                    { "key": "timestamp", "value": timestamp }
                ],
                "labels": [{ "key": "applicationname", "value": "api" }],
                "userData": "{\"msg\":\"boom\"}"
            }]
        }
    })
    .to_string()
}
