use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{missing_connection_error, ConnectionConfig};
use crate::error::{CoralogixError, Result};
use crate::model::QueryRequest;

/// Sends DataPrime / Lucene queries and normalizes the NDJSON reply.
///
/// The connection config is fixed at construction. Without one the client
/// still exists, but every `send` fails with a configuration error.
#[derive(Debug, Clone)]
pub struct CoralogixClient {
    connection: Option<ConnectionConfig>,
    http: reqwest::Client,
}

impl CoralogixClient {
    pub fn new(connection: Option<ConnectionConfig>) -> Self {
        Self {
            connection,
            http: reqwest::Client::new(),
        }
    }

    pub async fn send(&self, request: &QueryRequest) -> Result<Vec<Value>> {
        let connection = self.connection.as_ref().ok_or_else(missing_connection_error)?;
        let url = connection.query_url();
        debug!(url = %url, query = %request.query, "sending query");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&connection.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "query rejected");
            return Err(CoralogixError::BackendError {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = response.text().await?;
        let rows = parse_ndjson(&body);
        debug!(rows = rows.len(), "query returned");
        Ok(rows)
    }
}

/// One JSON document per non-blank line; lines that fail to parse are dropped.
pub fn parse_ndjson(body: &str) -> Vec<Value> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Failed to parse NDJSON line: {line} ({e})");
                None
            }
        })
        .collect()
}
