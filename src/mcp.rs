use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error};

use crate::error::{
    CoralogixError, Result, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::service::LogService;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "coralogix-mcp-server";

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub async fn run_stdio(service: Arc<LogService>) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let req: RpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                write_response(&mut stdout, error_response(Value::Null, PARSE_ERROR, format!("parse error: {e}"))).await?;
                continue;
            }
        };

        if let Some(resp) = process_request(&service, req).await {
            write_response(&mut stdout, resp).await?;
        }
    }

    Ok(())
}

/// Handles one JSON-RPC message. Notifications (no id) get no response.
pub async fn process_request(service: &LogService, req: RpcRequest) -> Option<RpcResponse> {
    debug!(method = %req.method, "rpc request");
    if req.method.starts_with("notifications/") {
        return None;
    }

    let resp = match req.method.as_str() {
        "initialize" => success(req.id, initialize_result()),
        "ping" => success(req.id, json!({})),
        "tools/list" => success(req.id, json!({ "tools": tool_catalog() })),
        "tools/call" => handle_call_tool(service, req).await,
        _ => error_response(req.id, METHOD_NOT_FOUND, format!("method not found: {}", req.method)),
    };
    Some(resp)
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

async fn handle_call_tool(service: &LogService, req: RpcRequest) -> RpcResponse {
    let params: CallToolParams = match serde_json::from_value(req.params) {
        Ok(p) => p,
        Err(e) => return error_response(req.id, INVALID_PARAMS, format!("invalid params: {e}")),
    };

    match service.call(&params.name, params.arguments).await {
        Ok(payload) => success(req.id, text_content(&payload)),
        Err(e) => {
            error!(tool = %params.name, "tool call failed: {e}");
            error_response(req.id, e.rpc_code(), tool_error_message(&e))
        }
    }
}

/// Wraps a payload in the single text block MCP hosts expect.
pub fn text_content(payload: &Value) -> Value {
    let text = serde_json::to_string_pretty(payload).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"));
    json!({
        "content": [
            { "type": "text", "text": text }
        ]
    })
}

/// Backend rejections already read as API failures; only unexpected errors get the prefix.
fn tool_error_message(e: &CoralogixError) -> String {
    match e {
        CoralogixError::TransportError(_) | CoralogixError::Io(_) => {
            format!("Tool execution failed: {e}")
        }
        _ => e.to_string(),
    }
}

fn success(id: Value, result: Value) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: Some(result),
        error: None,
    }
}

fn error_response(id: Value, code: i32, message: String) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(RpcError { code, message }),
    }
}

async fn write_response(stdout: &mut tokio::io::Stdout, resp: RpcResponse) -> Result<()> {
    let line = serde_json::to_string(&resp).unwrap_or_else(|_| "{}".to_string());
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

pub fn tool_catalog() -> Vec<Value> {
    vec![
        json!({
            "name": "search_logs",
            "description": "Search Coralogix logs with text queries",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query (supports Lucene syntax)" },
                    "applications": { "type": "array", "items": { "type": "string" }, "description": "Filter by specific applications" },
                    "subsystems": { "type": "array", "items": { "type": "string" }, "description": "Filter by specific subsystems" },
                    "severities": { "type": "array", "items": { "type": "string" }, "description": "Filter by log severities (Debug, Info, Warning, Error, Critical)" },
                    "timeRange": { "type": "string", "description": "Time range (e.g., \"1h\", \"24h\", \"7d\")", "default": "1h" },
                    "limit": { "type": "number", "description": "Maximum number of results", "default": 100 }
                },
                "required": ["query"]
            }
        }),
        json!({
            "name": "query_logs_dataprime",
            "description": "Execute DataPrime queries on Coralogix logs",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "DataPrime query string" },
                    "timeRange": { "type": "string", "description": "Time range for the query", "default": "1h" }
                },
                "required": ["query"]
            }
        }),
        json!({
            "name": "get_log_aggregations",
            "description": "Get aggregated metrics from logs",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "groupBy": { "type": "array", "items": { "type": "string" }, "description": "Fields to group by" },
                    "aggregations": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": { "type": "string", "enum": ["count", "sum", "avg", "min", "max"] },
                                "field": { "type": "string" }
                            }
                        },
                        "description": "Aggregation functions to apply"
                    },
                    "filters": { "type": "object", "description": "Additional filters to apply" },
                    "timeRange": { "type": "string", "default": "1h" }
                },
                "required": ["groupBy"]
            }
        }),
        json!({
            "name": "list_applications",
            "description": "List available applications in Coralogix",
            "inputSchema": { "type": "object", "properties": {} }
        }),
        json!({
            "name": "list_subsystems",
            "description": "List subsystems for specific applications",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "applications": { "type": "array", "items": { "type": "string" }, "description": "Applications to get subsystems for" }
                }
            }
        }),
        json!({
            "name": "get_log_context",
            "description": "Get surrounding context for a specific log entry",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "logId": { "type": "string", "description": "Unique identifier of the log entry" },
                    "contextSize": { "type": "number", "description": "Number of logs before and after to retrieve", "default": 10 }
                },
                "required": ["logId"]
            }
        }),
        json!({
            "name": "advanced_dataprime_query",
            "description": "Execute advanced DataPrime queries with specialized analysis types",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "queryType": {
                        "type": "string",
                        "enum": ["error_analysis", "performance_analysis", "user_journey", "aggregated_metrics", "log_parsing", "enriched_analysis", "basic"],
                        "description": "Type of advanced analysis to perform",
                        "default": "basic"
                    },
                    "application": { "type": "string", "description": "Filter by specific application name" },
                    "subsystem": { "type": "string", "description": "Filter by specific subsystem name" },
                    "severity": { "type": "string", "description": "Filter by log severity level" },
                    "userId": { "type": "string", "description": "Filter by specific user ID" },
                    "timeRange": { "type": "string", "description": "Time range for the query (e.g., \"1h\", \"24h\", \"7d\")", "default": "1h" },
                    "interval": { "type": "string", "description": "Time interval for aggregated metrics (e.g., \"5m\", \"1h\")", "default": "5m" },
                    "parsePattern": {
                        "type": "string",
                        "enum": ["api_logs", "user_activity", "database_logs", "key_value"],
                        "description": "Pattern for log parsing queries",
                        "default": "api_logs"
                    }
                },
                "required": ["queryType"]
            }
        }),
        json!({
            "name": "log_pattern_analysis",
            "description": "Analyze log patterns and categorize log entries",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "application": { "type": "string", "description": "Application name to analyze patterns for" },
                    "timeRange": { "type": "string", "description": "Time range for analysis (e.g., \"1h\", \"24h\")", "default": "24h" }
                },
                "required": ["application"]
            }
        }),
        json!({
            "name": "security_analysis",
            "description": "Perform security-focused log analysis to identify threats and suspicious activities",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "timeRange": { "type": "string", "description": "Time range for security analysis (e.g., \"1h\", \"24h\")", "default": "24h" },
                    "severity": { "type": "string", "description": "Minimum severity level to analyze", "default": "WARNING" }
                }
            }
        }),
        json!({
            "name": "custom_dataprime_query",
            "description": "Execute custom DataPrime queries using predefined templates or custom queries",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "template": {
                        "type": "string",
                        "enum": ["time_series_analysis", "top_errors_by_user", "api_performance_monitoring", "custom"],
                        "description": "Query template to use"
                    },
                    "parameters": {
                        "type": "object",
                        "description": "Parameters for the template or custom query",
                        "properties": {
                            "customQuery": { "type": "string", "description": "Custom DataPrime query string (when template is \"custom\")" },
                            "application": { "type": "string", "description": "Application name to filter by" },
                            "timeRange": { "type": "string", "description": "Time range for the query" },
                            "interval": { "type": "string", "description": "Time interval for time series (e.g., \"1h\", \"5m\")" },
                            "limit": { "type": "number", "description": "Maximum number of results to return" },
                            "orderBy": { "type": "string", "description": "Field to order results by" }
                        }
                    }
                },
                "required": ["template"]
            }
        }),
    ]
}
