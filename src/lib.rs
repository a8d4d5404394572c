//! Coralogix log search over MCP.
//! Query building, request dispatch and the transports live in separate modules.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod model;
pub mod query;
pub mod service;
pub mod time_range;
