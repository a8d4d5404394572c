use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoralogixError>;

/// JSON-RPC error codes used by the MCP transports.
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Error)]
pub enum CoralogixError {
    #[error("{0}")]
    ConfigError(String),

    #[error("Invalid time range format: {input}. Use format like \"1h\", \"24h\", \"7d\"")]
    TimeRangeError { input: String },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Log entry with ID {0} not found")]
    NotFound(String),

    #[error("Coralogix API request failed: {status} {reason}")]
    BackendError { status: u16, reason: String },

    #[error("Coralogix API request failed: {0}")]
    TransportError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoralogixError {
    /// Bad input and bad configuration are reported as invalid requests,
    /// everything that happened after the request left the process is internal.
    pub fn rpc_code(&self) -> i32 {
        match self {
            CoralogixError::ConfigError(_)
            | CoralogixError::TimeRangeError { .. }
            | CoralogixError::InvalidRequest(_)
            | CoralogixError::NotFound(_) => INVALID_REQUEST,
            CoralogixError::UnknownTool(_) => METHOD_NOT_FOUND,
            CoralogixError::BackendError { .. }
            | CoralogixError::TransportError(_)
            | CoralogixError::Io(_) => INTERNAL_ERROR,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.rpc_code() == INVALID_REQUEST
    }
}

impl From<reqwest::Error> for CoralogixError {
    fn from(e: reqwest::Error) -> Self {
        CoralogixError::TransportError(e.to_string())
    }
}
