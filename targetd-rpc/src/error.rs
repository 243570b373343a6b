use thiserror::Error;

/// Failure to complete an HTTP exchange with the daemon.
///
/// Covers everything below the JSON-RPC layer: refused or reset
/// connections, TLS handshake failures, unreadable response bodies.
#[derive(Error, Debug)]
#[error("request to {url} failed: {source}")]
pub struct TransportError {
    pub url: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    pub fn new(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum RpcError {
    /// The daemon could not be reached, even after the TLS fallback.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The reply is not a JSON-RPC 2.0 response.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The daemon rejected the request over HTTP without a JSON-RPC body.
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Daemon-reported failure (negative error code).
    #[error("{message}")]
    Application { code: i64, message: String },
}

impl RpcError {
    /// Whether this is a daemon-reported failure the caller is expected to
    /// react to. Every other variant is fatal for the current workflow.
    pub fn is_application(&self) -> bool {
        matches!(self, RpcError::Application { .. })
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RpcError::Transport(_) => "transport",
            RpcError::Protocol(_) => "protocol",
            RpcError::HttpStatus { .. } => "http_status",
            RpcError::Application { .. } => "application",
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
