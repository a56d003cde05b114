use std::fmt::Display;

/// Setup-time failures: loading settings, building collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("reqwest error")]
    Reqwest(#[from] reqwest::Error),
}

/// A failed attempt at the transport level. Always retryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,
    #[error("connect/dns/tls error: {0}")]
    Connect(String),
    #[error("request error: {0}")]
    Request(String),
    #[error("failed reading response body: {0}")]
    Body(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// The body arrived but does not have the expected shape. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedPayload {
    #[error("body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("expected a value at '{path}'")]
    MissingValue { path: String },
}

/// The record was extracted but could not be persisted.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed serializing record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why a request was handed to the failure reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Transport(TransportError),
    Malformed(MalformedPayload),
}

impl FailureReason {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "transport failure: {}", err),
            Self::Malformed(err) => write!(f, "malformed payload: {}", err),
        }
    }
}

impl From<TransportError> for FailureReason {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<MalformedPayload> for FailureReason {
    fn from(err: MalformedPayload) -> Self {
        Self::Malformed(err)
    }
}
