//! Error types for the agent client.
//!
//! Transport failures never surface from `say`/`join`/`part`; they end the
//! current session and reach handlers as the error attached to
//! [`crate::Event::Disconnect`].

use moltchat_proto::ProtocolError;
use thiserror::Error;

/// Errors raised while connecting to or talking with the server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(ProtocolError),

    #[error("connecting to {host}:{port} timed out after {secs}s")]
    ConnectTimeout { host: String, port: u16, secs: u64 },

    #[error("no data from server for {0}s")]
    ReadTimeout(u64),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    #[error("connection closed by server")]
    Closed,

    #[error("not connected")]
    NotConnected,
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Io(io) => ClientError::Io(io),
            other => ClientError::Protocol(other),
        }
    }
}

impl ClientError {
    /// Get a static error code string for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Protocol(_) => "protocol",
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::ReadTimeout(_) => "read_timeout",
            Self::Tls(_) => "tls",
            Self::InvalidServerName(_) => "invalid_server_name",
            Self::Closed => "closed",
            Self::NotConnected => "not_connected",
        }
    }
}
