//! Centralized error types for the Cadenza core library.
//!
//! This module provides a unified error taxonomy that:
//! - Defines structured error types using `thiserror`
//! - Separates session-level failures (network, auth) from per-command
//!   failures (server ACK replies)
//! - Provides machine-readable codes through [`ErrorCode`]

use thiserror::Error;

use crate::library::identity::IdentityError;
use crate::protocol::response::AckError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for IdentityError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "identity_invalid_format",
            Self::KindMismatch { .. } => "identity_kind_mismatch",
        }
    }
}

impl ErrorCode for AckError {
    fn code(&self) -> &'static str {
        self.kind().code()
    }
}

/// Application-wide error type for the Cadenza core.
#[derive(Debug, Error)]
pub enum CadenzaError {
    /// Connect or I/O failure on a transport.
    #[error("Network error: {0}")]
    Network(String),

    /// The server rejected the configured credential.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The server sent a reply that does not follow the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered a command with an ACK line.
    #[error("Command failed: {0}")]
    Command(#[from] AckError),

    /// An identity or other encoded value could not be decoded.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A requested entity does not exist on the server.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// No session is active.
    #[error("Not connected")]
    NotConnected,

    /// The client configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CadenzaError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Auth(_) => "auth_failed",
            Self::Protocol(_) => "protocol_error",
            Self::Command(ack) => ack.code(),
            Self::InvalidFormat(_) => "invalid_format",
            Self::NotFound(_) => "not_found",
            Self::Cancelled => "cancelled",
            Self::NotConnected => "not_connected",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// Returns true if this error means the transport is no longer usable.
    ///
    /// A server ACK leaves the connection in a clean state; network and
    /// protocol failures do not.
    #[must_use]
    pub fn is_fatal_for_connection(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Protocol(_) | Self::Cancelled)
    }
}

impl ErrorCode for CadenzaError {
    fn code(&self) -> &'static str {
        CadenzaError::code(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

/// Convenient Result alias for library-wide operations.
pub type CadenzaResult<T> = Result<T, CadenzaError>;

impl From<std::io::Error> for CadenzaError {
    fn from(err: std::io::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<IdentityError> for CadenzaError {
    fn from(err: IdentityError) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for CadenzaError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::Network(format!("timed out: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_maps_to_network() {
        let err: CadenzaError =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into();
        assert!(matches!(err, CadenzaError::Network(_)));
        assert_eq!(err.code(), "network_error");
        assert!(err.is_fatal_for_connection());
    }

    #[test]
    fn ack_error_keeps_connection_usable() {
        let ack: AckError = "ACK [50@0] {find} No such directory".parse().unwrap();
        let err = CadenzaError::from(ack);
        assert_eq!(err.code(), "no_exist");
        assert!(!err.is_fatal_for_connection());
    }

    #[test]
    fn identity_error_maps_to_invalid_format() {
        let err = CadenzaError::from(IdentityError::InvalidFormat("bad".into()));
        assert_eq!(err.code(), "invalid_format");
    }
}
