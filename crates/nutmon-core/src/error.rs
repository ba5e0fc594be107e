//! Error types for nutmon-core.
//!
//! This module defines the closed error taxonomy of the protocol client.
//! Every failure is tagged with the protocol step it belongs to and, where
//! the daemon replied at all, carries the raw server text.
//!
//! None of these errors are retried where they occur: the reader and query
//! layers abort the affected operation immediately, and retry policy (if
//! any) lives in the poll loop one level up.

use std::time::Duration;

use thiserror::Error;

use nutmon_types::ParseError;

/// Errors that can occur when talking to a NUT daemon.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Socket-level failure (connect, send, or receive).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A blocking socket operation exceeded its deadline.
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The protocol step that timed out.
        operation: String,
        /// The deadline that was exceeded.
        duration: Duration,
    },

    /// The daemon closed the connection mid-operation.
    #[error("connection closed during '{operation}'")]
    ConnectionClosed {
        /// The protocol step that was interrupted.
        operation: String,
    },

    /// A credential was rejected during the handshake.
    #[error("authentication failed: {0}")]
    Auth(AuthFailure),

    /// `LIST UPS` completed without enumerating any UPS.
    #[error("no UPS found on the daemon")]
    NoUpsFound,

    /// The daemon replied with an unexpected or malformed line.
    #[error("malformed reply during '{operation}': {source}")]
    Protocol {
        /// The protocol step whose reply failed to parse.
        operation: String,
        /// The underlying parse failure, carrying the raw line.
        source: ParseError,
    },

    /// The operation was cancelled from outside.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured reasons for a rejected handshake.
///
/// Each variant carries the daemon's verbatim reply so a "server refused"
/// can always be told apart from "could not ask" (which surfaces as
/// [`Error::Io`] or [`Error::Timeout`] instead).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthFailure {
    /// The `USERNAME` command was not answered with `OK`.
    UsernameRejected {
        /// Raw server reply.
        reply: String,
    },
    /// The `PASSWORD` command was not answered with `OK`.
    PasswordRejected {
        /// Raw server reply.
        reply: String,
    },
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UsernameRejected { reply } => {
                write!(f, "username not accepted, server replied {reply:?}")
            }
            Self::PasswordRejected { reply } => {
                write!(f, "password not accepted, server replied {reply:?}")
            }
        }
    }
}

impl Error {
    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a connection-closed error with operation context.
    pub fn connection_closed(operation: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            operation: operation.into(),
        }
    }

    /// Create a protocol error from a parse failure.
    pub fn protocol(operation: impl Into<String>, source: ParseError) -> Self {
        Self::Protocol {
            operation: operation.into(),
            source,
        }
    }

    /// Create a username-rejected error carrying the raw reply.
    pub fn username_rejected(reply: impl Into<String>) -> Self {
        Self::Auth(AuthFailure::UsernameRejected {
            reply: reply.into(),
        })
    }

    /// Create a password-rejected error carrying the raw reply.
    pub fn password_rejected(reply: impl Into<String>) -> Self {
        Self::Auth(AuthFailure::PasswordRejected {
            reply: reply.into(),
        })
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error means the TCP session is no longer usable.
    ///
    /// The reconnect failure policy uses this to decide between re-dialing
    /// the daemon and plain retrying on the existing connection.
    #[must_use]
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Timeout { .. } | Self::ConnectionClosed { .. }
        )
    }
}

/// Result type alias using nutmon-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
