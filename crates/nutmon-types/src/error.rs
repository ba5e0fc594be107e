//! Error types for wire-line parsing in nutmon-types.

use thiserror::Error;

/// Errors that can occur when parsing NUT protocol lines.
///
/// This error type is transport-agnostic and does not include socket
/// errors (those belong in nutmon-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The line does not have the shape the protocol requires.
    #[error("malformed reply: {line:?}")]
    Malformed {
        /// The raw line as received from the daemon.
        line: String,
    },

    /// The reply echoed a different UPS or variable than was requested.
    #[error("reply echo mismatch: expected '{expected}', got {line:?}")]
    EchoMismatch {
        /// The token that was expected in the echo.
        expected: String,
        /// The raw line as received from the daemon.
        line: String,
    },

    /// The value portion was missing its surrounding double quotes.
    #[error("unquoted value in reply: {line:?}")]
    UnquotedValue {
        /// The raw line as received from the daemon.
        line: String,
    },
}

impl ParseError {
    /// Create a malformed-line error.
    pub fn malformed(line: impl Into<String>) -> Self {
        Self::Malformed { line: line.into() }
    }

    /// The raw line that failed to parse.
    pub fn line(&self) -> &str {
        match self {
            Self::Malformed { line } | Self::EchoMismatch { line, .. } | Self::UnquotedValue { line } => line,
        }
    }
}

/// Result type alias using nutmon-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
