//! Platform-agnostic types for NUT UPS monitoring.
//!
//! This crate provides the shared vocabulary of the nutmon workspace:
//! classified power states, poll samples, variable snapshots, and the
//! pure string-level half of the NUT wire protocol.
//!
//! # Features
//!
//! - Power status classification from raw `ups.status` tokens
//! - Variable snapshot type with wholesale-replacement semantics
//! - NUT command formatting and reply-line parsing
//! - Error types for malformed replies
//!
//! # Example
//!
//! ```
//! use nutmon_types::{PowerStatus, proto};
//!
//! let value = proto::parse_get_var_reply(
//!     "GET VAR ups1 ups.status \"OB DISCHRG\"",
//!     "ups1",
//!     "ups.status",
//! ).unwrap();
//! assert_eq!(PowerStatus::classify(&value), PowerStatus::OnBattery);
//! ```

pub mod error;
pub mod proto;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{PowerStatus, Sample, UpsEntry, VariableSet};
