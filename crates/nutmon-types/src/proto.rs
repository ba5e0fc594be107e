//! Wire-level constants and line parsers for the NUT text protocol.
//!
//! The daemon speaks a newline-terminated ASCII protocol (default port
//! 3493). Enumeration queries reply with BEGIN/END-delimited blocks; single
//! queries reply with one echoed line. This module contains the pure
//! string-level half of that protocol: command formatting, block markers,
//! and line parsing. All socket handling lives in nutmon-core.

use crate::error::{ParseError, ParseResult};
use crate::types::{UpsEntry, VariableSet};

/// Default TCP port of a NUT daemon.
pub const DEFAULT_PORT: u16 = 3493;

/// Reply sent by the daemon when a credential is accepted.
pub const OK_REPLY: &str = "OK";

/// Terminator line of a `LIST UPS` block.
pub const END_LIST_UPS: &str = "END LIST UPS";

/// Marker that opens a `LIST UPS` block.
pub const BEGIN_LIST_UPS: &[u8] = b"BEGIN LIST UPS\n";

/// Format a `USERNAME` command.
#[must_use]
pub fn username_command(user: &str) -> String {
    format!("USERNAME {user}\n")
}

/// Format a `PASSWORD` command.
#[must_use]
pub fn password_command(password: &str) -> String {
    format!("PASSWORD {password}\n")
}

/// The `LIST UPS` enumeration command.
#[must_use]
pub fn list_ups_command() -> &'static str {
    "LIST UPS\n"
}

/// Format a `LIST VAR` command for one UPS.
#[must_use]
pub fn list_var_command(ups: &str) -> String {
    format!("LIST VAR {ups}\n")
}

/// Format a `GET VAR` command.
#[must_use]
pub fn get_var_command(ups: &str, name: &str) -> String {
    format!("GET VAR {ups} {name}\n")
}

/// Marker that opens a `LIST VAR` block for one UPS.
#[must_use]
pub fn begin_list_var_marker(ups: &str) -> Vec<u8> {
    format!("BEGIN LIST VAR {ups}\n").into_bytes()
}

/// Terminator line of a `LIST VAR` block for one UPS.
#[must_use]
pub fn end_list_var(ups: &str) -> String {
    format!("END LIST VAR {ups}")
}

/// Extract the span between the first and last double quote of a line.
///
/// NUT quotes every variable value; values may themselves contain spaces
/// (`ups.status "OB LB"`), so token splitting alone is not enough.
#[must_use]
pub fn quoted_value(line: &str) -> Option<&str> {
    let first = line.find('"')?;
    let last = line.rfind('"')?;
    if last <= first {
        return None;
    }
    Some(&line[first + 1..last])
}

/// Parse one `UPS <name> "<description>"` line from a `LIST UPS` block.
///
/// Lines that do not match are not part of the enumeration and yield
/// `None`; per the protocol they are ignored rather than treated as fatal.
#[must_use]
pub fn parse_ups_line(line: &str) -> Option<UpsEntry> {
    let text = line.trim();
    let mut tokens = text.split_whitespace();
    if tokens.next()? != "UPS" {
        return None;
    }
    let name = tokens.next()?;
    Some(UpsEntry {
        name: name.to_string(),
        description: quoted_value(text).unwrap_or_default().to_string(),
    })
}

/// Parse one `VAR <ups> <name> "<value>"` line from a `LIST VAR` block.
///
/// Lines for a different UPS, or without a properly quoted value, yield
/// `None` and are skipped by the block consumer.
#[must_use]
pub fn parse_var_line(line: &str, ups: &str) -> Option<(String, String)> {
    let text = line.trim();
    let mut tokens = text.split_whitespace();
    if tokens.next()? != "VAR" || tokens.next()? != ups {
        return None;
    }
    let name = tokens.next()?;
    let value = quoted_value(text)?;
    Some((name.to_string(), value.to_string()))
}

/// Parse the single-line reply to a `GET VAR` command.
///
/// The daemon echoes the request: `GET VAR <ups> <name> "<value>"`. The
/// echo must match the request exactly and the value must be quoted;
/// anything else is a parse error carrying the raw line.
///
/// # Examples
///
/// ```
/// use nutmon_types::proto::parse_get_var_reply;
///
/// let value = parse_get_var_reply("GET VAR ups1 ups.status \"OB\"", "ups1", "ups.status");
/// assert_eq!(value.unwrap(), "OB");
///
/// assert!(parse_get_var_reply("GET VAR ups1 ups.status", "ups1", "ups.status").is_err());
/// ```
pub fn parse_get_var_reply(line: &str, ups: &str, name: &str) -> ParseResult<String> {
    let text = line.trim();
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 4 || tokens[0] != "GET" || tokens[1] != "VAR" {
        return Err(ParseError::malformed(text));
    }
    if tokens[2] != ups {
        return Err(ParseError::EchoMismatch {
            expected: ups.to_string(),
            line: text.to_string(),
        });
    }
    if tokens[3] != name {
        return Err(ParseError::EchoMismatch {
            expected: name.to_string(),
            line: text.to_string(),
        });
    }
    quoted_value(text)
        .map(str::to_string)
        .ok_or_else(|| ParseError::UnquotedValue {
            line: text.to_string(),
        })
}

/// Encode a variable snapshot as a `LIST VAR` reply block.
///
/// Produces the exact wire shape a daemon would send, including the
/// BEGIN/END framing. Used by mock daemons in tests and diagnostics.
#[must_use]
pub fn encode_var_block(ups: &str, vars: &VariableSet) -> String {
    let mut block = format!("BEGIN LIST VAR {ups}\n");
    for (name, value) in vars.iter() {
        block.push_str(&format!("VAR {ups} {name} \"{value}\"\n"));
    }
    block.push_str(&format!("END LIST VAR {ups}\n"));
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_var_reply_round_trip() {
        let value = parse_get_var_reply("GET VAR ups1 ups.status \"OB\"", "ups1", "ups.status");
        assert_eq!(value.unwrap(), "OB");
    }

    #[test]
    fn test_get_var_reply_value_with_spaces() {
        let value = parse_get_var_reply("GET VAR ups1 ups.status \"OB DISCHRG LB\"", "ups1", "ups.status");
        assert_eq!(value.unwrap(), "OB DISCHRG LB");
    }

    #[test]
    fn test_get_var_reply_missing_value_is_malformed() {
        let err = parse_get_var_reply("GET VAR ups1 ups.status", "ups1", "ups.status").unwrap_err();
        assert!(matches!(err, ParseError::UnquotedValue { .. }));
        assert_eq!(err.line(), "GET VAR ups1 ups.status");
    }

    #[test]
    fn test_get_var_reply_short_line_is_malformed() {
        let err = parse_get_var_reply("ERR VAR-NOT-SUPPORTED", "ups1", "ups.status").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn test_get_var_reply_echo_mismatch() {
        let err =
            parse_get_var_reply("GET VAR other ups.status \"OL\"", "ups1", "ups.status").unwrap_err();
        assert!(matches!(err, ParseError::EchoMismatch { .. }));

        let err =
            parse_get_var_reply("GET VAR ups1 battery.charge \"87\"", "ups1", "ups.status").unwrap_err();
        assert!(matches!(err, ParseError::EchoMismatch { .. }));
    }

    #[test]
    fn test_parse_ups_line() {
        let entry = parse_ups_line("UPS alpha \"Workshop UPS\"").unwrap();
        assert_eq!(entry.name, "alpha");
        assert_eq!(entry.description, "Workshop UPS");
    }

    #[test]
    fn test_parse_ups_line_ignores_non_matching() {
        assert!(parse_ups_line("END LIST UPS").is_none());
        assert!(parse_ups_line("").is_none());
        assert!(parse_ups_line("NOTAUPS alpha \"x\"").is_none());
    }

    #[test]
    fn test_parse_var_line() {
        let (name, value) = parse_var_line("VAR ups1 battery.charge \"87\"", "ups1").unwrap();
        assert_eq!(name, "battery.charge");
        assert_eq!(value, "87");
    }

    #[test]
    fn test_parse_var_line_skips_other_ups_and_garbage() {
        assert!(parse_var_line("VAR other battery.charge \"87\"", "ups1").is_none());
        assert!(parse_var_line("VAR ups1 battery.charge 87", "ups1").is_none());
        assert!(parse_var_line("END LIST VAR ups1", "ups1").is_none());
    }

    #[test]
    fn test_encode_parse_block_round_trip() {
        let mut vars = VariableSet::new();
        vars.insert("ups.status", "OL");
        vars.insert("battery.charge", "87");

        let block = encode_var_block("ups1", &vars);
        let parsed: VariableSet = block
            .lines()
            .filter_map(|line| parse_var_line(line, "ups1"))
            .collect();
        assert_eq!(parsed, vars);
    }

    #[test]
    fn test_quoted_value_edges() {
        assert_eq!(quoted_value("x \"a b\""), Some("a b"));
        assert_eq!(quoted_value("x \"\""), Some(""));
        assert_eq!(quoted_value("no quotes"), None);
        assert_eq!(quoted_value("lone \" quote"), None);
    }
}
