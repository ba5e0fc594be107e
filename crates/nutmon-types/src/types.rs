//! Core types for UPS monitoring data.

use core::fmt;

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Classified UPS power state.
///
/// Classification works on the raw `ups.status` token by substring: NUT
/// daemons report flags such as `OL`, `OB`, `OL CHRG`, or `OB DISCHRG LB`,
/// and only the on-line/on-battery distinction matters here.
///
/// The set is closed: any token carrying neither flag classifies as
/// [`Unknown`](PowerStatus::Unknown), so callers can match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PowerStatus {
    /// Mains power present (`OL` flag).
    Online,
    /// Running on battery (`OB` flag).
    OnBattery,
    /// Status token carried neither flag.
    Unknown,
}

impl PowerStatus {
    /// Classify a raw `ups.status` value.
    ///
    /// # Examples
    ///
    /// ```
    /// use nutmon_types::PowerStatus;
    ///
    /// assert_eq!(PowerStatus::classify("OL"), PowerStatus::Online);
    /// assert_eq!(PowerStatus::classify("OL CHRG"), PowerStatus::Online);
    /// assert_eq!(PowerStatus::classify("OB DISCHRG"), PowerStatus::OnBattery);
    /// assert_eq!(PowerStatus::classify("WAIT"), PowerStatus::Unknown);
    /// ```
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        if raw.contains("OL") {
            PowerStatus::Online
        } else if raw.contains("OB") {
            PowerStatus::OnBattery
        } else {
            PowerStatus::Unknown
        }
    }
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerStatus::Online => write!(f, "Online"),
            PowerStatus::OnBattery => write!(f, "On Battery"),
            PowerStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One poll tick's worth of UPS readings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Classified power status.
    pub status: PowerStatus,
    /// Raw `ups.status` value as reported by the daemon.
    pub raw_status: String,
    /// Raw `battery.charge` value as reported by the daemon.
    pub raw_charge: String,
}

impl Sample {
    /// Build a sample from raw variable values, classifying the status.
    pub fn from_raw(raw_status: impl Into<String>, raw_charge: impl Into<String>) -> Self {
        let raw_status = raw_status.into();
        Self {
            status: PowerStatus::classify(&raw_status),
            raw_status,
            raw_charge: raw_charge.into(),
        }
    }

    /// Battery charge as a percentage, if the daemon reported a number.
    ///
    /// NUT reports `battery.charge` as a quoted decimal string. A value
    /// that does not parse yields `None` rather than a guess.
    #[must_use]
    pub fn charge(&self) -> Option<f64> {
        self.raw_charge.trim().parse().ok()
    }
}

/// One UPS as enumerated by `LIST UPS`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpsEntry {
    /// Daemon-side identifier, used in all subsequent commands.
    pub name: String,
    /// Human-readable description.
    pub description: String,
}

/// A snapshot of UPS variables from one `LIST VAR` exchange.
///
/// Keys are unique and order is irrelevant. A snapshot is replaced
/// wholesale on every poll, never merged incrementally. Duplicate names
/// within one block keep the last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariableSet {
    vars: HashMap<String, String>,
}

impl VariableSet {
    /// Create an empty variable set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable, replacing any previous value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Look up a variable by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Number of variables in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over (name, value) pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for VariableSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_online() {
        assert_eq!(PowerStatus::classify("OL"), PowerStatus::Online);
        assert_eq!(PowerStatus::classify("OL CHRG LB"), PowerStatus::Online);
    }

    #[test]
    fn test_classify_on_battery() {
        assert_eq!(PowerStatus::classify("OB"), PowerStatus::OnBattery);
        assert_eq!(PowerStatus::classify("OB DISCHRG"), PowerStatus::OnBattery);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(PowerStatus::classify(""), PowerStatus::Unknown);
        assert_eq!(PowerStatus::classify("BYPASS"), PowerStatus::Unknown);
    }

    #[test]
    fn test_sample_charge_parses_numerically() {
        let sample = Sample::from_raw("OL", "87");
        assert_eq!(sample.status, PowerStatus::Online);
        assert_eq!(sample.charge(), Some(87.0));

        // The lexicographic trap: "9" must compare below 90, not above.
        let sample = Sample::from_raw("OL", "9");
        assert!(sample.charge().unwrap() < 90.0);
    }

    #[test]
    fn test_sample_charge_rejects_garbage() {
        let sample = Sample::from_raw("OB", "n/a");
        assert_eq!(sample.charge(), None);
    }

    #[test]
    fn test_variable_set_last_duplicate_wins() {
        let mut vars = VariableSet::new();
        vars.insert("ups.status", "OL");
        vars.insert("ups.status", "OB");
        assert_eq!(vars.get("ups.status"), Some("OB"));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn test_variable_set_order_independent_equality() {
        let a: VariableSet = [
            ("ups.status".to_string(), "OL".to_string()),
            ("battery.charge".to_string(), "87".to_string()),
        ]
        .into_iter()
        .collect();
        let b: VariableSet = [
            ("battery.charge".to_string(), "87".to_string()),
            ("ups.status".to_string(), "OL".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(a, b);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_power_status_serde_round_trip() {
        let json = serde_json::to_string(&PowerStatus::OnBattery).unwrap();
        assert_eq!(json, "\"on_battery\"");
        let back: PowerStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PowerStatus::OnBattery);
    }
}
