use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown severity '{0}'")]
pub struct InvalidSeverity(String);

/// Severity of a telemetry line, ordered from most verbose to most urgent.
///
/// This is distinct from the tracing levels used to configure the crate's own
/// diagnostics; `Severity` travels with the payload. The derived ordering
/// makes threshold checks a plain comparison: `Error > Debug` holds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Trace,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Severity {
    /// Whether a message at `severity` clears this threshold. A message at
    /// exactly the threshold passes.
    pub fn allows(self, severity: Severity) -> bool {
        severity >= self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
            Severity::Alert => "alert",
            Severity::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = InvalidSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "notice" => Ok(Severity::Notice),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            "alert" => Ok(Severity::Alert),
            "emergency" => Ok(Severity::Emergency),
            other => Err(InvalidSeverity(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Debug);
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Notice);
        assert!(Severity::Notice < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
        assert!(Severity::Critical < Severity::Alert);
        assert!(Severity::Alert < Severity::Emergency);
    }

    #[test]
    fn test_threshold_allows_at_and_above() {
        let threshold = Severity::Warning;
        assert!(threshold.allows(Severity::Warning));
        assert!(threshold.allows(Severity::Error));
        assert!(threshold.allows(Severity::Emergency));
        assert!(!threshold.allows(Severity::Info));
        assert!(!threshold.allows(Severity::Trace));
    }

    #[test]
    fn test_default_threshold_allows_everything() {
        let threshold = Severity::default();
        assert_eq!(threshold, Severity::Trace);
        assert!(threshold.allows(Severity::Trace));
        assert!(threshold.allows(Severity::Emergency));
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Notice.to_string(), "notice");
    }

    #[test]
    fn test_serde_lowercase_round_trip() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(parsed, Severity::Warning);
    }

    #[test]
    fn test_from_str_accepts_names_case_insensitively() {
        assert_eq!("error".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!("WARNING".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
        assert!("loud".parse::<Severity>().is_err());
    }
}
