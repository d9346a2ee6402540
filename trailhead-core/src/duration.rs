//! Duration parsing for sleep steps and hook timeouts.
//!
//! Accepts either a bare integer (milliseconds) or a suffixed string —
//! `"Ns"`, `"Nm"`, `"Nh"`, `"Nd"` — the shorthand used throughout
//! `OrchestrationConfig`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error parsing a [`DurationSpec`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid duration spec: {0}")]
pub struct DurationParseError(pub String);

/// A duration expressed either as a plain millisecond count or as a
/// suffixed shorthand string (`"7d"`, `"30s"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DurationSpec(Duration);

impl DurationSpec {
    /// Construct directly from a `Duration`.
    pub fn from_duration(d: Duration) -> Self {
        Self(d)
    }

    /// Parse a shorthand string or plain integer millisecond count.
    pub fn parse(raw: &str) -> Result<Self, DurationParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DurationParseError(raw.to_string()));
        }
        if let Ok(ms) = raw.parse::<u64>() {
            return Ok(Self(Duration::from_millis(ms)));
        }
        let (num_part, unit) = raw.split_at(raw.len() - 1);
        let n: u64 = num_part
            .parse()
            .map_err(|_| DurationParseError(raw.to_string()))?;
        let secs = match unit {
            "s" => n,
            "m" => n.saturating_mul(60),
            "h" => n.saturating_mul(3600),
            "d" => n.saturating_mul(86_400),
            _ => return Err(DurationParseError(raw.to_string())),
        };
        Ok(Self(Duration::from_secs(secs)))
    }

    /// The parsed duration as `std::time::Duration`.
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl Default for DurationSpec {
    /// `"7d"` — the orchestration engine's default hook timeout.
    fn default() -> Self {
        Self::parse("7d").expect("7d is a valid duration spec")
    }
}

impl Serialize for DurationSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0.as_millis() as u64)
    }
}

impl<'de> Deserialize<'de> for DurationSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Millis(u64),
            Spec(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Millis(ms) => Ok(DurationSpec(Duration::from_millis(ms))),
            Repr::Spec(s) => DurationSpec::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integer_as_millis() {
        assert_eq!(DurationSpec::parse("1500").unwrap().as_duration(), Duration::from_millis(1500));
    }

    #[test]
    fn parses_suffixed_shorthand() {
        assert_eq!(DurationSpec::parse("30s").unwrap().as_duration(), Duration::from_secs(30));
        assert_eq!(DurationSpec::parse("1m").unwrap().as_duration(), Duration::from_secs(60));
        assert_eq!(DurationSpec::parse("2h").unwrap().as_duration(), Duration::from_secs(7200));
        assert_eq!(DurationSpec::parse("1d").unwrap().as_duration(), Duration::from_secs(86_400));
    }

    #[test]
    fn rejects_garbage() {
        assert!(DurationSpec::parse("").is_err());
        assert!(DurationSpec::parse("5x").is_err());
        assert!(DurationSpec::parse("s5").is_err());
    }

    #[test]
    fn default_hook_timeout_is_seven_days() {
        assert_eq!(DurationSpec::default().as_duration(), Duration::from_secs(7 * 86_400));
    }
}
