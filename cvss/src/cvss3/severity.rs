use serde::{Deserialize, Serialize, de, ser};
use std::fmt;
use std::str::FromStr;

/// Qualitative Severity Rating Scale (CVSS v3.1 Specification, Section 5).
///
/// Rendered in the uppercase form CVSS JSON records use ("CRITICAL" etc).
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Score 0.0
    None,
    /// Score 0.1 - 3.9
    Low,
    /// Score 4.0 - 6.9
    Medium,
    /// Score 7.0 - 8.9
    High,
    /// Score 9.0 - 10.0
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// The first band whose upper bound covers the score.
    pub fn from_f64(value: f64) -> Severity {
        match value {
            x if x < 0.1 => Severity::None,
            x if x < 4.0 => Severity::Low,
            x if x < 7.0 => Severity::Medium,
            x if x < 9.0 => Severity::High,
            _ => Severity::Critical,
        }
    }
}

impl From<f64> for Severity {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid severity {name:?}")]
pub struct InvalidSeverity {
    pub name: String,
}

impl FromStr for Severity {
    type Err = InvalidSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Severity::None),
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(InvalidSeverity { name: s.to_owned() }),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

impl Serialize for Severity {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_str().serialize(serializer)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_through_strings() {
        for severity in [
            Severity::None,
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            assert_eq!(severity.as_str().parse::<Severity>().unwrap(), severity);
        }
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
    }

    #[test]
    fn unknown_severity_is_rejected() {
        assert!("apocalyptic".parse::<Severity>().is_err());
    }
}
