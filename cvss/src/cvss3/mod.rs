use crate::cvss3::score::Score;
use crate::cvss3::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod report;
pub mod score;
pub mod severity;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("malformed vector element {element:?}")]
    MalformedElement { element: String },
    #[error("unsupported CVSS version {version:?}: only 3.x is supported")]
    UnsupportedVersion { version: String },
    #[error("invalid value {value:?} for {metric}")]
    InvalidMetric { metric: &'static str, value: String },
    #[error("missing element {metric}")]
    MissingMetric { metric: &'static str },
}

/// The 8 base metrics of a CVSS v3.x vector.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Cvss3Base {
    pub minor_version: u8,
    pub av: AttackVector,
    pub ac: AttackComplexity,
    pub pr: PrivilegesRequired,
    pub ui: UserInteraction,
    pub s: Scope,
    pub c: Confidentiality,
    pub i: Integrity,
    pub a: Availability,
}

impl Cvss3Base {
    /// Calculate the Base CVSS score, the overall 0.0 - 10.0 value generally
    /// referred to as "the CVSS score".
    ///
    /// Formula from the CVSS v3.1 Specification, Section 7.1. The final
    /// rounding is the specification's roundup-to-0.1, not ordinary rounding.
    pub fn score(&self) -> Score {
        let impact = self.impact();
        let exploitability = self.exploitability();

        let score = if impact <= 0.0 {
            0.0
        } else if !self.is_scope_changed() {
            (impact + exploitability).min(10.0)
        } else {
            (1.08 * (impact + exploitability)).min(10.0)
        };

        Score::new(score).roundup()
    }

    /// The raw exploitability sub-score (8.22 * AV * AC * PR * UI).
    pub fn exploitability(&self) -> f64 {
        8.22 * self.av.weight()
            * self.ac.weight()
            * self.pr.scoped_weight(self.is_scope_changed())
            * self.ui.weight()
    }

    /// The ISS term: 1 - (1-C)(1-I)(1-A).
    pub fn impact_subscore(&self) -> f64 {
        1.0 - ((1.0 - self.c.weight()) * (1.0 - self.i.weight()) * (1.0 - self.a.weight()))
    }

    /// The raw, scope-adjusted impact sub-score. Negative when the vector
    /// has no impact at all and the scope is changed.
    pub fn impact(&self) -> f64 {
        let iss = self.impact_subscore();
        if !self.is_scope_changed() {
            6.42 * iss
        } else {
            (7.52 * (iss - 0.029)) - (3.25 * (iss - 0.02).powf(15.0))
        }
    }

    pub fn severity(&self) -> Severity {
        self.score().severity()
    }

    fn is_scope_changed(&self) -> bool {
        self.s == Scope::Changed
    }
}

impl Display for Cvss3Base {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CVSS:3.{}/AV:{}/AC:{}/PR:{}/UI:{}/S:{}/C:{}/I:{}/A:{}",
            self.minor_version, self.av, self.ac, self.pr, self.ui, self.s, self.c, self.i, self.a
        )
    }
}

impl FromStr for Cvss3Base {
    type Err = Error;

    /// Parse a `/`-delimited vector string. The leading element fixes the
    /// version (3.0 or 3.1 only); the remaining elements may appear in any
    /// order, but all 8 base metrics must be present.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut minor_version = None;
        let mut av = None;
        let mut ac = None;
        let mut pr = None;
        let mut ui = None;
        let mut scope = None;
        let mut c = None;
        let mut i = None;
        let mut a = None;

        for (index, element) in s.split('/').enumerate() {
            let Some((key, value)) = element.split_once(':') else {
                return Err(Error::MalformedElement {
                    element: element.to_string(),
                });
            };

            if index == 0 {
                if key != "CVSS" {
                    return Err(Error::MalformedElement {
                        element: element.to_string(),
                    });
                }
                minor_version = Some(match value {
                    "3.0" => 0,
                    "3.1" => 1,
                    other => {
                        return Err(Error::UnsupportedVersion {
                            version: other.to_string(),
                        });
                    }
                });
                continue;
            }

            match key {
                "AV" => av = Some(AttackVector::from_value(value)?),
                "AC" => ac = Some(AttackComplexity::from_value(value)?),
                "PR" => pr = Some(PrivilegesRequired::from_value(value)?),
                "UI" => ui = Some(UserInteraction::from_value(value)?),
                "S" => scope = Some(Scope::from_value(value)?),
                "C" => c = Some(Confidentiality::from_value(value)?),
                "I" => i = Some(Integrity::from_value(value)?),
                "A" => a = Some(Availability::from_value(value)?),
                _ => {
                    return Err(Error::MalformedElement {
                        element: element.to_string(),
                    });
                }
            }
        }

        Ok(Cvss3Base {
            minor_version: minor_version.ok_or(Error::MissingMetric { metric: "version" })?,
            av: av.ok_or(Error::MissingMetric {
                metric: "attackVector",
            })?,
            ac: ac.ok_or(Error::MissingMetric {
                metric: "attackComplexity",
            })?,
            pr: pr.ok_or(Error::MissingMetric {
                metric: "privilegesRequired",
            })?,
            ui: ui.ok_or(Error::MissingMetric {
                metric: "userInteraction",
            })?,
            s: scope.ok_or(Error::MissingMetric { metric: "scope" })?,
            c: c.ok_or(Error::MissingMetric {
                metric: "confidentialityImpact",
            })?,
            i: i.ok_or(Error::MissingMetric {
                metric: "integrityImpact",
            })?,
            a: a.ok_or(Error::MissingMetric {
                metric: "availabilityImpact",
            })?,
        })
    }
}

// Metric values match on the first character of the value token, so both the
// abbreviated ("N") and spelled-out ("NETWORK") forms are accepted.
fn first_char(metric: &'static str, value: &str) -> Result<char, Error> {
    value.chars().next().ok_or(Error::InvalidMetric {
        metric,
        value: value.to_string(),
    })
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackVector {
    Network,
    Adjacent,
    Local,
    Physical,
}

impl AttackVector {
    fn from_value(value: &str) -> Result<Self, Error> {
        match first_char("attackVector", value)? {
            'N' => Ok(Self::Network),
            'A' => Ok(Self::Adjacent),
            'L' => Ok(Self::Local),
            'P' => Ok(Self::Physical),
            _ => Err(Error::InvalidMetric {
                metric: "attackVector",
                value: value.to_string(),
            }),
        }
    }

    fn weight(self) -> f64 {
        match self {
            Self::Network => 0.85,
            Self::Adjacent => 0.62,
            Self::Local => 0.55,
            Self::Physical => 0.20,
        }
    }
}

impl Display for AttackVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Network => 'N',
                Self::Adjacent => 'A',
                Self::Local => 'L',
                Self::Physical => 'P',
            }
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackComplexity {
    Low,
    High,
}

impl AttackComplexity {
    fn from_value(value: &str) -> Result<Self, Error> {
        match first_char("attackComplexity", value)? {
            'L' => Ok(Self::Low),
            'H' => Ok(Self::High),
            _ => Err(Error::InvalidMetric {
                metric: "attackComplexity",
                value: value.to_string(),
            }),
        }
    }

    fn weight(self) -> f64 {
        match self {
            Self::Low => 0.77,
            Self::High => 0.44,
        }
    }
}

impl Display for AttackComplexity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Low => 'L',
                Self::High => 'H',
            }
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivilegesRequired {
    None,
    Low,
    High,
}

impl PrivilegesRequired {
    fn from_value(value: &str) -> Result<Self, Error> {
        match first_char("privilegesRequired", value)? {
            'N' => Ok(Self::None),
            'L' => Ok(Self::Low),
            'H' => Ok(Self::High),
            _ => Err(Error::InvalidMetric {
                metric: "privilegesRequired",
                value: value.to_string(),
            }),
        }
    }

    /// The PR weight depends on whether the scope changed.
    pub fn scoped_weight(self, scope_changed: bool) -> f64 {
        match self {
            Self::None => 0.85,
            Self::Low => {
                if scope_changed {
                    0.68
                } else {
                    0.62
                }
            }
            Self::High => {
                if scope_changed {
                    0.50
                } else {
                    0.27
                }
            }
        }
    }
}

impl Display for PrivilegesRequired {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => 'N',
                Self::Low => 'L',
                Self::High => 'H',
            }
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserInteraction {
    None,
    Required,
}

impl UserInteraction {
    fn from_value(value: &str) -> Result<Self, Error> {
        match first_char("userInteraction", value)? {
            'N' => Ok(Self::None),
            'R' => Ok(Self::Required),
            _ => Err(Error::InvalidMetric {
                metric: "userInteraction",
                value: value.to_string(),
            }),
        }
    }

    fn weight(self) -> f64 {
        match self {
            Self::None => 0.85,
            Self::Required => 0.62,
        }
    }
}

impl Display for UserInteraction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => 'N',
                Self::Required => 'R',
            }
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    Unchanged,
    Changed,
}

impl Scope {
    fn from_value(value: &str) -> Result<Self, Error> {
        match first_char("scope", value)? {
            'U' => Ok(Self::Unchanged),
            'C' => Ok(Self::Changed),
            _ => Err(Error::InvalidMetric {
                metric: "scope",
                value: value.to_string(),
            }),
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Unchanged => 'U',
                Self::Changed => 'C',
            }
        )
    }
}

macro_rules! impact_metric {
    ($name:ident, $metric:literal) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            None,
            Low,
            High,
        }

        impl $name {
            fn from_value(value: &str) -> Result<Self, Error> {
                match first_char($metric, value)? {
                    'N' => Ok(Self::None),
                    'L' => Ok(Self::Low),
                    'H' => Ok(Self::High),
                    _ => Err(Error::InvalidMetric {
                        metric: $metric,
                        value: value.to_string(),
                    }),
                }
            }

            fn weight(self) -> f64 {
                match self {
                    Self::None => 0.0,
                    Self::Low => 0.22,
                    Self::High => 0.56,
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(
                    f,
                    "{}",
                    match self {
                        Self::None => 'N',
                        Self::Low => 'L',
                        Self::High => 'H',
                    }
                )
            }
        }
    };
}

impact_metric!(Confidentiality, "confidentialityImpact");
impact_metric!(Integrity, "integrityImpact");
impact_metric!(Availability, "availabilityImpact");
