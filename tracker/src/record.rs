use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uct_cvss::CvssReport;

/// Fields every record must declare (possibly with an empty value).
pub const REQUIRED_FIELDS: &[&str] = &[
    "Candidate",
    "PublicDate",
    "References",
    "Description",
    "Ubuntu-Description",
    "Notes",
    "Bugs",
    "Priority",
    "Discovered-by",
    "Assigned-to",
    "CVSS",
];

/// Optional top-level fields.
pub const EXTRA_FIELDS: &[&str] = &["CRD", "PublicDateAtUSN", "Mitigation"];

/// Accepted prefixes for the `Candidate` field.
pub const CANDIDATE_PREFIXES: &[&str] = &["CVE-", "UEM-", "EMB-"];

/// Tags valid on the record as a whole (`Tags:`).
pub const VALID_CVE_TAGS: &[&str] = &["cisa-kev"];

/// Tags valid on a single package (`Tags_<pkg>:`).
pub const VALID_PACKAGE_TAGS: &[&str] = &[
    "universe-binary",
    "not-ue",
    "apparmor",
    "stack-protector",
    "fortify-source",
    "symlink-restriction",
    "hardlink-restriction",
    "heap-protector",
    "pie",
];

/// Key under which record-wide tags are stored in [`CveRecord::tags`].
pub const GLOBAL_TAG_KEY: &str = "*";

/// Per-release state of a package.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantArray,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    NeedsTriage,
    Needed,
    Active,
    Pending,
    Released,
    Deferred,
    #[strum(serialize = "DNE")]
    #[serde(rename = "DNE")]
    Dne,
    Ignored,
    NotAffected,
}

/// Record or per-package priority.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantArray,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Untriaged,
    NotForUs,
    Negligible,
    Low,
    Medium,
    High,
    Critical,
}

/// The `[state, details]` pair attached to one (package, release) slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageStatus {
    pub status: Status,
    /// Free text, often a version string. Parenthesized annotations arrive
    /// here already unwrapped.
    pub details: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub author: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub kind: String,
    pub entry: String,
}

/// The optional `[<score> <severity>]` annotation trailing a CVSS line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InlineScore {
    pub score: f64,
    pub severity: String,
}

/// One evaluated CVSS line of a record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CvssEntry {
    /// Who assigned the vector, e.g. `nvd`.
    pub source: String,
    pub vector: String,
    pub report: CvssReport,
    /// Annotation as found in the file; the computed report is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<InlineScore>,
}

/// A fully parsed CVE record.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CveRecord {
    /// Scalar fields in file order.
    fields: Vec<(String, String)>,
    /// package -> release token -> state.
    pub pkgs: BTreeMap<String, BTreeMap<String, PackageStatus>>,
    /// package (or `"*"`) -> tag set.
    pub tags: BTreeMap<String, BTreeSet<String>>,
    /// package -> patch entries, in file order.
    pub patches: BTreeMap<String, Vec<Patch>>,
    /// `Priority_<pkg>` overrides.
    pub priorities: BTreeMap<String, Priority>,
    pub notes: Vec<Note>,
    pub cvss: Vec<CvssEntry>,
}

impl CveRecord {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set a scalar field, replacing any earlier value but keeping its
    /// original position.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, slot)) => *slot = value.into(),
            None => self.fields.push((name.to_string(), value.into())),
        }
    }

    /// Append a continuation line to a multi-line field.
    pub fn append_field(&mut self, name: &str, line: &str) {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, value)) => {
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(line);
            }
            None => self.fields.push((name.to_string(), line.to_string())),
        }
    }

    /// Scalar fields in file order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn candidate(&self) -> &str {
        self.field("Candidate").unwrap_or_default()
    }

    pub fn assigned_to(&self) -> &str {
        self.field("Assigned-to").unwrap_or_default()
    }

    /// The record-wide priority; defaults to untriaged.
    pub fn priority(&self) -> Priority {
        self.field("Priority")
            .and_then(|value| value.parse().ok())
            .unwrap_or(Priority::Untriaged)
    }

    /// The effective priority of a package, falling back to the record-wide
    /// one.
    pub fn package_priority(&self, package: &str) -> Priority {
        self.priorities
            .get(package)
            .copied()
            .unwrap_or_else(|| self.priority())
    }
}
