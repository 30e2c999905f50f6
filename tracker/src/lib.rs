//! Parser for the Ubuntu CVE Tracker file format.
//!
//! One file holds one CVE record: top-level `Field: value` lines,
//! continuation lines for multi-line fields (descriptions, notes, patches,
//! CVSS vectors), and per-package/per-release status fields validated
//! against the release registry from `uct-common`.

pub mod amend;
pub mod diagnostics;
pub mod notes;
pub mod parse;
pub mod record;

pub use diagnostics::ParseError;
pub use parse::{ParseOptions, load_all, load_cve, load_cve_with};
pub use record::CveRecord;
