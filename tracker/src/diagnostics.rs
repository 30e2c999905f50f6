//! Error aggregation for the per-file parse.
//!
//! The parser is deliberately lenient within a file: it records every
//! problem it can find and raises them all at once at the end, so tooling
//! can report a file's defects in a single pass.

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}: {}: {}", self.file.display(), line, self.message),
            None => write!(f, "{}: {}", self.file.display(), self.message),
        }
    }
}

/// Collects diagnostics for one file.
#[derive(Debug)]
pub struct Diagnostics {
    file: PathBuf,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, line: impl Into<Option<usize>>, message: impl Into<String>) {
        self.items.push(Diagnostic {
            file: self.file.clone(),
            line: line.into(),
            message: message.into(),
        });
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// The terminal check: `Ok` when clean, otherwise one aggregate error
    /// carrying every diagnostic collected.
    pub fn into_result(self) -> Result<(), ParseError> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(ParseError::Invalid(self.items))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{}", format_aggregate(.0))]
    Invalid(Vec<Diagnostic>),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_aggregate(items: &[Diagnostic]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_diagnostics_are_ok() {
        assert!(Diagnostics::new("CVE-2024-0001").into_result().is_ok());
    }

    #[test]
    fn aggregate_message_lists_every_problem() {
        let mut diags = Diagnostics::new("CVE-2024-0001");
        diags.push(3, "unknown field 'Banana'");
        diags.push(None, "missing field 'Candidate'");

        let err = diags.into_result().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("CVE-2024-0001: 3: unknown field 'Banana'"));
        assert!(message.contains("missing field 'Candidate'"));
    }
}
