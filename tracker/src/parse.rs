//! The per-file CVE parser.
//!
//! A line is one of: blank / `#` comment (ignored), a top-level
//! `Field: value` declaration, or a continuation line starting with
//! whitespace whose meaning depends on the most recent top-level field.
//! Problems are collected into [`Diagnostics`] and raised once at the end.

use crate::diagnostics::{Diagnostics, ParseError};
use crate::notes::NotesParser;
use crate::record::{
    CANDIDATE_PREFIXES, CveRecord, CvssEntry, EXTRA_FIELDS, GLOBAL_TAG_KEY, InlineScore,
    PackageStatus, Patch, Priority, REQUIRED_FIELDS, Status, VALID_CVE_TAGS, VALID_PACKAGE_TAGS,
};
use regex::Regex;
use std::collections::{HashMap, hash_map::Entry};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use uct_common::{config, release::Registry};

/// ` <source>: <vector>` with an optional ` [<score> <severity>]` trailer.
static CVSS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(.+): (CVSS:\S+)(?: \[(\d[\d.]*) ([A-Z]+)\])?$").expect("CVSS line regex")
});

#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    /// In strict mode `PublicDate` must be non-empty as well.
    pub strict: bool,
}

/// Parse one CVE file into a [`CveRecord`].
///
/// Never returns a partial record: any problem found anywhere in the file
/// fails the whole call, with every problem folded into the error message.
pub fn load_cve(path: &Path, registry: &Registry) -> Result<CveRecord, ParseError> {
    load_cve_with(path, registry, ParseOptions::default())
}

pub fn load_cve_with(
    path: &Path,
    registry: &Registry,
    options: ParseOptions,
) -> Result<CveRecord, ParseError> {
    let text = fs::read_to_string(path)?;
    parse_cve(path, &text, registry, options)
}

/// Parse every `CVE-*` file in a directory (resolved through
/// [`config::resolve_cve_dir`]), one independent result per file.
pub fn load_all(
    dir: &Path,
    registry: &Registry,
) -> Result<Vec<(PathBuf, Result<CveRecord, ParseError>)>, std::io::Error> {
    let dir = config::resolve_cve_dir(dir);
    let mut results = Vec::new();

    let mut paths: Vec<_> = fs::read_dir(&dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with("CVE-"))
        })
        .collect();
    paths.sort();

    for path in paths {
        let result = load_cve(&path, registry);
        results.push((path, result));
    }

    Ok(results)
}

/// Parse CVE file content. Exposed at the text level so amendments and
/// tests can parse without touching the filesystem.
pub fn parse_cve(
    path: &Path,
    text: &str,
    registry: &Registry,
    options: ParseOptions,
) -> Result<CveRecord, ParseError> {
    let mut parser = Parser::new(path, registry, options);

    for (index, line) in text.lines().enumerate() {
        parser.feed(index + 1, line);
    }

    parser.finish()
}

/// The CVSS list slot: nothing seen yet, or an ordered list of entries.
/// The variant flips exactly once, on the first CVSS continuation line.
#[derive(Debug)]
enum CvssSlot {
    Unset,
    Populated(Vec<CvssEntry>),
}

impl CvssSlot {
    fn push(&mut self, entry: CvssEntry) {
        match self {
            CvssSlot::Unset => *self = CvssSlot::Populated(vec![entry]),
            CvssSlot::Populated(entries) => entries.push(entry),
        }
    }

    fn into_entries(self) -> Vec<CvssEntry> {
        match self {
            CvssSlot::Unset => Vec::new(),
            CvssSlot::Populated(entries) => entries,
        }
    }
}

struct Parser<'a> {
    registry: &'a Registry,
    options: ParseOptions,
    path: &'a Path,
    record: CveRecord,
    diags: Diagnostics,
    notes: NotesParser,
    cvss: CvssSlot,
    lastfield: String,
    /// Literal field name -> line of first occurrence.
    fields_seen: HashMap<String, usize>,
    /// (package, release) -> line of first occurrence.
    entries_seen: HashMap<(String, String), usize>,
}

impl<'a> Parser<'a> {
    fn new(path: &'a Path, registry: &'a Registry, options: ParseOptions) -> Self {
        Self {
            registry,
            options,
            path,
            record: CveRecord::default(),
            diags: Diagnostics::new(path),
            notes: NotesParser::new(),
            cvss: CvssSlot::Unset,
            lastfield: String::new(),
            fields_seen: HashMap::new(),
            entries_seen: HashMap::new(),
        }
    }

    fn feed(&mut self, linenum: usize, line: &str) {
        if line.trim().is_empty() || line.starts_with('#') {
            return;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            self.continuation(linenum, line);
            return;
        }

        let Some((name, value)) = line.split_once(':') else {
            self.diags
                .push(linenum, format!("bad line: '{}'", line.trim_end()));
            return;
        };
        let name = name.trim().to_string();
        let value = value.trim().to_string();

        match self.fields_seen.entry(name.clone()) {
            Entry::Occupied(entry) => {
                let first = *entry.get();
                self.diags.push(
                    linenum,
                    format!("duplicate field '{name}', first seen on line {first}"),
                );
            }
            Entry::Vacant(slot) => {
                slot.insert(linenum);
            }
        }
        self.lastfield = name.clone();

        self.dispatch(linenum, &name, &value);
    }

    fn dispatch(&mut self, linenum: usize, name: &str, value: &str) {
        match name {
            "Candidate" => {
                if !value.is_empty()
                    && !CANDIDATE_PREFIXES
                        .iter()
                        .any(|prefix| value.starts_with(prefix))
                {
                    self.diags
                        .push(linenum, format!("unknown Candidate '{value}'"));
                }
                self.record.set_field(name, value);
            }
            name if name == "Priority" || name.starts_with("Priority_") => {
                self.priority_field(linenum, name, value);
            }
            name if name.starts_with("Patches_") => {
                self.patches_field(linenum, name, value);
            }
            name if name == "Tags" || name.starts_with("Tags_") => {
                self.tags_field(linenum, name, value);
            }
            name if name.contains('_') => {
                self.release_package_field(linenum, name, value);
            }
            name if REQUIRED_FIELDS.contains(&name) || EXTRA_FIELDS.contains(&name) => {
                self.record.set_field(name, value);
            }
            _ => {
                self.diags.push(linenum, format!("unknown field '{name}'"));
            }
        }
    }

    fn priority_field(&mut self, linenum: usize, name: &str, value: &str) {
        let package = match name.strip_prefix("Priority_") {
            Some("") | Some("_") => {
                self.diags.push(linenum, format!("bad field '{name}'"));
                return;
            }
            Some(package) => Some(package),
            None => None,
        };

        // Only the first token counts; trailing text is commentary.
        let token = value.split_whitespace().next().unwrap_or_default();
        let Ok(priority) = token.parse::<Priority>() else {
            self.diags
                .push(linenum, format!("invalid priority '{token}' in '{name}'"));
            return;
        };

        match package {
            Some(package) => {
                self.record.priorities.insert(package.to_string(), priority);
            }
            None => self.record.set_field("Priority", priority.to_string()),
        }
    }

    fn patches_field(&mut self, linenum: usize, name: &str, value: &str) {
        let Some(package) = name.strip_prefix("Patches_").filter(|p| !p.is_empty()) else {
            self.diags.push(linenum, format!("bad field '{name}'"));
            return;
        };
        if !value.is_empty() {
            self.diags.push(
                linenum,
                format!("'{name}' must have no value, found '{value}'"),
            );
        }
        self.record.patches.entry(package.to_string()).or_default();
    }

    fn tags_field(&mut self, linenum: usize, name: &str, value: &str) {
        let (key, vocabulary): (&str, &[&str]) = match name.strip_prefix("Tags_") {
            Some("") => {
                self.diags.push(linenum, format!("bad field '{name}'"));
                return;
            }
            Some(package) => (package, VALID_PACKAGE_TAGS),
            None => (GLOBAL_TAG_KEY, VALID_CVE_TAGS),
        };

        for word in value.split_whitespace() {
            if !vocabulary.contains(&word) {
                self.diags
                    .push(linenum, format!("invalid tag '{word}' in '{name}'"));
                continue;
            }
            self.record
                .tags
                .entry(key.to_string())
                .or_default()
                .insert(word.to_string());
        }
    }

    fn release_package_field(&mut self, linenum: usize, name: &str, value: &str) {
        let entry = match parse_release_field(self.registry, name, value, self.record.assigned_to())
        {
            Ok(entry) => entry,
            Err(message) => {
                self.diags.push(linenum, message);
                return;
            }
        };

        match self
            .entries_seen
            .entry((entry.package.clone(), entry.release.clone()))
        {
            Entry::Occupied(seen) => {
                let first = *seen.get();
                self.diags.push(
                    linenum,
                    format!(
                        "duplicate entry for {} ({}), first seen on line {first}",
                        entry.package, entry.release
                    ),
                );
                return;
            }
            Entry::Vacant(slot) => {
                slot.insert(linenum);
            }
        }

        self.record
            .pkgs
            .entry(entry.package)
            .or_default()
            .insert(entry.release, entry.status);
    }

    fn continuation(&mut self, linenum: usize, line: &str) {
        if self.lastfield.is_empty() {
            self.diags.push(
                linenum,
                format!("continuation before any field: '{}'", line.trim()),
            );
            return;
        }

        let lastfield = self.lastfield.clone();
        match lastfield.as_str() {
            "Notes" => {
                if let Err(message) = self.notes.feed(line) {
                    self.diags.push(linenum, message);
                }
            }
            "CVSS" => self.cvss_line(linenum, line),
            field if field.starts_with("Patches_") => {
                let package = field["Patches_".len()..].to_string();
                let Some((kind, entry)) = line.trim().split_once(':') else {
                    self.diags
                        .push(linenum, format!("bad patch line: '{}'", line.trim()));
                    return;
                };
                self.record
                    .patches
                    .entry(package)
                    .or_default()
                    .push(Patch {
                        kind: kind.trim().to_string(),
                        entry: entry.trim().to_string(),
                    });
            }
            field => {
                // Multi-line free text: strip the single leading character.
                self.record.append_field(field, &line[1..]);
            }
        }
    }

    fn cvss_line(&mut self, linenum: usize, line: &str) {
        let Some(captures) = CVSS_LINE.captures(line) else {
            self.diags
                .push(linenum, format!("unable to parse CVSS line: '{}'", line.trim()));
            return;
        };

        let source = captures[1].trim().to_string();
        let vector = captures[2].to_string();

        let report = match uct_cvss::evaluate(&vector) {
            Ok(report) => report,
            Err(error) => {
                self.diags.push(linenum, format!("bad CVSS vector: {error}"));
                return;
            }
        };

        let inline = match (captures.get(3), captures.get(4)) {
            (Some(score), Some(severity)) => score.as_str().parse().ok().map(|score| InlineScore {
                score,
                severity: severity.as_str().to_string(),
            }),
            _ => None,
        };

        self.cvss.push(CvssEntry {
            source,
            vector,
            report,
            inline,
        });
    }

    fn finish(mut self) -> Result<CveRecord, ParseError> {
        let boilerplate = self
            .path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains("boilerplate"));

        for field in REQUIRED_FIELDS {
            if self.fields_seen.contains_key(*field) {
                continue;
            }
            // A missing Priority is not an error, it defaults.
            if *field == "Priority" {
                self.record
                    .set_field("Priority", Priority::Untriaged.to_string());
                continue;
            }
            self.diags.push(None, format!("missing field '{field}'"));
        }

        if !boilerplate {
            if self.fields_seen.contains_key("Candidate") && self.record.candidate().is_empty() {
                self.diags.push(None, "empty field 'Candidate'");
            }
            if self.options.strict
                && self.fields_seen.contains_key("PublicDate")
                && self.record.field("PublicDate").unwrap_or_default().is_empty()
            {
                self.diags.push(None, "empty field 'PublicDate'");
            }
        }

        // Every package with an internal release entry needs an upstream one.
        for (package, releases) in &self.record.pkgs {
            let has_internal = releases
                .keys()
                .any(|release| self.registry.is_internal(release));
            if has_internal && !releases.contains_key("upstream") {
                self.diags
                    .push(None, format!("missing upstream entry for '{package}'"));
            }
        }

        self.record.notes = self.notes.finalize();
        self.record.cvss = self.cvss.into_entries();

        self.diags.into_result()?;
        Ok(self.record)
    }
}

#[derive(Debug)]
pub(crate) struct ReleaseEntry {
    pub package: String,
    pub release: String,
    pub status: PackageStatus,
}

/// Parse one `<release>_<package>: <state> [details]` field.
///
/// Shared between the main parser and the external-subproject amendment
/// loader; errors come back as bare messages for the caller to attribute.
pub(crate) fn parse_release_field(
    registry: &Registry,
    name: &str,
    value: &str,
    assigned_to: &str,
) -> Result<ReleaseEntry, String> {
    let Some((release, package)) = name.split_once('_') else {
        return Err(format!("bad field with '_': '{name}'"));
    };
    if release.is_empty() || package.is_empty() {
        return Err(format!("bad field with '_': '{name}'"));
    }

    if release != "upstream" {
        let known = registry
            .subproject_details(release)
            .is_some_and(|details| details.descriptor.is_some());
        if !known {
            return Err(format!("unknown release '{release}' in '{name}'"));
        }
    }

    let (state, details) = match value.split_once(' ') {
        Some((state, details)) => (state, details.trim()),
        None => (value, ""),
    };
    let mut state = state.to_string();

    if state.is_empty() {
        state = Status::NeedsTriage.to_string();
    }

    if details.starts_with('[') {
        return Err(format!(
            "details for '{name}' may not start with '[': '{details}'"
        ));
    }
    let mut details = details.to_string();
    if let Some(stripped) = details.strip_prefix('(') {
        details = stripped.to_string();
    }
    if let Some(stripped) = details.strip_suffix(')') {
        details = stripped.to_string();
    }

    normalize_legacy_version_only_entry(&mut state, &mut details);

    let Ok(status) = state.parse::<Status>() else {
        return Err(format!("invalid state '{state}' in '{name}'"));
    };

    if status == Status::Active && assigned_to.is_empty() {
        return Err(format!(
            "'{name}' is active but no 'Assigned-to' is set"
        ));
    }

    Ok(ReleaseEntry {
        package: package.to_string(),
        release: release.to_string(),
        status: PackageStatus {
            status,
            details,
        },
    })
}

/// Legacy files put a bare version where the state belongs. Kept for
/// back-compat: `focal_pkg: 1.2-3` reads as `released (1.2-3)`.
fn normalize_legacy_version_only_entry(state: &mut String, details: &mut String) {
    if details.is_empty() && state.starts_with(|c: char| c.is_ascii_digit()) {
        *details = std::mem::take(state);
        *state = Status::Released.to_string();
    }
}
