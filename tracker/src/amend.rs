//! External-subproject amendments.
//!
//! A subproject may ship per-CVE snippet files named after the candidate id,
//! living in `<root>/<product>/` (preferred) or `<root>/<product>/<series>/`
//! (fallback). Their content is restricted to release/status fields and
//! overrides the base record's matching (package, release) slots. A missing
//! or malformed snippet contributes nothing.

use crate::parse::parse_release_field;
use crate::record::CveRecord;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use uct_common::release::Registry;

/// Merge every applicable subproject snippet into `record`. Returns the
/// snippet files that were applied.
pub fn amend_from_subprojects(
    record: &mut CveRecord,
    registry: &Registry,
    root: &Path,
) -> Vec<PathBuf> {
    let candidate = record.candidate().to_string();
    if candidate.is_empty() {
        return Vec::new();
    }

    let mut applied = Vec::new();
    let mut seen = BTreeSet::new();

    for descriptor in registry.external() {
        let product_wide = root.join(&descriptor.product).join(&candidate);
        let series_specific = root
            .join(&descriptor.product)
            .join(&descriptor.series)
            .join(&candidate);

        let path = if product_wide.is_file() {
            product_wide
        } else if series_specific.is_file() {
            series_specific
        } else {
            continue;
        };
        if !seen.insert(path.clone()) {
            continue;
        }

        match fs::read_to_string(&path) {
            Ok(text) => {
                apply(record, registry, &path, &text);
                applied.push(path);
            }
            Err(error) => {
                log::warn!("unreadable amendment {}: {error}", path.display());
            }
        }
    }

    applied
}

fn apply(record: &mut CveRecord, registry: &Registry, path: &Path, text: &str) {
    for line in text.lines() {
        if line.trim().is_empty() || line.starts_with('#') || line.starts_with(' ') {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            log::warn!("{}: skipping bad line: '{line}'", path.display());
            continue;
        };
        let name = name.trim();
        let value = value.trim();

        if !name.contains('_') {
            log::warn!(
                "{}: only release/status fields may be amended, skipping '{name}'",
                path.display()
            );
            continue;
        }

        match parse_release_field(registry, name, value, record.assigned_to()) {
            Ok(entry) => {
                // Amendments override whatever the base record had.
                record
                    .pkgs
                    .entry(entry.package)
                    .or_default()
                    .insert(entry.release, entry.status);
            }
            Err(message) => {
                log::warn!("{}: skipping amendment: {message}", path.display());
            }
        }
    }
}
