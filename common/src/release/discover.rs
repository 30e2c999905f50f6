//! External subproject discovery.
//!
//! A subproject lives at `<root>/<product>/<series>/` and is recognised by a
//! file literally named `supported.txt` (the package list). An adjacent
//! `config.yaml` may enrich the descriptor; failures there are best-effort
//! and never abort the scan.

use super::{Origin, Ppa, ReleaseDescriptor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const SUPPORTED_FILE: &str = "supported.txt";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Default, Deserialize)]
struct SubprojectConfig {
    #[serde(default)]
    ppa: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parent: Option<String>,
}

/// Outcome of discovering one subproject.
#[derive(Debug)]
pub struct DiscoveryReport {
    /// The `product/series` key derived from the directory layout.
    pub key: String,
    /// `Err` when a `config.yaml` was present but could not be applied. The
    /// subproject itself is still registered.
    pub enrichment: Result<(), anyhow::Error>,
}

pub(super) fn scan(
    releases: &mut BTreeMap<String, ReleaseDescriptor>,
    root: &Path,
) -> Vec<DiscoveryReport> {
    let mut reports = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() || entry.file_name() != SUPPORTED_FILE {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let Ok(relative) = dir.strip_prefix(root) else {
            continue;
        };

        // The path between the root and supported.txt is the key.
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !key.contains('/') {
            log::debug!("skipping {key:?}: not a product/series directory");
            continue;
        }

        let packages = read_packages(entry.path());
        let descriptor = releases
            .entry(key.clone())
            .or_insert_with(|| ReleaseDescriptor::new(&key, Origin::External));
        if descriptor.packages.is_empty() {
            descriptor.packages = packages;
        }

        let enrichment = enrich(descriptor, &dir.join(CONFIG_FILE));
        if let Err(error) = &enrichment {
            log::warn!("subproject {key}: config.yaml not applied: {error}");
        }

        reports.push(DiscoveryReport { key, enrichment });
    }

    reports
}

fn read_packages(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(text) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(ToString::to_string)
            .collect(),
        Err(error) => {
            log::warn!("unreadable {}: {error}", path.display());
            Vec::new()
        }
    }
}

fn enrich(descriptor: &mut ReleaseDescriptor, config: &Path) -> Result<(), anyhow::Error> {
    if !config.is_file() {
        return Ok(());
    }

    let text = fs::read_to_string(config)?;
    let config: SubprojectConfig = serde_yml::from_str(&text)?;

    if let Some(ppa) = config.ppa {
        descriptor.ppas.push(Ppa {
            ppa,
            pocket: "release".to_string(),
        });
    }
    if config.name.is_some() {
        descriptor.name = config.name;
    }
    if config.description.is_some() {
        descriptor.description = config.description;
    }
    if config.parent.is_some() {
        descriptor.parent = config.parent;
    }

    Ok(())
}
