use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable pointing at a checkout of the tracker data. Used as
/// a fallback prefix when resolving paths.
pub const UCT_ENV: &str = "UCT";

/// Resolve the root directory holding external subproject definitions.
///
/// An explicit override wins, then `$UCT/subprojects`, then `./subprojects`.
pub fn subprojects_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    match env::var_os(UCT_ENV) {
        Some(root) => PathBuf::from(root).join("subprojects"),
        None => PathBuf::from("subprojects"),
    }
}

fn has_cve_files(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };

    entries
        .flatten()
        .any(|entry| entry.file_name().to_string_lossy().starts_with("CVE-"))
}

/// Resolve a directory expected to contain `CVE-*` files.
///
/// When the given path has none, `$UCT/<path>` is tried; the original path is
/// returned unchanged if neither candidate matches. Never fails.
pub fn resolve_cve_dir(path: &Path) -> PathBuf {
    if has_cve_files(path) {
        return path.to_path_buf();
    }

    if let Some(root) = env::var_os(UCT_ENV) {
        let candidate = PathBuf::from(root).join(path);
        if has_cve_files(&candidate) {
            log::debug!(
                "resolved CVE directory {} via ${UCT_ENV}",
                candidate.display()
            );
            return candidate;
        }
    }

    path.to_path_buf()
}
