//! The release/subproject registry.
//!
//! Every `product/series` combination the tracker knows about is described
//! here: the builtin Ubuntu and ESM releases plus any external subprojects
//! discovered on disk. The registry is built once and immutable afterwards,
//! so concurrent readers need no locking.

mod discover;
mod table;

pub use discover::DiscoveryReport;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Where a descriptor came from. `Static` entries are part of the builtin
/// table and count as "internal" for record validation; `External` entries
/// were discovered under the subprojects root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Static,
    External,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ppa {
    pub ppa: String,
    pub pocket: String,
}

/// One known `product/series` combination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    pub product: String,
    pub series: String,
    /// Canonical short name, e.g. `xenial` for `ubuntu/xenial`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub eol: bool,
    pub oval: bool,
    pub devel: bool,
    /// Key of the release this one derives from, forming a chain such as
    /// esm-apps/xenial -> esm-infra/xenial -> ubuntu/xenial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ppas: Vec<Ppa>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub origin: Origin,
}

impl ReleaseDescriptor {
    /// A minimal descriptor for a `product/series` key. The key splits on
    /// the first `/`; a bare series belongs to the `ubuntu` product.
    pub fn new(key: &str, origin: Origin) -> Self {
        let (product, series) = match key.split_once('/') {
            Some((product, series)) => (product.to_string(), series.to_string()),
            None => ("ubuntu".to_string(), key.to_string()),
        };

        Self {
            product,
            series,
            alias: None,
            eol: false,
            oval: false,
            devel: false,
            parent: None,
            components: Vec::new(),
            packages: Vec::new(),
            ppas: Vec::new(),
            name: None,
            description: None,
            origin,
        }
    }

    pub fn key(&self) -> String {
        format!("{}/{}", self.product, self.series)
    }
}

/// Resolution of a release token against the registry.
#[derive(Clone, Debug, PartialEq)]
pub struct SubprojectDetails<'a> {
    /// The canonical `product/series` key.
    pub canonical: String,
    pub product: String,
    pub series: String,
    pub descriptor: Option<&'a ReleaseDescriptor>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("there can be only one devel release: both {first:?} and {second:?} claim it")]
    MultipleDevel { first: String, second: String },
}

/// Builds a [`Registry`]: builtin table first, then optional filesystem
/// discovery, then a final structural check.
#[derive(Debug)]
pub struct RegistryBuilder {
    releases: BTreeMap<String, ReleaseDescriptor>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// A builder seeded with the builtin release table.
    pub fn new() -> Self {
        let mut builder = Self::empty();
        for descriptor in table::builtin() {
            builder.insert(descriptor);
        }
        builder
    }

    /// A builder with no releases at all, for synthetic registries in tests.
    pub fn empty() -> Self {
        Self {
            releases: BTreeMap::new(),
        }
    }

    /// Insert a descriptor, replacing any previous entry for the same key.
    pub fn insert(&mut self, descriptor: ReleaseDescriptor) -> &mut Self {
        self.releases.insert(descriptor.key(), descriptor);
        self
    }

    /// Scan `root` for external subprojects (see [`discover`]). Enrichment
    /// problems are reported per subproject and never abort the scan.
    pub fn discover(&mut self, root: &Path) -> Vec<DiscoveryReport> {
        discover::scan(&mut self.releases, root)
    }

    /// Finalize into an immutable [`Registry`].
    ///
    /// Fails when more than one descriptor is flagged `devel`: that is a
    /// structural corruption of the table, not a per-file problem.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut devel = None;
        for (key, descriptor) in &self.releases {
            if descriptor.devel {
                if let Some(first) = devel {
                    return Err(RegistryError::MultipleDevel {
                        first,
                        second: key.clone(),
                    });
                }
                devel = Some(key.clone());
            }
        }

        let mut aliases = BTreeMap::new();
        for (key, descriptor) in &self.releases {
            if let Some(alias) = &descriptor.alias {
                aliases.insert(alias.clone(), key.clone());
            }
        }

        Ok(Registry {
            releases: self.releases,
            aliases,
            devel,
        })
    }
}

/// The immutable registry of known releases and subprojects.
#[derive(Clone, Debug)]
pub struct Registry {
    releases: BTreeMap<String, ReleaseDescriptor>,
    aliases: BTreeMap<String, String>,
    devel: Option<String>,
}

impl Registry {
    /// Resolve a release token to its canonical key and descriptor.
    ///
    /// Accepts direct `product/series` keys, registered aliases, and the
    /// special token `devel` (which resolves to the current devel release).
    /// A token of the `product/series` shape that is unknown still resolves
    /// to its product and series parts, with no descriptor attached.
    pub fn subproject_details(&self, token: &str) -> Option<SubprojectDetails<'_>> {
        let canonical = if token == "devel" {
            self.devel.clone()?
        } else if self.releases.contains_key(token) {
            token.to_string()
        } else if let Some(key) = self.aliases.get(token) {
            key.clone()
        } else if token.contains('/') {
            token.to_string()
        } else {
            // A bare series name with no alias registered.
            let key = format!("ubuntu/{token}");
            if !self.releases.contains_key(&key) {
                return None;
            }
            key
        };

        let (product, series) = canonical.split_once('/')?;

        Some(SubprojectDetails {
            product: product.to_string(),
            series: series.to_string(),
            descriptor: self.releases.get(&canonical),
            canonical,
        })
    }

    /// The short alias for a release token, falling back to the token
    /// itself. Never fails.
    pub fn release_alias(&self, token: &str) -> String {
        match self.subproject_details(token) {
            Some(details) => match details.descriptor.and_then(|d| d.alias.clone()) {
                Some(alias) => alias,
                None => token.to_string(),
            },
            None => token.to_string(),
        }
    }

    /// The parent key of a release token, or `None` when the token is
    /// unknown or has no parent. Never fails.
    pub fn release_parent(&self, token: &str) -> Option<String> {
        self.subproject_details(token)?
            .descriptor
            .and_then(|descriptor| descriptor.parent.clone())
    }

    /// Is this token a known release from the builtin table?
    pub fn is_internal(&self, token: &str) -> bool {
        self.subproject_details(token)
            .and_then(|details| details.descriptor)
            .is_some_and(|descriptor| descriptor.origin == Origin::Static)
    }

    /// Is this token a known external subproject?
    pub fn is_external(&self, token: &str) -> bool {
        self.subproject_details(token)
            .and_then(|details| details.descriptor)
            .is_some_and(|descriptor| descriptor.origin == Origin::External)
    }

    /// The key of the current devel release, when one is configured.
    pub fn devel(&self) -> Option<&str> {
        self.devel.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&ReleaseDescriptor> {
        self.releases.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReleaseDescriptor)> {
        self.releases
            .iter()
            .map(|(key, descriptor)| (key.as_str(), descriptor))
    }

    /// All discovered external subprojects.
    pub fn external(&self) -> impl Iterator<Item = &ReleaseDescriptor> {
        self.releases
            .values()
            .filter(|descriptor| descriptor.origin == Origin::External)
    }
}
