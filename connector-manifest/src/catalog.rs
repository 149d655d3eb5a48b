//! Collection of validated manifests keyed by provider.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use connector_primitives::ProviderId;
use tracing::{debug, warn};

use crate::error::{ManifestError, ManifestResult};
use crate::model::Manifest;

const BUILTIN: &[(&str, &str)] = &[
    ("calendly.json", include_str!("../manifests/calendly.json")),
    ("github.json", include_str!("../manifests/github.json")),
    ("google_drive.json", include_str!("../manifests/google_drive.json")),
    ("google_tasks.json", include_str!("../manifests/google_tasks.json")),
    ("lever.json", include_str!("../manifests/lever.json")),
];

/// Validated manifests, at most one per provider.
#[derive(Clone, Debug, Default)]
pub struct ManifestCatalog {
    manifests: BTreeMap<ProviderId, Arc<Manifest>>,
}

impl ManifestCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the manifests bundled with this crate.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (name, raw) in BUILTIN {
            catalog.insert_or_log(name, Manifest::from_json_str(raw));
        }
        catalog
    }

    /// Loads every `*.json` file in `dir`.
    ///
    /// Files that fail to parse or validate are logged and skipped so that one
    /// bad manifest never hides the others.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Io`] only when the directory itself cannot be
    /// listed.
    pub fn load_dir(dir: impl AsRef<Path>) -> ManifestResult<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| ManifestError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut catalog = Self::new();
        for path in paths {
            let loaded = fs::read_to_string(&path)
                .map_err(|source| ManifestError::Io {
                    path: path.clone(),
                    source,
                })
                .and_then(|raw| Manifest::from_json_str(&raw));
            catalog.insert_or_log(&path.display().to_string(), loaded);
        }
        Ok(catalog)
    }

    /// Adds a manifest, returning the one it replaced.
    pub fn insert(&mut self, manifest: Manifest) -> Option<Arc<Manifest>> {
        self.manifests
            .insert(manifest.provider().clone(), Arc::new(manifest))
    }

    /// Merges `other` into `self`; entries from `other` win.
    pub fn extend(&mut self, other: ManifestCatalog) {
        self.manifests.extend(other.manifests);
    }

    /// Returns the manifest for a provider.
    #[must_use]
    pub fn get(&self, provider: &ProviderId) -> Option<Arc<Manifest>> {
        self.manifests.get(provider).cloned()
    }

    /// Returns `true` when a maintained manifest exists for the provider.
    #[must_use]
    pub fn contains(&self, provider: &ProviderId) -> bool {
        self.manifests.contains_key(provider)
    }

    /// Iterates manifests in provider order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Manifest>> {
        self.manifests.values()
    }

    /// Number of manifests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    /// Returns `true` when the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    fn insert_or_log(&mut self, source: &str, loaded: ManifestResult<Manifest>) {
        match loaded {
            Ok(manifest) => {
                debug!(provider = %manifest.provider(), source, "manifest loaded");
                if let Some(previous) = self.insert(manifest) {
                    warn!(provider = %previous.provider(), source, "manifest replaced an earlier definition");
                }
            }
            Err(err) => warn!(source, error = %err, "skipping invalid manifest"),
        }
    }
}
