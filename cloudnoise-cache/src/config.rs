//! noise.toml manifest parsing
//!
//! A manifest names a store and the volumes that should exist in it:
//!
//! ```toml
//! [cache]
//! root = "noise-cache"
//! can_generate = true
//! policy = "load-available-else-generate"
//!
//! [[volume]]
//! name = "clouds"
//! resolution = 64
//! noise_mode = "mix"
//! perlin = { octaves = 4, periods = 4, brightness = 1.0, contrast = 1.0 }
//! worley = { octaves = 3, periods = 4, brightness = 1.0, contrast = 1.5 }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use hashbrown::HashSet;
use serde::Deserialize;

use crate::{FsSliceStore, LoadPolicy, Lookup, VolumeCache, VolumeRequest};

/// noise.toml manifest structure
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoiseManifest {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default, rename = "volume")]
    pub volumes: Vec<VolumeRequest>,
}

/// Store location and policy
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Store root, relative to the manifest's directory unless absolute.
    /// Default: "noise-cache"
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Whether missing volumes may be generated.
    /// Default: true
    #[serde(default = "default_can_generate")]
    pub can_generate: bool,

    /// Policy used by `build_all`.
    /// Default: load-available-else-generate
    #[serde(default)]
    pub policy: LoadPolicy,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            can_generate: default_can_generate(),
            policy: LoadPolicy::default(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("noise-cache")
}

fn default_can_generate() -> bool {
    true
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<NoiseManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_manifest(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse manifest text
pub fn parse_manifest(content: &str) -> Result<NoiseManifest> {
    let manifest: NoiseManifest = toml::from_str(content)?;
    Ok(manifest)
}

impl NoiseManifest {
    /// Check every volume request and reject duplicate names.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for request in &self.volumes {
            request
                .validate()
                .with_context(|| format!("Invalid volume {:?}", request.name))?;
            if !seen.insert(request.name.as_str()) {
                bail!("Duplicate volume name {:?}", request.name);
            }
        }
        Ok(())
    }

    /// Store root resolved against `base_dir`
    pub fn store_root(&self, base_dir: &Path) -> PathBuf {
        if self.cache.root.is_absolute() {
            self.cache.root.clone()
        } else {
            base_dir.join(&self.cache.root)
        }
    }

    /// Open a filesystem-backed cache as described by the `[cache]` section.
    pub fn open_cache(&self, base_dir: &Path) -> Result<VolumeCache> {
        let root = self.store_root(base_dir);
        let store = FsSliceStore::open(&root)
            .with_context(|| format!("Failed to open noise store at {}", root.display()))?;
        Ok(VolumeCache::new(Arc::new(store), self.cache.can_generate))
    }

    /// Run every volume through `get_or_generate` with the manifest policy.
    ///
    /// Returns the lookups in manifest order. Misses are returned, not raised;
    /// a read-back failure aborts the build.
    pub fn build_all(&self, cache: &VolumeCache) -> Result<Vec<(String, Lookup)>> {
        self.validate()?;
        let mut results = Vec::with_capacity(self.volumes.len());
        for request in &self.volumes {
            let lookup = cache
                .get_or_generate(request, self.cache.policy)
                .with_context(|| format!("Failed to build volume {:?}", request.name))?;
            match &lookup {
                Lookup::Loaded(_) => tracing::info!(name = %request.name, "Volume up to date"),
                Lookup::Generated(_) => tracing::info!(name = %request.name, "Volume generated"),
                Lookup::Miss(miss) => tracing::warn!(name = %request.name, %miss, "Volume unavailable"),
            }
            results.push((request.name.clone(), lookup));
        }
        Ok(results)
    }
}
