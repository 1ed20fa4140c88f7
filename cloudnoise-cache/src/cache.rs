//! Load-or-generate policy over a slice store

use std::sync::{Arc, Mutex, PoisonError};

use cloudnoise_synth::{NoiseMode, NoiseSettings, Slice, Synthesizer};
use hashbrown::HashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::codec::{decode_slice, encode_slice};
use crate::volume::check_cube;
use crate::{CacheError, EntryName, SliceStore, StoreError, Volume, MAX_RESOLUTION};

/// How `get_or_generate` treats an existing entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadPolicy {
    /// Load if a valid entry exists, otherwise generate, store and reload
    #[default]
    LoadAvailableElseGenerate,
    /// Load if a valid entry exists, otherwise report a miss
    LoadAvailableElseAbort,
    /// Always regenerate and overwrite, then reload
    ForceGenerate,
}

/// Why a load produced no volume
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Miss {
    #[error("entry not found")]
    NotFound,

    #[error("entry holds {found} slices, expected {expected}")]
    SliceCount { expected: u32, found: usize },

    #[error("slice {index} is {width}x{height}, expected {expected}x{expected}")]
    SliceSize {
        index: usize,
        width: u32,
        height: u32,
        expected: u32,
    },

    /// A slice is missing or unreadable, or the slice sequence has gaps
    #[error("entry is corrupt: {reason}")]
    Corrupt { reason: String },

    /// The policy needed generation but this cache cannot generate
    #[error("generation is unavailable")]
    GenerationUnavailable,
}

/// Result of a load or load-or-generate call
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// A valid entry was already in the store
    Loaded(Volume),
    /// The entry was (re)generated and read back during this call
    Generated(Volume),
    Miss(Miss),
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        !matches!(self, Lookup::Miss(_))
    }

    pub fn volume(&self) -> Option<&Volume> {
        match self {
            Lookup::Loaded(v) | Lookup::Generated(v) => Some(v),
            Lookup::Miss(_) => None,
        }
    }

    pub fn into_volume(self) -> Option<Volume> {
        match self {
            Lookup::Loaded(v) | Lookup::Generated(v) => Some(v),
            Lookup::Miss(_) => None,
        }
    }

    pub fn miss(&self) -> Option<&Miss> {
        match self {
            Lookup::Miss(m) => Some(m),
            _ => None,
        }
    }
}

/// Everything needed to load or generate one volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRequest {
    pub name: String,
    pub resolution: u32,
    #[serde(default)]
    pub perlin: NoiseSettings,
    #[serde(default = "default_worley")]
    pub worley: NoiseSettings,
    #[serde(default)]
    pub noise_mode: NoiseMode,
    #[serde(default)]
    pub seed: u32,
}

fn default_worley() -> NoiseSettings {
    NoiseSettings::new(3, 4, 1.0, 1.0)
}

impl VolumeRequest {
    /// Request with default Perlin and Worley settings in `Mix` mode
    pub fn new(name: impl Into<String>, resolution: u32) -> Self {
        Self {
            name: name.into(),
            resolution,
            perlin: NoiseSettings::default(),
            worley: default_worley(),
            noise_mode: NoiseMode::Mix,
            seed: 0,
        }
    }

    pub fn with_perlin(mut self, perlin: NoiseSettings) -> Self {
        self.perlin = perlin;
        self
    }

    pub fn with_worley(mut self, worley: NoiseSettings) -> Self {
        self.worley = worley;
        self
    }

    pub fn with_noise_mode(mut self, noise_mode: NoiseMode) -> Self {
        self.noise_mode = noise_mode;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Validate name, resolution and both channels' settings.
    pub fn validate(&self) -> Result<(), CacheError> {
        EntryName::new(&self.name)?;
        check_resolution(self.resolution)?;
        self.perlin.validate()?;
        self.worley.validate()?;
        Ok(())
    }

    /// Build the generator described by this request.
    pub fn synthesizer(&self) -> Result<Synthesizer, CacheError> {
        Ok(Synthesizer::new(self.perlin, self.worley, self.noise_mode)?.with_seed(self.seed))
    }
}

/// Per-name write locks; entries under different names never contend.
#[derive(Debug, Default)]
struct NameLocks {
    locks: Mutex<HashMap<EntryName, Arc<Mutex<()>>>>,
}

impl NameLocks {
    fn get(&self, name: &EntryName) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // A count of one means only the map holds it: nobody is waiting.
        locks.retain(|key, lock| key == name || Arc::strong_count(lock) > 1);
        locks.entry(name.clone()).or_default().clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Loads noise volumes from a [`SliceStore`], generating them when allowed.
///
/// `can_generate` replaces a build-time editor/runtime split: a read-only
/// deployment constructs the cache with `false`, and every policy then degrades
/// to loading only.
pub struct VolumeCache {
    store: Arc<dyn SliceStore>,
    can_generate: bool,
    locks: NameLocks,
}

impl VolumeCache {
    pub fn new(store: Arc<dyn SliceStore>, can_generate: bool) -> Self {
        Self {
            store,
            can_generate,
            locks: NameLocks::default(),
        }
    }

    pub fn can_generate(&self) -> bool {
        self.can_generate
    }

    pub fn store(&self) -> &dyn SliceStore {
        self.store.as_ref()
    }

    /// Load `name` if it holds exactly `resolution` slices of `resolution²`.
    pub fn load(&self, name: &str, resolution: u32) -> Result<Lookup, CacheError> {
        let name = EntryName::new(name)?;
        check_resolution(resolution)?;

        let lock = self.locks.get(&name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load_entry(&name, resolution)
    }

    /// Replace `name` with `slices`, which must form an N×N×N cube.
    pub fn store_slices(&self, name: &str, slices: &[Slice]) -> Result<(), CacheError> {
        let name = EntryName::new(name)?;
        let resolution = check_cube(slices)?;
        check_resolution(resolution)?;

        let lock = self.locks.get(&name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_entry(&name, slices)
    }

    /// Delete `name`. Returns whether it existed.
    pub fn remove(&self, name: &str) -> Result<bool, CacheError> {
        let name = EntryName::new(name)?;
        let lock = self.locks.get(&name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.store.remove(&name)?)
    }

    /// Synthesize `request` and overwrite its entry, without reading it back.
    pub fn generate(&self, request: &VolumeRequest) -> Result<(), CacheError> {
        request.validate()?;
        let name = EntryName::new(&request.name)?;

        let lock = self.locks.get(&name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.generate_entry(&name, request)
    }

    /// Load, or generate-store-reload, according to `policy`.
    ///
    /// An ordinary miss is `Ok(Lookup::Miss(_))`. A miss right after a
    /// successful store is a broken invariant and returns
    /// [`CacheError::Readback`].
    pub fn get_or_generate(
        &self,
        request: &VolumeRequest,
        policy: LoadPolicy,
    ) -> Result<Lookup, CacheError> {
        request.validate()?;
        let name = EntryName::new(&request.name)?;
        let resolution = request.resolution;

        let lock = self.locks.get(&name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // A read-only cache loads under every policy.
        if !self.can_generate || policy != LoadPolicy::ForceGenerate {
            match self.load_entry(&name, resolution)? {
                Lookup::Miss(miss) => {
                    if policy == LoadPolicy::LoadAvailableElseAbort {
                        return Ok(Lookup::Miss(miss));
                    }
                }
                hit => return Ok(hit),
            }
        }

        if !self.can_generate {
            tracing::warn!(
                name = %name,
                resolution,
                ?policy,
                "Noise volume needs generation but this cache is read-only"
            );
            return Ok(Lookup::Miss(Miss::GenerationUnavailable));
        }

        self.generate_entry(&name, request)?;

        match self.load_entry(&name, resolution)? {
            Lookup::Loaded(volume) | Lookup::Generated(volume) => Ok(Lookup::Generated(volume)),
            Lookup::Miss(miss) => {
                tracing::error!(
                    name = %name,
                    resolution,
                    %miss,
                    "Unable to load noise volume right after generating it"
                );
                Err(CacheError::Readback {
                    name: name.to_string(),
                    resolution,
                    miss,
                })
            }
        }
    }

    fn generate_entry(&self, name: &EntryName, request: &VolumeRequest) -> Result<(), CacheError> {
        let synth = request.synthesizer()?;
        tracing::info!(
            name = %name,
            resolution = request.resolution,
            mode = ?request.noise_mode,
            "Generating noise volume"
        );
        let slices = synth.synthesize(request.resolution);
        self.write_entry(name, &slices)?;
        tracing::info!(name = %name, slices = slices.len(), "Noise volume stored");
        Ok(())
    }

    fn write_entry(&self, name: &EntryName, slices: &[Slice]) -> Result<(), CacheError> {
        let encoded = slices
            .par_iter()
            .enumerate()
            .map(|(index, slice)| {
                encode_slice(slice).map_err(|source| CacheError::Encode { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.store.replace(name, &encoded)?;
        Ok(())
    }

    fn load_entry(&self, name: &EntryName, resolution: u32) -> Result<Lookup, CacheError> {
        let lookup = self.read_entry(name, resolution)?;
        match &lookup {
            Lookup::Miss(miss) => tracing::debug!(name = %name, resolution, %miss, "Noise volume miss"),
            _ => tracing::debug!(name = %name, resolution, "Noise volume loaded"),
        }
        Ok(lookup)
    }

    fn read_entry(&self, name: &EntryName, resolution: u32) -> Result<Lookup, CacheError> {
        let count = match self.store.slice_count(name) {
            Ok(Some(count)) => count,
            Ok(None) => return Ok(Lookup::Miss(Miss::NotFound)),
            Err(StoreError::Malformed { reason, .. }) => {
                return Ok(Lookup::Miss(Miss::Corrupt { reason }));
            }
            Err(e) => return Err(e.into()),
        };

        if count != resolution as usize {
            return Ok(Lookup::Miss(Miss::SliceCount {
                expected: resolution,
                found: count,
            }));
        }

        let slice_bytes = (resolution as usize) * (resolution as usize) * 4;
        let mut texels = Vec::with_capacity(slice_bytes * count);
        for index in 0..count {
            let bytes = match self.store.read_slice(name, index) {
                Ok(bytes) => bytes,
                Err(StoreError::MissingSlice { .. }) => {
                    return Ok(Lookup::Miss(Miss::Corrupt {
                        reason: format!("slice {index} is missing"),
                    }));
                }
                Err(e) => return Err(e.into()),
            };
            let slice = match decode_slice(&bytes) {
                Ok(slice) => slice,
                Err(e) => {
                    return Ok(Lookup::Miss(Miss::Corrupt {
                        reason: format!("slice {index}: {e}"),
                    }));
                }
            };
            if !slice.is_square_of(resolution) {
                return Ok(Lookup::Miss(Miss::SliceSize {
                    index,
                    width: slice.width,
                    height: slice.height,
                    expected: resolution,
                }));
            }
            texels.extend_from_slice(&slice.pixels);
        }

        match Volume::from_texels(resolution, texels) {
            Some(volume) => Ok(Lookup::Loaded(volume)),
            None => Ok(Lookup::Miss(Miss::Corrupt {
                reason: "assembled texel count does not match resolution".to_string(),
            })),
        }
    }
}

pub(crate) fn check_resolution(resolution: u32) -> Result<(), CacheError> {
    if resolution == 0 || resolution > MAX_RESOLUTION {
        return Err(CacheError::InvalidResolution(resolution));
    }
    Ok(())
}
