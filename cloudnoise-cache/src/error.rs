//! Error types for stores and the volume cache

use std::io;
use std::path::PathBuf;

use cloudnoise_synth::SettingsError;

use crate::cache::Miss;

/// Failure inside a [`SliceStore`](crate::SliceStore) backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The entry exists but its slice sequence cannot be trusted
    #[error("entry {name:?} is malformed: {reason}")]
    Malformed { name: String, reason: String },

    #[error("slice {index} of entry {name:?} is missing")]
    MissingSlice { name: String, index: usize },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure while turning PNG bytes back into a slice
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("PNG decode failed")]
    Png(#[from] png::DecodingError),

    #[error("unsupported pixel format {color_type:?}/{bit_depth:?} (expected 8-bit RGBA)")]
    Format {
        color_type: png::ColorType,
        bit_depth: png::BitDepth,
    },
}

/// Failure of a cache operation
///
/// Ordinary misses are not errors; they are reported as
/// [`Lookup::Miss`](crate::Lookup::Miss).
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("invalid entry name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("resolution {0} is outside 1..={max}", max = crate::MAX_RESOLUTION)]
    InvalidResolution(u32),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode slice {index}")]
    Encode {
        index: usize,
        #[source]
        source: png::EncodingError,
    },

    /// Slices handed to `store` do not form a cube
    #[error("slices do not form a cube: {reason}")]
    InconsistentSlices { reason: String },

    /// The entry could not be read back right after it was written.
    /// This is a codec or store bug, never a user error.
    #[error("entry {name:?} failed read-back after generation at resolution {resolution}: {miss}")]
    Readback {
        name: String,
        resolution: u32,
        miss: Miss,
    },
}
