//! Assembled 3D noise volume

use cloudnoise_synth::Slice;

use crate::CacheError;

/// A cubic RGBA8 volume of side `resolution`
///
/// Texels are laid out x fastest, then y, then z: the bytes are exactly the
/// concatenation of the volume's slices in layer order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    resolution: u32,
    texels: Vec<u8>,
}

impl Volume {
    /// Build a volume from raw texels. Returns `None` unless
    /// `texels.len() == resolution³ * 4`.
    pub fn from_texels(resolution: u32, texels: Vec<u8>) -> Option<Self> {
        if texels.len() != texel_bytes(resolution) {
            return None;
        }
        Some(Self { resolution, texels })
    }

    /// Concatenate slices in order. Fails unless there are N slices of N×N.
    pub fn from_slices(slices: &[Slice]) -> Result<Self, CacheError> {
        let resolution = check_cube(slices)?;
        let mut texels = Vec::with_capacity(texel_bytes(resolution));
        for slice in slices {
            texels.extend_from_slice(&slice.pixels);
        }
        Ok(Self { resolution, texels })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Raw RGBA8 texels
    pub fn texels(&self) -> &[u8] {
        &self.texels
    }

    pub fn into_texels(self) -> Vec<u8> {
        self.texels
    }

    /// RGBA texel at (x, y, z)
    pub fn texel(&self, x: u32, y: u32, z: u32) -> [u8; 4] {
        let idx = self.index(x, y, z);
        [
            self.texels[idx],
            self.texels[idx + 1],
            self.texels[idx + 2],
            self.texels[idx + 3],
        ]
    }

    /// Density at (x, y, z) in [0, 1], read from the red channel
    pub fn density(&self, x: u32, y: u32, z: u32) -> f32 {
        self.texels[self.index(x, y, z)] as f32 / 255.0
    }

    /// Copy layer `z` back out as a slice
    pub fn slice(&self, z: u32) -> Slice {
        let len = slice_bytes(self.resolution);
        let start = z as usize * len;
        Slice {
            width: self.resolution,
            height: self.resolution,
            pixels: self.texels[start..start + len].to_vec(),
        }
    }

    fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let r = self.resolution as usize;
        (((z as usize) * r + y as usize) * r + x as usize) * 4
    }
}

/// Check that `slices` form an N×N×N cube and return N.
pub(crate) fn check_cube(slices: &[Slice]) -> Result<u32, CacheError> {
    let inconsistent = |reason: String| CacheError::InconsistentSlices { reason };

    let resolution = u32::try_from(slices.len())
        .map_err(|_| inconsistent(format!("{} slices is too many", slices.len())))?;
    if resolution == 0 {
        return Err(inconsistent("no slices".to_string()));
    }
    for (index, slice) in slices.iter().enumerate() {
        if !slice.is_square_of(resolution) {
            return Err(inconsistent(format!(
                "slice {index} is {}x{}, expected {resolution}x{resolution}",
                slice.width, slice.height
            )));
        }
        if slice.pixels.len() != slice_bytes(resolution) {
            return Err(inconsistent(format!(
                "slice {index} holds {} bytes, expected {}",
                slice.pixels.len(),
                slice_bytes(resolution)
            )));
        }
    }
    Ok(resolution)
}

fn slice_bytes(resolution: u32) -> usize {
    (resolution as usize) * (resolution as usize) * 4
}

fn texel_bytes(resolution: u32) -> usize {
    slice_bytes(resolution) * resolution as usize
}
