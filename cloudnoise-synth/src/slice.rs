//! RGBA8 slice buffer

/// One Z cross-section of a noise volume
///
/// The density is stored linearly in R, G and B; alpha is always opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel, row-major order)
    pub pixels: Vec<u8>,
}

impl Slice {
    /// Create a new slice initialized to transparent black
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; (width as usize) * (height as usize) * 4],
        }
    }

    /// Wrap existing RGBA8 data. Returns `None` if the length does not match.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Get pixel at (x, y)
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = self.index(x, y);
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Set pixel at (x, y)
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        let idx = self.index(x, y);
        self.pixels[idx..idx + 4].copy_from_slice(&color);
    }

    /// Store a density value at (x, y)
    #[inline]
    pub fn set_density(&mut self, x: u32, y: u32, value: f32) {
        let v = quantize(value);
        self.set_pixel(x, y, [v, v, v, 255]);
    }

    /// Density at (x, y) in [0, 1], read from the red channel
    #[inline]
    pub fn density(&self, x: u32, y: u32) -> f32 {
        self.pixels[self.index(x, y)] as f32 / 255.0
    }

    /// Whether this slice is a `resolution × resolution` square
    pub fn is_square_of(&self, resolution: u32) -> bool {
        self.width == resolution && self.height == resolution
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * 4
    }
}

/// Quantize a density in [0, 1] to 8 bits (round to nearest)
#[inline]
pub fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
