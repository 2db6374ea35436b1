//! In-memory RGB raster buffer.
//!
//! A [`Raster`] is the value every pipeline stage hands around: decode and
//! resize produce one, encode borrows one. Pixels are stored row-major with
//! a tight 3-byte stride (R, G, B), the same layout as [`image::RgbImage`].
//!
//! The empty raster (zero dimensions, no storage) is the invalid sentinel.
//! Producers never return it; consumers reject it before touching storage.

/// Bytes per packed pixel unit.
pub const CHANNELS: usize = 3;

/// A decoded image with RGB pixel data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Raster {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGB pixel data in row-major order (3 bytes per pixel).
    /// Length must be width * height * 3 for the raster to be valid.
    pub pixels: Vec<u8>,
}

impl Raster {
    /// Create a new Raster with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            byte_len(width, height),
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// The invalid sentinel: no dimensions, no storage.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a raster filled with a single colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(byte_len(width, height))
            .collect();
        Self::new(width, height, pixels)
    }

    /// Allocate zeroed storage for a `width x height` raster.
    ///
    /// Storage is reserved fallibly so that an oversized request surfaces as
    /// `None` instead of aborting the process.
    pub(crate) fn try_alloc(width: u32, height: u32) -> Option<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(CHANNELS)?;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).ok()?;
        pixels.resize(len, 0);
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Promote 8-bit grayscale samples to RGB by replicating each intensity.
    pub fn from_gray(width: u32, height: u32, gray: &[u8]) -> Option<Self> {
        if gray.len() != (width as usize).checked_mul(height as usize)? {
            return None;
        }
        let mut raster = Self::try_alloc(width, height)?;
        promote_gray(&mut raster.pixels, gray);
        Some(raster)
    }

    /// Create a Raster from an image::RgbImage.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.into_raw();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Convert to an image::RgbImage for further processing.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        if !self.is_valid() {
            return None;
        }
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Get the size of the pixel buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// True when dimensions are non-zero and storage matches them exactly.
    pub fn is_valid(&self) -> bool {
        !self.is_empty() && self.pixels.len() == byte_len(self.width, self.height)
    }

    /// RGB value at `(x, y)`, or `None` when out of bounds or invalid.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if !self.is_valid() || x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * CHANNELS;
        Some([self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]])
    }

    /// Packed bytes of row `y`.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if !self.is_valid() || y >= self.height {
            return None;
        }
        let stride = self.width as usize * CHANNELS;
        let start = y as usize * stride;
        Some(&self.pixels[start..start + stride])
    }

    /// Release pixel storage and reset to the empty sentinel.
    ///
    /// Safe to call any number of times; dropping the raster afterwards is
    /// also fine.
    pub fn release(&mut self) {
        self.pixels = Vec::new();
        self.width = 0;
        self.height = 0;
    }
}

/// Write each gray sample of `gray` into the R, G and B bytes of `rgb`.
pub(crate) fn promote_gray(rgb: &mut [u8], gray: &[u8]) {
    for (dst, &v) in rgb.chunks_exact_mut(CHANNELS).zip(gray) {
        dst.fill(v);
    }
}

/// Storage length in bytes for a raster of the given size.
pub(crate) fn byte_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(CHANNELS)
}
