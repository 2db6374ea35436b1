//! JPEG encoding from a [`Raster`].
//!
//! The pipeline validates the raster, applies the quality policy to the
//! codec and feeds it one scanline per row. Two sinks are provided: any
//! `Write` implementation and an in-memory buffer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bridge::{self, Recoverable};
use crate::codec::{CodecError, Compressor, JpegEncoderSink};
use crate::raster::{byte_len, Raster, CHANNELS};

/// Errors that can occur during JPEG encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// JPEG encoding failed
    #[error("JPEG encoding failed: {0}")]
    EncodingFailed(String),

    /// Out of memory while allocating encoder storage
    #[error("Out of memory during encoding")]
    OutOfMemory,

    /// The output file could not be created
    #[error("I/O error: {0}")]
    IoError(String),
}

impl EncodeError {
    /// Whether the codec reported this failure mid-stream.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EncodeError::EncodingFailed(_))
    }
}

impl From<CodecError> for EncodeError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidHeader(message) | CodecError::Fatal(message) => {
                EncodeError::EncodingFailed(message)
            }
            CodecError::OutOfMemory(_) => EncodeError::OutOfMemory,
            CodecError::Io(e) => EncodeError::EncodingFailed(e.to_string()),
        }
    }
}

impl Recoverable for EncodeError {
    fn diagnostic(&self) -> Option<&str> {
        match self {
            EncodeError::EncodingFailed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    fn from_panic(message: String) -> Self {
        EncodeError::EncodingFailed(message)
    }
}

/// JPEG quality after clamping into `0..=100`.
///
/// `0` leaves the codec's own defaults untouched. From
/// [`Quality::FULL_CHROMA`] upward the luma component is sampled 1x1, so
/// colour is stored at full resolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "i32", into = "i32")]
pub struct Quality(u8);

impl Quality {
    /// Leave the codec's quality and sampling defaults in place.
    pub const CODEC_DEFAULT: Quality = Quality(0);

    /// Lowest quality that disables chroma subsampling.
    pub const FULL_CHROMA: Quality = Quality(90);

    /// Highest quality.
    pub const MAX: Quality = Quality(100);

    /// Clamp any integer into the valid range.
    pub fn clamped(value: i32) -> Self {
        Quality(value.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_codec_default(self) -> bool {
        self == Self::CODEC_DEFAULT
    }

    pub fn disables_subsampling(self) -> bool {
        self >= Self::FULL_CHROMA
    }

    /// Apply this quality to a configured compressor.
    fn apply<C: Compressor>(self, compressor: &mut C) {
        if self.is_codec_default() {
            return;
        }
        compressor.set_quality(self.0, true);
        if self.disables_subsampling() {
            compressor.set_sampling_factor(0, 1, 1);
        }
    }
}

impl From<i32> for Quality {
    fn from(value: i32) -> Self {
        Quality::clamped(value)
    }
}

impl From<Quality> for i32 {
    fn from(quality: Quality) -> Self {
        i32::from(quality.0)
    }
}

/// Encode a raster to JPEG bytes in memory.
///
/// # Arguments
///
/// * `raster` - Source image; only borrowed
/// * `quality` - JPEG quality, clamped into 0..=100 (0 = codec defaults)
///
/// # Returns
///
/// The complete JPEG stream; its length is the encoded byte count. On error
/// no partial buffer is returned.
///
/// # Quality Guidelines
///
/// * 90-100: High quality, no chroma subsampling
/// * 60-90: Good quality for most uses
/// * 1-60: Low quality, visible artifacts
/// * 0: Codec defaults (quality 75, 4:2:0)
pub fn encode_to_vec(raster: &Raster, quality: i32) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    encode_with(raster, quality, JpegEncoderSink::new(&mut buffer))?;
    Ok(buffer)
}

/// Encode a raster to an already-open writer.
///
/// Returns the number of bytes written. On a fatal error the writer may
/// already hold part of the stream.
pub fn encode_to_writer<W: Write>(
    raster: &Raster,
    quality: i32,
    writer: W,
) -> Result<usize, EncodeError> {
    encode_with(raster, quality, JpegEncoderSink::new(writer))
}

/// Encode a raster into a newly created file.
///
/// The raster is validated before the file is created.
pub fn encode_file(
    raster: &Raster,
    quality: i32,
    path: impl AsRef<Path>,
) -> Result<usize, EncodeError> {
    validate(raster)?;
    let file = File::create(path.as_ref()).map_err(|e| EncodeError::IoError(e.to_string()))?;
    encode_to_writer(raster, quality, BufWriter::new(file))
}

/// Run the encode pipeline over any [`Compressor`].
pub fn encode_with<C: Compressor>(
    raster: &Raster,
    quality: i32,
    compressor: C,
) -> Result<usize, EncodeError> {
    validate(raster)?;
    let quality = Quality::clamped(quality);
    bridge::recover("encode", move || write_raster(raster, quality, compressor))
}

fn validate(raster: &Raster) -> Result<(), EncodeError> {
    if raster.is_empty() {
        return Err(EncodeError::InvalidDimensions {
            width: raster.width,
            height: raster.height,
        });
    }
    let expected = byte_len(raster.width, raster.height);
    if raster.pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: raster.pixels.len(),
        });
    }
    Ok(())
}

fn write_raster<C: Compressor>(
    raster: &Raster,
    quality: Quality,
    mut compressor: C,
) -> Result<usize, EncodeError> {
    compressor.configure(raster.width, raster.height, CHANNELS)?;
    compressor.set_defaults();
    quality.apply(&mut compressor);
    compressor.start()?;

    let stride = raster.width as usize * CHANNELS;
    for (y, row) in raster.pixels.chunks_exact(stride).enumerate() {
        if compressor.write_scanline(row)? != 1 {
            return Err(EncodeError::EncodingFailed(format!(
                "Codec accepted no data for scanline {} of {}",
                y, raster.height
            )));
        }
    }

    let written = compressor.finish()?;
    debug!(
        "encoded {}x{} raster at quality {} into {} bytes",
        raster.width,
        raster.height,
        quality.value(),
        written
    );
    Ok(written)
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::decode::decode_bytes;
    use proptest::prelude::*;

    /// Strategy for generating image dimensions (keep small for speed).
    fn dimensions_strategy() -> impl Strategy<Value = (u32, u32)> {
        (1u32..=40, 1u32..=40)
    }

    proptest! {
        /// Property: Width and height survive a round trip at any quality.
        #[test]
        fn prop_roundtrip_preserves_dimensions(
            (width, height) in dimensions_strategy(),
            quality in 1i32..=100,
        ) {
            let raster = Raster::filled(width, height, [200, 40, 90]);
            let jpeg = encode_to_vec(&raster, quality).unwrap();
            let back = decode_bytes(&jpeg).unwrap();

            prop_assert_eq!((back.width, back.height), (width, height));
            prop_assert!(back.is_valid());
        }

        /// Property: Every integer quality produces a valid stream.
        #[test]
        fn prop_any_quality_is_clamped(quality in any::<i32>()) {
            let raster = Raster::filled(8, 8, [10, 20, 30]);
            let jpeg = encode_to_vec(&raster, quality);

            prop_assert!(jpeg.is_ok(), "Quality {} should work after clamping", quality);
            let jpeg = jpeg.unwrap();
            prop_assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
        }

        /// Property: Same input always produces same output (deterministic).
        #[test]
        fn prop_deterministic_output(
            (width, height) in (1u32..=20, 1u32..=20),
            quality in 0i32..=100,
        ) {
            let raster = Raster::filled(width, height, [100, 100, 100]);
            let first = encode_to_vec(&raster, quality).unwrap();
            let second = encode_to_vec(&raster, quality).unwrap();
            prop_assert_eq!(first, second);
        }

        /// Property: Mismatched pixel data always returns an error.
        #[test]
        fn prop_invalid_pixel_length_returns_error(
            (width, height) in dimensions_strategy(),
            delta in 1usize..=10,
            longer in any::<bool>(),
        ) {
            let expected = byte_len(width, height);
            let actual = if longer { expected + delta } else { expected.saturating_sub(delta) };
            prop_assume!(actual != 0);

            let raster = Raster { width, height, pixels: vec![128u8; actual] };
            let result = encode_to_vec(&raster, 90);
            let is_invalid = matches!(result, Err(EncodeError::InvalidPixelData { .. }));
            prop_assert!(is_invalid, "expected InvalidPixelData for {} bytes", actual);
        }
    }
}
