//! Scanline interface to the JPEG codec.
//!
//! The decode and encode pipelines never talk to a JPEG library directly.
//! They drive a [`Decompressor`] or [`Compressor`] one scanline at a time,
//! and every call reports failure through its `Result` instead of an
//! out-of-band error callback.
//!
//! The production implementations live in [`backend`]:
//! - [`JpegDecoderSource`] wraps `jpeg-decoder`
//! - [`JpegEncoderSink`] wraps `jpeg-encoder`
//!
//! Tests substitute scripted implementations to exercise failure paths
//! that a real codec only hits on damaged input.

mod backend;

pub use backend::{JpegDecoderSource, JpegEncoderSink, DEFAULT_MEMORY_LIMIT, DEFAULT_QUALITY};

use thiserror::Error;

/// Errors reported by a codec implementation.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stream does not start with a usable JPEG header.
    #[error("Invalid JPEG header: {0}")]
    InvalidHeader(String),

    /// The codec hit an unrecoverable condition mid-stream.
    #[error("{0}")]
    Fatal(String),

    /// The codec could not get the working memory the frame needs.
    #[error("Insufficient memory: {0}")]
    OutOfMemory(String),

    /// The underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Whether this error aborts a stream that was already accepted.
    ///
    /// Header and allocation errors are reported as plain failures.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            CodecError::InvalidHeader(_) | CodecError::OutOfMemory(_)
        )
    }
}

/// Colour space of a JPEG frame, or of the samples the codec emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// One luminance component.
    Grayscale,
    /// Three components, red/green/blue.
    Rgb,
    /// Four components, cyan/magenta/yellow/black.
    Cmyk,
}

/// What the header checkpoint reveals about a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub width: u32,
    pub height: u32,
    /// Native colour space of the compressed frame.
    pub color_space: ColorSpace,
}

/// Layout of the scanlines produced after [`Decompressor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub width: u32,
    pub height: u32,
    /// Bytes per pixel in each scanline.
    pub components: usize,
    /// Native colour space of the source frame.
    pub source_color_space: ColorSpace,
}

impl OutputFormat {
    /// Bytes in one scanline.
    pub fn row_len(&self) -> usize {
        self.width as usize * self.components
    }
}

/// Scanline-oriented JPEG decoder.
pub trait Decompressor {
    /// Parse the stream header. This is the only "is this a JPEG" checkpoint.
    fn read_header(&mut self) -> Result<FrameHeader, CodecError>;

    /// Begin decompression with the requested output colour space.
    ///
    /// Implementations convert every native colour space to `output`, except
    /// grayscale frames, which are delivered as a single component.
    fn start(&mut self, output: ColorSpace) -> Result<OutputFormat, CodecError>;

    /// Decode the next scanline into `row`, returning the number of
    /// scanlines written (1, or 0 once the image is exhausted).
    fn read_scanline(&mut self, row: &mut [u8]) -> Result<usize, CodecError>;
}

/// Scanline-oriented JPEG encoder.
pub trait Compressor {
    /// Declare the image geometry and input components per pixel.
    fn configure(&mut self, width: u32, height: u32, components: usize)
        -> Result<(), CodecError>;

    /// Reset quality and sampling to the codec's defaults.
    fn set_defaults(&mut self);

    /// Set the quantisation quality (1..=100).
    fn set_quality(&mut self, quality: u8, force_baseline: bool);

    /// Set horizontal/vertical sampling factors for one component.
    fn set_sampling_factor(&mut self, component: usize, h: u8, v: u8);

    /// Begin compression. Called once, after configuration.
    fn start(&mut self) -> Result<(), CodecError>;

    /// Compress one scanline, returning the number of scanlines accepted.
    fn write_scanline(&mut self, row: &[u8]) -> Result<usize, CodecError>;

    /// Flush everything to the sink, returning the number of bytes produced.
    fn finish(self) -> Result<usize, CodecError>;
}
