//! Image decoding pipeline.
//!
//! This module provides functionality for:
//! - Decoding baseline and progressive JPEG streams into an RGB [`Raster`]
//! - Promoting grayscale frames to RGB and converting CMYK frames
//! - Reading from byte slices, open readers or files on disk
//!
//! # Architecture
//!
//! Decoding drives a [`Decompressor`] one scanline at a time. Every entry
//! point funnels into [`decode_with`], which runs under the error-recovery
//! bridge: a fatal codec error returns an error, releases any partial
//! raster, and leaves the codec's message in
//! [`last_error_message`](crate::last_error_message).
//!
//! # Examples
//!
//! ```ignore
//! use jpegkit_core::decode::decode_file;
//!
//! let image = decode_file("photo.jpg").unwrap();
//! println!("Decoded {}x{} image", image.width, image.height);
//! ```
//!
//! [`Raster`]: crate::Raster
//! [`Decompressor`]: crate::codec::Decompressor

mod jpeg;
mod types;

pub use jpeg::{decode_bytes, decode_file, decode_reader, decode_with};
pub use types::DecodeError;
