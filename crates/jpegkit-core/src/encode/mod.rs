//! Image encoding pipeline.
//!
//! This module provides functionality for:
//! - Encoding an RGB [`Raster`](crate::Raster) to JPEG with a clamped quality
//! - Writing to any `Write` sink, to a file, or into memory
//!
//! Quality `0` keeps the codec defaults; `90` and above turn off chroma
//! subsampling. Invalid rasters are rejected before the sink is touched.
//!
//! # Examples
//!
//! ```ignore
//! use jpegkit_core::{encode::encode_to_vec, Raster};
//!
//! let raster = Raster::filled(100, 100, [128, 128, 128]);
//! let jpeg_bytes = encode_to_vec(&raster, 90).unwrap();
//! println!("Encoded {} bytes", jpeg_bytes.len());
//! ```

mod jpeg;

pub use jpeg::{encode_file, encode_to_vec, encode_to_writer, encode_with, EncodeError, Quality};
