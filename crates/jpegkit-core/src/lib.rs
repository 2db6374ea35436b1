//! jpegkit core - in-memory RGB raster with JPEG decode, encode and resize
//!
//! This crate provides:
//! - [`Raster`], a packed 8-bit RGB image buffer
//! - [`decode`], JPEG stream to raster
//! - [`encode`], raster to JPEG stream at a chosen quality
//! - [`transform`], nearest-neighbour resize and centred crop
//!
//! Compression itself is delegated to the codec behind the [`codec`] seam.
//! Decode and encode turn any fatal codec condition into an `Err`, release
//! everything they allocated, and leave the codec's message available
//! through [`last_error_message`].

mod bridge;
pub mod codec;
pub mod decode;
pub mod encode;
pub mod raster;
pub mod transform;

pub use bridge::last_error_message;
pub use decode::{decode_bytes, decode_file, decode_reader, DecodeError};
pub use encode::{encode_file, encode_to_vec, encode_to_writer, EncodeError, Quality};
pub use raster::Raster;
pub use transform::{resize, resize_with, ResizeError, ResizeMode, ResizeRequest, ScalePolicy};
