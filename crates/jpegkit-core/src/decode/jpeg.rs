//! JPEG decoding into a [`Raster`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::debug;

use super::DecodeError;
use crate::bridge;
use crate::codec::{ColorSpace, Decompressor, JpegDecoderSource};
use crate::raster::{promote_gray, Raster, CHANNELS};

/// Decode a JPEG image from a byte stream positioned at its start.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the stream has no JPEG header.
/// Returns `DecodeError::OutOfMemory` if the frame is too large to decode.
/// Returns `DecodeError::CorruptedFile` if decoding fails mid-stream; the
/// codec's message is also available from [`crate::last_error_message`].
pub fn decode_reader<R: Read>(reader: R) -> Result<Raster, DecodeError> {
    decode_with(JpegDecoderSource::new(reader))
}

/// Decode a JPEG image held in memory.
pub fn decode_bytes(bytes: &[u8]) -> Result<Raster, DecodeError> {
    decode_with(JpegDecoderSource::new(bytes))
}

/// Open and decode a JPEG file.
///
/// Failing to open the file is an I/O error, not a codec error, and leaves
/// the diagnostic untouched.
pub fn decode_file(path: impl AsRef<Path>) -> Result<Raster, DecodeError> {
    let file = File::open(path.as_ref()).map_err(|e| DecodeError::IoError(e.to_string()))?;
    decode_reader(BufReader::new(file))
}

/// Run the decode pipeline over any [`Decompressor`].
pub fn decode_with<D: Decompressor>(mut source: D) -> Result<Raster, DecodeError> {
    bridge::recover("decode", move || read_raster(&mut source))
}

fn read_raster<D: Decompressor>(source: &mut D) -> Result<Raster, DecodeError> {
    let header = source.read_header()?;
    let format = source.start(ColorSpace::Rgb)?;
    if format.width == 0 || format.height == 0 {
        return Err(DecodeError::InvalidFormat(format!(
            "empty frame {}x{}",
            format.width, format.height
        )));
    }

    let grayscale = format.source_color_space == ColorSpace::Grayscale;
    let needed = if grayscale { 1 } else { CHANNELS };
    if format.components < needed {
        return Err(DecodeError::CorruptedFile(format!(
            "codec produced {} components per pixel for a {:?} frame",
            format.components, format.source_color_space
        )));
    }

    let mut raster =
        Raster::try_alloc(format.width, format.height).ok_or(DecodeError::OutOfMemory)?;
    let mut row = Vec::new();
    row.try_reserve_exact(format.row_len())
        .map_err(|_| DecodeError::OutOfMemory)?;
    row.resize(format.row_len(), 0);

    let stride = format.width as usize * CHANNELS;
    for (y, out) in raster.pixels.chunks_exact_mut(stride).enumerate() {
        if source.read_scanline(&mut row)? != 1 {
            return Err(DecodeError::CorruptedFile(format!(
                "Premature end of JPEG data at scanline {} of {}",
                y, format.height
            )));
        }

        if grayscale {
            promote_gray(out, &row);
        } else {
            for (dst, src) in out
                .chunks_exact_mut(CHANNELS)
                .zip(row.chunks_exact(format.components))
            {
                dst.copy_from_slice(&src[..CHANNELS]);
            }
        }
    }

    debug!(
        "decoded {}x{} {:?} frame",
        header.width, header.height, header.color_space
    );
    Ok(raster)
}
