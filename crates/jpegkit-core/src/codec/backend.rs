//! Codec implementations backed by `jpeg-decoder` and `jpeg-encoder`.
//!
//! Neither crate exposes a scanline API, so both adapters keep a whole-image
//! buffer internally and feed or collect it one row at a time.

use std::io::{Read, Write};

use jpeg_decoder::{Decoder, PixelFormat};
use jpeg_encoder::{ColorType, Encoder, SamplingFactor};
use log::{debug, trace};

use super::{CodecError, ColorSpace, Compressor, Decompressor, FrameHeader, OutputFormat};

/// Quality used when the caller leaves the codec at its defaults.
pub const DEFAULT_QUALITY: u8 = 75;

/// Largest dimension a baseline JPEG frame can describe.
const MAX_DIMENSION: u32 = u16::MAX as u32;

/// Default cap on the decoded sample buffer: a 16384x16384 frame at four
/// bytes per pixel.
pub const DEFAULT_MEMORY_LIMIT: usize = 1 << 30;

/// [`Decompressor`] over any byte reader.
pub struct JpegDecoderSource<R> {
    decoder: Decoder<R>,
    header: Option<(FrameHeader, PixelFormat)>,
    output: Option<OutputFormat>,
    data: Vec<u8>,
    next_row: u32,
    memory_limit: usize,
}

impl<R: Read> JpegDecoderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            decoder: Decoder::new(reader),
            header: None,
            output: None,
            data: Vec::new(),
            next_row: 0,
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }

    /// Refuse frames whose decoded samples would take more than `bytes`.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// Check that the decoded frame fits the limit and that the allocator
    /// can actually provide it, then cap the decoder to the same limit.
    ///
    /// `jpeg-decoder` allocates its planes infallibly, so this has to happen
    /// before `decode`.
    fn reserve_frame(
        &mut self,
        header: FrameHeader,
        format: PixelFormat,
    ) -> Result<(), CodecError> {
        let needed = (header.width as usize)
            .checked_mul(header.height as usize)
            .and_then(|n| n.checked_mul(source_pixel_bytes(format)))
            .ok_or_else(|| {
                CodecError::OutOfMemory(format!(
                    "{}x{} frame size overflows",
                    header.width, header.height
                ))
            })?;
        if needed > self.memory_limit {
            return Err(CodecError::OutOfMemory(format!(
                "{}x{} frame needs {} bytes, limit is {}",
                header.width, header.height, needed, self.memory_limit
            )));
        }

        let mut probe: Vec<u8> = Vec::new();
        probe
            .try_reserve_exact(needed)
            .map_err(|e| CodecError::OutOfMemory(e.to_string()))?;
        drop(probe);

        self.decoder.set_max_decoding_buffer_size(self.memory_limit);
        Ok(())
    }
}

impl<R: Read> Decompressor for JpegDecoderSource<R> {
    fn read_header(&mut self) -> Result<FrameHeader, CodecError> {
        if let Some((header, _)) = self.header {
            return Ok(header);
        }

        self.decoder
            .read_info()
            .map_err(|e| CodecError::InvalidHeader(e.to_string()))?;
        let info = self
            .decoder
            .info()
            .ok_or_else(|| CodecError::InvalidHeader("no frame header found".to_string()))?;

        let color_space = match info.pixel_format {
            PixelFormat::L8 | PixelFormat::L16 => ColorSpace::Grayscale,
            PixelFormat::RGB24 => ColorSpace::Rgb,
            PixelFormat::CMYK32 => ColorSpace::Cmyk,
        };
        let header = FrameHeader {
            width: u32::from(info.width),
            height: u32::from(info.height),
            color_space,
        };
        trace!("jpeg header: {:?} ({:?})", header, info.pixel_format);

        self.header = Some((header, info.pixel_format));
        Ok(header)
    }

    fn start(&mut self, output: ColorSpace) -> Result<OutputFormat, CodecError> {
        if output != ColorSpace::Rgb {
            return Err(CodecError::Fatal(format!(
                "Unsupported output colour space {:?}",
                output
            )));
        }
        let header = self.read_header()?;
        let Some((_, pixel_format)) = self.header else {
            return Err(CodecError::Fatal("decoder has no frame header".to_string()));
        };
        self.reserve_frame(header, pixel_format)?;

        self.data = self
            .decoder
            .decode()
            .map_err(|e| CodecError::Fatal(e.to_string()))?;

        let expected =
            header.width as usize * header.height as usize * source_pixel_bytes(pixel_format);
        if self.data.len() < expected {
            return Err(CodecError::Fatal(format!(
                "Premature end of image data: expected {} bytes, got {}",
                expected,
                self.data.len()
            )));
        }

        let format = OutputFormat {
            width: header.width,
            height: header.height,
            components: match header.color_space {
                ColorSpace::Grayscale => 1,
                _ => 3,
            },
            source_color_space: header.color_space,
        };
        self.output = Some(format);
        self.next_row = 0;
        Ok(format)
    }

    fn read_scanline(&mut self, row: &mut [u8]) -> Result<usize, CodecError> {
        let (Some(format), Some((_, pixel_format))) = (self.output, self.header) else {
            return Err(CodecError::Fatal(
                "read_scanline called before start".to_string(),
            ));
        };
        if self.next_row >= format.height {
            return Ok(0);
        }
        if row.len() < format.row_len() {
            return Err(CodecError::Fatal(format!(
                "scanline buffer too small: {} < {}",
                row.len(),
                format.row_len()
            )));
        }

        let width = format.width as usize;
        let src_stride = width * source_pixel_bytes(pixel_format);
        let start = self.next_row as usize * src_stride;
        let src = &self.data[start..start + src_stride];

        match pixel_format {
            PixelFormat::L8 | PixelFormat::RGB24 => {
                row[..src_stride].copy_from_slice(src);
            }
            PixelFormat::L16 => {
                // Samples are big-endian; keep the most significant byte.
                for (dst, pair) in row.iter_mut().zip(src.chunks_exact(2)) {
                    *dst = pair[0];
                }
            }
            PixelFormat::CMYK32 => {
                for (dst, cmyk) in row.chunks_exact_mut(3).zip(src.chunks_exact(4)) {
                    dst.copy_from_slice(&cmyk_to_rgb(cmyk));
                }
            }
        }

        self.next_row += 1;
        Ok(1)
    }
}

fn source_pixel_bytes(format: PixelFormat) -> usize {
    match format {
        PixelFormat::L8 => 1,
        PixelFormat::L16 => 2,
        PixelFormat::RGB24 => 3,
        PixelFormat::CMYK32 => 4,
    }
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - u32::from(cmyk[3]);
    let channel = |c: u8| ((255 - u32::from(c)) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}

/// [`Compressor`] writing a baseline JPEG to any byte writer.
pub struct JpegEncoderSink<W> {
    writer: W,
    width: u32,
    height: u32,
    quality: u8,
    sampling: SamplingFactor,
    optimize_huffman: bool,
    started: bool,
    rows_written: u32,
    data: Vec<u8>,
}

impl<W: Write> JpegEncoderSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            width: 0,
            height: 0,
            quality: DEFAULT_QUALITY,
            sampling: SamplingFactor::F_2_2,
            optimize_huffman: false,
            started: false,
            rows_written: 0,
            data: Vec::new(),
        }
    }

    #[cfg(test)]
    fn quality(&self) -> u8 {
        self.quality
    }
}

impl<W: Write> Compressor for JpegEncoderSink<W> {
    fn configure(
        &mut self,
        width: u32,
        height: u32,
        components: usize,
    ) -> Result<(), CodecError> {
        if components != 3 {
            return Err(CodecError::Fatal(format!(
                "Unsupported input component count {}",
                components
            )));
        }
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(CodecError::Fatal(format!(
                "Maximum supported image dimension is {} pixels, got {}x{}",
                MAX_DIMENSION, width, height
            )));
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn set_defaults(&mut self) {
        self.quality = DEFAULT_QUALITY;
        self.sampling = SamplingFactor::F_2_2;
        self.optimize_huffman = false;
    }

    fn set_quality(&mut self, quality: u8, force_baseline: bool) {
        self.quality = quality.clamp(1, 100);
        if force_baseline {
            self.optimize_huffman = false;
        }
    }

    fn set_sampling_factor(&mut self, component: usize, h: u8, v: u8) {
        // The encoder takes a single luma-relative factor; chroma components
        // are always sampled at the lowest rate.
        if component != 0 {
            return;
        }
        self.sampling = match (h, v) {
            (1, 1) => SamplingFactor::F_1_1,
            (2, 1) => SamplingFactor::F_2_1,
            (1, 2) => SamplingFactor::F_1_2,
            (2, 2) => SamplingFactor::F_2_2,
            _ => {
                debug!("ignoring unsupported sampling factor {}x{}", h, v);
                return;
            }
        };
    }

    fn start(&mut self) -> Result<(), CodecError> {
        if self.width == 0 || self.height == 0 {
            return Err(CodecError::Fatal(
                "Improper call to start: image not configured".to_string(),
            ));
        }
        let len = self.width as usize * self.height as usize * 3;
        self.data
            .try_reserve_exact(len)
            .map_err(|e| CodecError::OutOfMemory(e.to_string()))?;
        self.started = true;
        Ok(())
    }

    fn write_scanline(&mut self, row: &[u8]) -> Result<usize, CodecError> {
        if !self.started {
            return Err(CodecError::Fatal(
                "write_scanline called before start".to_string(),
            ));
        }
        if self.rows_written >= self.height {
            // Extra scanlines are ignored, as libjpeg does.
            return Ok(0);
        }
        let row_len = self.width as usize * 3;
        if row.len() < row_len {
            return Err(CodecError::Fatal(format!(
                "scanline too short: {} < {}",
                row.len(),
                row_len
            )));
        }
        self.data.extend_from_slice(&row[..row_len]);
        self.rows_written += 1;
        Ok(1)
    }

    fn finish(self) -> Result<usize, CodecError> {
        if self.rows_written != self.height || !self.started {
            return Err(CodecError::Fatal(format!(
                "Application transferred too few scanlines ({} of {})",
                self.rows_written, self.height
            )));
        }

        let mut writer = CountingWriter::new(self.writer);
        let mut encoder = Encoder::new(&mut writer, self.quality);
        encoder.set_sampling_factor(self.sampling);
        encoder.set_optimized_huffman_tables(self.optimize_huffman);
        encoder
            .encode(
                &self.data,
                self.width as u16,
                self.height as u16,
                ColorType::Rgb,
            )
            .map_err(|e| CodecError::Fatal(e.to_string()))?;
        writer.flush()?;

        debug!(
            "encoded {}x{} at quality {} ({} bytes)",
            self.width, self.height, self.quality, writer.count
        );
        Ok(writer.count)
    }
}

/// Writer adapter that counts bytes passed through to the inner writer.
struct CountingWriter<W> {
    inner: W,
    count: usize,
}

impl<W> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
