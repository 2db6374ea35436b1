//! Nearest-neighbour resize and crop.
//!
//! Two geometric modes are supported:
//!
//! - [`ResizeMode::Resize`] fits the whole source into the target box while
//!   keeping its aspect ratio. One output axis equals the target, the other
//!   is derived from it.
//! - [`ResizeMode::Crop`] fills the target exactly by sampling a centred
//!   sub-rectangle of the source with the target's aspect ratio.
//!
//! Each output pixel copies exactly one source pixel. How the step between
//! source samples is computed is chosen by [`ScalePolicy`].
//!
//! # Example
//!
//! ```ignore
//! // 128x128 thumbnail from the centre of the image
//! let thumb = resize(&image, 128, 128, ResizeMode::Crop)?;
//! ```

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::raster::{Raster, CHANNELS};

/// Errors that can occur during resize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResizeError {
    /// The source raster is empty or its storage doesn't match its size.
    #[error("Invalid source raster")]
    InvalidSource,

    /// Target width or height is zero.
    #[error("Invalid target size {width}x{height}: both dimensions must be at least 1")]
    InvalidTarget { width: u32, height: u32 },

    /// Output storage could not be allocated.
    #[error("Out of memory during resize")]
    OutOfMemory,
}

impl ResizeError {
    /// Resizing never reaches the codec, so no resize error is fatal.
    pub fn is_fatal(&self) -> bool {
        false
    }
}

/// Geometric mode of a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Aspect-preserving fit, no cropping.
    #[default]
    Resize,
    /// Fill the target exactly from a centred, aspect-matched sub-rectangle.
    Crop,
}

/// Arithmetic used for the source step per output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalePolicy {
    /// `span / out` as a real number; output pixel `i` samples `floor(i * step)`.
    #[default]
    Fractional,
    /// `span / out` truncated to an integer.
    ///
    /// Only meant for downscaling. For large reduction ratios it samples
    /// towards the top-left and never reaches the last rows and columns of
    /// the sub-rectangle. When upscaling the step is 0 and every output pixel
    /// repeats the sub-rectangle origin.
    IntegerTruncating,
}

/// A complete resize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub mode: ResizeMode,
    #[serde(default)]
    pub policy: ScalePolicy,
}

impl ResizeRequest {
    /// Request with the fractional policy.
    pub fn new(width: u32, height: u32, mode: ResizeMode) -> Self {
        Self {
            width,
            height,
            mode,
            policy: ScalePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ScalePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Pixel rectangle inside a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Geometry of one resize, computed before any pixel is touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizePlan {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Region of the source that is sampled.
    pub source: Rect,
    /// Source pixels per output pixel, horizontally.
    pub scale_x: f64,
    /// Source pixels per output pixel, vertically.
    pub scale_y: f64,
    pub policy: ScalePolicy,
}

impl ResizePlan {
    /// Source column sampled by output column `j`.
    pub fn source_x(&self, j: u32) -> u32 {
        self.source.x + sample(j, self.source.width, self.width, self.policy)
    }

    /// Source row sampled by output row `i`.
    pub fn source_y(&self, i: u32) -> u32 {
        self.source.y + sample(i, self.source.height, self.height, self.policy)
    }
}

/// Offset inside a span of `span` pixels for output index `i` of `out`.
fn sample(i: u32, span: u32, out: u32, policy: ScalePolicy) -> u32 {
    let offset = match policy {
        ScalePolicy::Fractional => {
            let step = span as f64 / out as f64;
            (i as f64 * step).floor() as u64
        }
        ScalePolicy::IntegerTruncating => u64::from(i) * u64::from(span / out),
    };
    offset.min(u64::from(span.saturating_sub(1))) as u32
}

/// Compute the geometry of a resize without allocating.
///
/// Returns `None` when the source or target has a zero dimension.
pub fn plan(src_width: u32, src_height: u32, request: &ResizeRequest) -> Option<ResizePlan> {
    if src_width == 0 || src_height == 0 || request.width == 0 || request.height == 0 {
        return None;
    }

    let (sw, sh) = (u64::from(src_width), u64::from(src_height));
    let (w, h) = (u64::from(request.width), u64::from(request.height));

    let (width, height, source) = match request.mode {
        ResizeMode::Crop => {
            let (sub_w, sub_h) = crop_span(sw, sh, w, h);
            let source = Rect {
                x: ((sw - sub_w) / 2) as u32,
                y: ((sh - sub_h) / 2) as u32,
                width: sub_w as u32,
                height: sub_h as u32,
            };
            (request.width, request.height, source)
        }
        ResizeMode::Resize => {
            let (out_w, out_h) = if sw < sh {
                (sw * h / sh, h)
            } else {
                (w, w * sh / sw)
            };
            let source = Rect {
                x: 0,
                y: 0,
                width: src_width,
                height: src_height,
            };
            (clamp_dim(out_w), clamp_dim(out_h), source)
        }
    };

    let (scale_x, scale_y) = match request.policy {
        ScalePolicy::Fractional => (
            source.width as f64 / width as f64,
            source.height as f64 / height as f64,
        ),
        ScalePolicy::IntegerTruncating => (
            (source.width / width) as f64,
            (source.height / height) as f64,
        ),
    };

    Some(ResizePlan {
        width,
        height,
        source,
        scale_x,
        scale_y,
        policy: request.policy,
    })
}

/// Largest `w:h` sub-rectangle of an `sw x sh` source.
///
/// The primary axis spans the whole source: width for portrait or square
/// sources, height for landscape ones. If the derived span would overflow the
/// source, the other axis spans it instead.
fn crop_span(sw: u64, sh: u64, w: u64, h: u64) -> (u64, u64) {
    let full_width = (sw, h * sw / w);
    let full_height = (w * sh / h, sh);

    let (sub_w, sub_h) = if sw <= sh {
        if full_width.1 <= sh {
            full_width
        } else {
            full_height
        }
    } else if full_height.0 <= sw {
        full_height
    } else {
        full_width
    };
    (sub_w.clamp(1, sw), sub_h.clamp(1, sh))
}

fn clamp_dim(value: u64) -> u32 {
    value.clamp(1, u64::from(u32::MAX)) as u32
}

/// Resize with the fractional policy.
///
/// # Arguments
///
/// * `src` - Source raster; never modified
/// * `width` - Target width (at least 1)
/// * `height` - Target height (at least 1)
/// * `mode` - [`ResizeMode::Resize`] to fit, [`ResizeMode::Crop`] to fill
///
/// # Returns
///
/// A new raster with its own storage.
pub fn resize(
    src: &Raster,
    width: u32,
    height: u32,
    mode: ResizeMode,
) -> Result<Raster, ResizeError> {
    resize_with(src, &ResizeRequest::new(width, height, mode))
}

/// Resize according to a full [`ResizeRequest`].
pub fn resize_with(src: &Raster, request: &ResizeRequest) -> Result<Raster, ResizeError> {
    if !src.is_valid() {
        return Err(ResizeError::InvalidSource);
    }
    let plan = plan(src.width, src.height, request).ok_or(ResizeError::InvalidTarget {
        width: request.width,
        height: request.height,
    })?;

    let mut columns = Vec::new();
    columns
        .try_reserve_exact(plan.width as usize)
        .map_err(|_| ResizeError::OutOfMemory)?;
    columns.extend((0..plan.width).map(|j| plan.source_x(j) as usize * CHANNELS));

    let mut out = Raster::try_alloc(plan.width, plan.height).ok_or(ResizeError::OutOfMemory)?;
    let src_stride = src.width as usize * CHANNELS;
    let dst_stride = plan.width as usize * CHANNELS;

    for (i, dst_row) in out.pixels.chunks_exact_mut(dst_stride).enumerate() {
        let sy = plan.source_y(i as u32) as usize;
        let src_row = &src.pixels[sy * src_stride..(sy + 1) * src_stride];
        for (dst, &sx) in dst_row.chunks_exact_mut(CHANNELS).zip(&columns) {
            dst.copy_from_slice(&src_row[sx..sx + CHANNELS]);
        }
    }

    debug!(
        "resized {}x{} -> {}x{} ({:?}, {:?}, source {:?})",
        src.width, src.height, plan.width, plan.height, request.mode, plan.policy, plan.source
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Each pixel encodes its own coordinates: R = x, G = y.
    fn coords(width: u32, height: u32) -> Raster {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        Raster::new(width, height, pixels)
    }

    fn sampled_columns(out: &Raster) -> Vec<u8> {
        (0..out.width).map(|x| out.pixel(x, 0).unwrap()[0]).collect()
    }

    #[test]
    fn test_crop_landscape_to_square_takes_centre() {
        let src = coords(100, 50);
        let out = resize(&src, 50, 50, ResizeMode::Crop).unwrap();

        assert_eq!((out.width, out.height), (50, 50));
        for y in 0..50 {
            for x in 0..50 {
                assert_eq!(out.pixel(x, y), src.pixel(x + 25, y));
            }
        }
    }

    #[test]
    fn test_crop_plan_landscape() {
        let p = plan(100, 50, &ResizeRequest::new(50, 50, ResizeMode::Crop)).unwrap();
        assert_eq!(
            p.source,
            Rect {
                x: 25,
                y: 0,
                width: 50,
                height: 50
            }
        );
        assert_eq!((p.scale_x, p.scale_y), (1.0, 1.0));
    }

    #[test]
    fn test_crop_plan_portrait() {
        let p = plan(60, 120, &ResizeRequest::new(30, 30, ResizeMode::Crop)).unwrap();
        assert_eq!(
            p.source,
            Rect {
                x: 0,
                y: 30,
                width: 60,
                height: 60
            }
        );
        assert_eq!((p.width, p.height), (30, 30));
    }

    #[test]
    fn test_crop_falls_back_when_slice_exceeds_source() {
        // Square source, tall target: full-width slice would be 200 rows.
        let p = plan(100, 100, &ResizeRequest::new(10, 20, ResizeMode::Crop)).unwrap();
        assert_eq!(
            p.source,
            Rect {
                x: 25,
                y: 0,
                width: 50,
                height: 100
            }
        );

        // Landscape source, very wide target.
        let p = plan(100, 80, &ResizeRequest::new(40, 10, ResizeMode::Crop)).unwrap();
        assert_eq!(
            p.source,
            Rect {
                x: 0,
                y: 27,
                width: 100,
                height: 25
            }
        );
    }

    #[test]
    fn test_crop_degenerate_slice_is_at_least_one_pixel() {
        let p = plan(1, 1000, &ResizeRequest::new(1000, 1, ResizeMode::Crop)).unwrap();
        assert_eq!(p.source.width, 1);
        assert_eq!(p.source.height, 1);

        let out = resize(&coords(1, 200), 300, 1, ResizeMode::Crop).unwrap();
        assert_eq!((out.width, out.height), (300, 1));
    }

    #[test]
    fn test_resize_fits_landscape() {
        let out = resize(&coords(200, 100), 50, 50, ResizeMode::Resize).unwrap();
        assert_eq!((out.width, out.height), (50, 25));
    }

    #[test]
    fn test_resize_fits_portrait() {
        let out = resize(&coords(100, 200), 50, 50, ResizeMode::Resize).unwrap();
        assert_eq!((out.width, out.height), (25, 50));
    }

    #[test]
    fn test_resize_square_source_uses_target_width() {
        let p = plan(64, 64, &ResizeRequest::new(20, 30, ResizeMode::Resize)).unwrap();
        assert_eq!((p.width, p.height), (20, 20));
    }

    #[test]
    fn test_resize_extreme_aspect_keeps_one_pixel() {
        let p = plan(1000, 1, &ResizeRequest::new(10, 10, ResizeMode::Resize)).unwrap();
        assert_eq!((p.width, p.height), (10, 1));
    }

    #[test]
    fn test_fractional_and_integer_sampling_differ() {
        let src = coords(10, 1);
        let fit = ResizeRequest::new(4, 4, ResizeMode::Resize);
        let out = resize_with(&src, &fit).unwrap();
        assert_eq!((out.width, out.height), (4, 1));
        assert_eq!(sampled_columns(&out), vec![0, 2, 5, 7]);

        let out = resize_with(&src, &fit.with_policy(ScalePolicy::IntegerTruncating)).unwrap();
        assert_eq!(sampled_columns(&out), vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_integer_policy_upscale_repeats_origin() {
        let src = coords(4, 4);
        let request =
            ResizeRequest::new(8, 8, ResizeMode::Resize).with_policy(ScalePolicy::IntegerTruncating);
        let out = resize_with(&src, &request).unwrap();

        assert_eq!((out.width, out.height), (8, 8));
        assert!(out.pixels.chunks(3).all(|p| p == [0, 0, 0]));
    }

    #[test]
    fn test_fractional_upscale_repeats_neighbours() {
        let out = resize(&coords(2, 2), 4, 4, ResizeMode::Resize).unwrap();
        assert_eq!(sampled_columns(&out), vec![0, 0, 1, 1]);
        assert_eq!(out.pixel(0, 3), Some([0, 1, 0]));
    }

    #[test]
    fn test_zero_target_is_rejected() {
        let src = coords(10, 10);
        assert_eq!(
            resize(&src, 0, 10, ResizeMode::Resize),
            Err(ResizeError::InvalidTarget {
                width: 0,
                height: 10
            })
        );
        assert!(matches!(
            resize(&src, 10, 0, ResizeMode::Crop),
            Err(ResizeError::InvalidTarget { .. })
        ));
        assert!(plan(10, 10, &ResizeRequest::new(0, 0, ResizeMode::Crop)).is_none());
        assert!(!ResizeError::OutOfMemory.is_fatal());
    }

    #[test]
    fn test_invalid_source_is_rejected() {
        assert_eq!(
            resize(&Raster::empty(), 10, 10, ResizeMode::Resize),
            Err(ResizeError::InvalidSource)
        );

        let mismatched = Raster {
            width: 10,
            height: 10,
            pixels: vec![0; 12],
        };
        assert_eq!(
            resize(&mismatched, 5, 5, ResizeMode::Crop),
            Err(ResizeError::InvalidSource)
        );
    }

    #[test]
    fn test_source_is_untouched() {
        let src = coords(30, 20);
        let before = src.clone();
        let _ = resize(&src, 7, 9, ResizeMode::Crop).unwrap();
        let _ = resize(&src, 70, 90, ResizeMode::Resize).unwrap();
        assert_eq!(src, before);
    }

    #[test]
    fn test_same_size_is_copy() {
        let src = coords(16, 9);
        assert_eq!(resize(&src, 16, 9, ResizeMode::Crop).unwrap(), src);
        assert_eq!(resize(&src, 16, 16, ResizeMode::Resize).unwrap(), src);
    }

    #[test]
    fn test_request_defaults() {
        let request = ResizeRequest::new(1, 2, ResizeMode::default());
        assert_eq!(request.mode, ResizeMode::Resize);
        assert_eq!(request.policy, ScalePolicy::Fractional);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
