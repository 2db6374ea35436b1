//! Geometric transforms: nearest-neighbour resize and centred crop.
//!
//! Transforms are pure: the source raster is only borrowed and the result
//! owns fresh storage. Target sizes are validated before anything is
//! allocated.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner
//! - Sub-rectangles are in source pixels
//! - The CROP sub-rectangle is centred on the axis it does not span

mod resize;

pub use resize::{
    plan, resize, resize_with, Rect, ResizeError, ResizeMode, ResizePlan, ResizeRequest,
    ScalePolicy,
};
