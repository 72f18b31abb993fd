//! cropseg-geometry: annotation geometry (sans-IO).
//!
//! Everything the segmentation session does with outlines once the
//! inference collaborator has produced them:
//!
//! - Douglas-Peucker contour simplification ([`simplify`])
//! - scanline polygon rasterization into run-length masks ([`raster`],
//!   [`rle`])
//! - the [`Mask`] annotation entity with its memoized simplification
//!   ladder ([`mask`])
//! - compositing many masks into a label raster ([`label`])
//! - tracing outlines out of binary rasters ([`contour`])
//!
//! This crate performs no I/O and keeps no shared state beyond the
//! counter behind [`MaskId`].

pub mod contour;
pub mod label;
pub mod mask;
pub mod raster;
pub mod rle;
pub mod simplify;
pub mod types;

pub use label::{CompositeError, LabelImage, build_label, paint_masks};
pub use mask::{Mask, MaskId};
pub use raster::contour_to_rle;
pub use rle::{Rle, RleError};
pub use types::{Dimensions, GrayImage, Point, Polygon};
