//! The encoded region and the tracker that owns it.
//!
//! The tracker holds at most one [`EncodedRegion`] at a time. It is set by
//! the first successful encode and replaced wholesale by later ones; a
//! region is never adjusted in place.

use serde::{Deserialize, Serialize};

use cropseg_geometry::Dimensions;

use crate::grid::Rect;

/// Errors raised when building an [`EncodedRegion`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    /// The rectangle covers no pixel.
    #[error("region {0:?} is empty")]
    Empty(Rect),

    /// The rectangle reaches outside the image.
    #[error("region {region:?} is not inside the {width}x{height} image")]
    OutOfBounds {
        /// Offending rectangle.
        region: Rect,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// A side is shorter than the minimum encoded side.
    #[error("region {region:?} has a side below the minimum of {min_side}")]
    TooSmall {
        /// Offending rectangle.
        region: Rect,
        /// Minimum side for this image.
        min_side: u32,
    },
}

/// The image crop the inference collaborator currently holds an encoding
/// of.
///
/// Always non-empty, inside the image, and at least the minimum encoded
/// side on both axes (or the full image side when the image is smaller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedRegion {
    rect: Rect,
}

impl EncodedRegion {
    /// Validate `rect` against `image`.
    ///
    /// # Errors
    ///
    /// Returns a [`RegionError`] if the rectangle is empty, leaves the
    /// image, or has a side below `min_side` (capped by the image side).
    pub fn new(rect: Rect, image: Dimensions, min_side: u32) -> Result<Self, RegionError> {
        if rect.is_empty() {
            return Err(RegionError::Empty(rect));
        }
        if !Rect::of_image(image).contains_rect(&rect) {
            return Err(RegionError::OutOfBounds {
                region: rect,
                width: image.width,
                height: image.height,
            });
        }
        let too_narrow = rect.width < i64::from(min_side.min(image.width));
        let too_short = rect.height < i64::from(min_side.min(image.height));
        if too_narrow || too_short {
            return Err(RegionError::TooSmall {
                region: rect,
                min_side,
            });
        }
        Ok(Self { rect })
    }

    /// The region as a rectangle in image coordinates.
    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Crop origin column.
    #[must_use]
    pub const fn x(&self) -> i64 {
        self.rect.x
    }

    /// Crop origin row.
    #[must_use]
    pub const fn y(&self) -> i64 {
        self.rect.y
    }

    /// Crop width.
    #[must_use]
    pub const fn width(&self) -> i64 {
        self.rect.width
    }

    /// Crop height.
    #[must_use]
    pub const fn height(&self) -> i64 {
        self.rect.height
    }

    /// `(x, y, width, height)` as image buffer indices.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn crop_bounds(&self) -> (u32, u32, u32, u32) {
        // Validated to lie inside a u32-sized image.
        (
            self.rect.x as u32,
            self.rect.y as u32,
            self.rect.width as u32,
            self.rect.height as u32,
        )
    }
}

/// Tracks which part of the image is currently encoded.
#[derive(Debug, Clone)]
pub struct RegionTracker {
    image: Dimensions,
    region: Option<EncodedRegion>,
    resolution_margin: f64,
}

impl RegionTracker {
    /// A tracker for an image of the given size with nothing encoded yet.
    #[must_use]
    pub const fn new(image: Dimensions, resolution_margin: f64) -> Self {
        Self {
            image,
            region: None,
            resolution_margin,
        }
    }

    /// Size of the full image.
    #[must_use]
    pub const fn image(&self) -> Dimensions {
        self.image
    }

    /// The current region, or `None` before the first encode.
    #[must_use]
    pub const fn current_region(&self) -> Option<EncodedRegion> {
        self.region
    }

    /// Returns `true` if a region is encoded and it contains all of `rect`.
    #[must_use]
    pub fn contains(&self, rect: &Rect) -> bool {
        self.region.is_some_and(|r| r.rect().contains_rect(rect))
    }

    /// Returns `true` if the current region contains `rect` and is not
    /// much larger than it: `region side * resolution_margin <= rect side`
    /// on both axes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn covers(&self, rect: &Rect) -> bool {
        self.region.is_some_and(|r| {
            let outer = r.rect();
            outer.contains_rect(rect)
                && outer.width as f64 * self.resolution_margin <= rect.width as f64
                && outer.height as f64 * self.resolution_margin <= rect.height as f64
        })
    }

    /// Swap in a freshly encoded region.
    pub const fn replace(&mut self, region: EncodedRegion) {
        self.region = Some(region);
    }
}
