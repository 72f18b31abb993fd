//! Integer image-grid primitives: pixels and half-open rectangles.
//!
//! All region arithmetic happens in `i64` so that expansions past the
//! image edge can be expressed before clipping. Edges saturate at the
//! `i64` limits, so caller-supplied rectangles far off the grid clip to
//! nothing instead of overflowing.

use serde::{Deserialize, Serialize};

use cropseg_geometry::Dimensions;

/// A pixel position on the image grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pixel {
    /// Column.
    pub x: i64,
    /// Row.
    pub y: i64,
}

impl Pixel {
    /// Create a new pixel position.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle covering columns `x .. x + width` and rows
/// `y .. y + height` (half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left column.
    pub x: i64,
    /// Top row.
    pub y: i64,
    /// Number of columns.
    pub width: i64,
    /// Number of rows.
    pub height: i64,
}

impl Rect {
    /// Create a rectangle from its origin and size.
    #[must_use]
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning two corners, in either order.
    ///
    /// `(x1, y1)` is exclusive once the corners are sorted.
    #[must_use]
    pub fn from_corners(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        let (left, right) = (x0.min(x1), x0.max(x1));
        let (top, bottom) = (y0.min(y1), y0.max(y1));
        Self::new(left, top, right.saturating_sub(left), bottom.saturating_sub(top))
    }

    /// The whole image.
    #[must_use]
    pub fn of_image(image: Dimensions) -> Self {
        Self::new(0, 0, i64::from(image.width), i64::from(image.height))
    }

    /// Smallest rectangle holding every pixel in `pixels`, or `None` when
    /// the iterator is empty.
    pub fn bounding<I: IntoIterator<Item = Pixel>>(pixels: I) -> Option<Self> {
        let mut iter = pixels.into_iter();
        let first = iter.next()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in iter {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Some(Self::new(
            x0,
            y0,
            x1.saturating_sub(x0).saturating_add(1),
            y1.saturating_sub(y0).saturating_add(1),
        ))
    }

    /// Exclusive right edge.
    #[must_use]
    pub const fn right(&self) -> i64 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    #[must_use]
    pub const fn bottom(&self) -> i64 {
        self.y.saturating_add(self.height)
    }

    /// Returns `true` if the rectangle covers no pixel.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Returns `true` if `other` lies entirely inside `self`.
    #[must_use]
    pub const fn contains_rect(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns `true` if `p` is one of the covered pixels.
    #[must_use]
    pub const fn contains_pixel(&self, p: Pixel) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.right() && p.y < self.bottom()
    }

    /// Grow by `dx` columns on the left and right and `dy` rows on the top
    /// and bottom.
    #[must_use]
    pub const fn expand(&self, dx: i64, dy: i64) -> Self {
        Self::new(
            self.x.saturating_sub(dx),
            self.y.saturating_sub(dy),
            self.width.saturating_add(dx.saturating_mul(2)),
            self.height.saturating_add(dy.saturating_mul(2)),
        )
    }

    /// Overlap of two rectangles, or `None` when they do not overlap.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        let out = Self::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0));
        (!out.is_empty()).then_some(out)
    }

    /// Clip to the image, or `None` if nothing remains.
    #[must_use]
    pub fn clip_to(&self, image: Dimensions) -> Option<Self> {
        self.intersect(&Self::of_image(image))
    }

    /// Rectangle of the given size centred on the centre of `self`.
    #[must_use]
    pub const fn recentered(&self, width: i64, height: i64) -> Self {
        let cx = self.x.saturating_add(self.width / 2);
        let cy = self.y.saturating_add(self.height / 2);
        Self::new(cx.saturating_sub(width / 2), cy.saturating_sub(height / 2), width, height)
    }

    /// Slide the rectangle so it lies inside the image, keeping its size
    /// where possible; sides longer than the image are clipped.
    #[must_use]
    pub fn shifted_inside(&self, image: Dimensions) -> Self {
        let (iw, ih) = (i64::from(image.width), i64::from(image.height));
        let width = self.width.min(iw);
        let height = self.height.min(ih);
        let x = self.x.clamp(0, iw - width);
        let y = self.y.clamp(0, ih - height);
        Self::new(x, y, width, height)
    }

    /// Grow each side to at least `min_side` (or the image side, if
    /// smaller) around the rectangle's centre, then slide it inside the
    /// image.
    #[must_use]
    pub fn with_min_side(&self, min_side: u32, image: Dimensions) -> Self {
        let min_w = i64::from(min_side.min(image.width));
        let min_h = i64::from(min_side.min(image.height));
        let grown = if self.width < min_w || self.height < min_h {
            self.recentered(self.width.max(min_w), self.height.max(min_h))
        } else {
            *self
        };
        grown.shifted_inside(image)
    }
}
