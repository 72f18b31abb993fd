//! The annotation entity: one detected object's outline and its RLE.
//!
//! A [`Mask`] keeps its original contour forever and exposes a ladder of
//! simplified versions of it. Each rung sits at `level * step` pixels of
//! Douglas-Peucker tolerance, is computed the first time it is visited and
//! memoized afterwards. [`Mask::simplify`] and [`Mask::complicate`] move
//! one rung up or down.
//!
//! The stored RLE always describes the original contour. At any level
//! above zero [`Mask::rle`] rasterizes the current contour on demand
//! instead of returning the stored encoding.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::raster::contour_to_rle;
use crate::rle::Rle;
use crate::simplify::simplify;
use crate::types::{Dimensions, Polygon};

static NEXT_MASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique mask identifier, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaskId(u64);

impl MaskId {
    fn next() -> Self {
        Self(NEXT_MASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mask#{}", self.0)
    }
}

/// One segmented object.
///
/// Not `Clone`: a copy would share the identifier of its source.
#[derive(Debug)]
pub struct Mask {
    id: MaskId,
    dimensions: Dimensions,
    /// Level 0 of the ladder.
    original: Polygon,
    /// Encoding of `original`.
    rle: Rle,
    /// Current rung, in steps.
    level: u32,
    /// Tolerance added per rung, in pixels.
    step: f64,
    /// Memoized rungs above level 0.
    levels: BTreeMap<u32, Polygon>,
}

impl Mask {
    /// Tolerance added by each simplification step, in pixels.
    pub const DEFAULT_STEP: f64 = 0.5;

    /// Wrap a contour and the RLE the inference collaborator produced for it.
    ///
    /// The canvas size is taken from `rle`.
    #[must_use]
    pub fn new(contour: Polygon, rle: Rle) -> Self {
        Self {
            id: MaskId::next(),
            dimensions: rle.dimensions(),
            original: contour,
            rle,
            level: 0,
            step: Self::DEFAULT_STEP,
            levels: BTreeMap::new(),
        }
    }

    /// Wrap a contour, rasterizing its RLE on a `dimensions` canvas.
    #[must_use]
    pub fn from_contour(contour: Polygon, dimensions: Dimensions) -> Self {
        let rle = contour_to_rle(&contour, dimensions.width, dimensions.height);
        Self::new(contour, rle)
    }

    /// Use a different per-step tolerance.
    ///
    /// Non-positive or non-finite values are ignored. Any memoized rungs
    /// are discarded and the mask returns to level 0.
    #[must_use]
    pub fn with_step(mut self, step: f64) -> Self {
        if step.is_finite() && step > 0.0 {
            self.step = step;
            self.levels.clear();
            self.level = 0;
        }
        self
    }

    /// Stable identifier.
    #[must_use]
    pub const fn id(&self) -> MaskId {
        self.id
    }

    /// Canvas the RLE covers.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Current simplification tolerance in pixels (`level * step`).
    #[must_use]
    pub fn simplification_level(&self) -> f64 {
        f64::from(self.level) * self.step
    }

    /// Current rung, counted in steps.
    #[must_use]
    pub const fn level_steps(&self) -> u32 {
        self.level
    }

    /// The unsimplified contour.
    #[must_use]
    pub const fn original(&self) -> &Polygon {
        &self.original
    }

    /// The contour at the current simplification level.
    #[must_use]
    pub fn contour(&self) -> &Polygon {
        if self.level == 0 {
            return &self.original;
        }
        self.levels.get(&self.level).unwrap_or(&self.original)
    }

    /// The mask's RLE at the current level.
    ///
    /// Level 0 borrows the stored encoding; any other level rasterizes the
    /// current contour, since the stored runs describe the original one.
    #[must_use]
    pub fn rle(&self) -> Cow<'_, Rle> {
        if self.level == 0 {
            Cow::Borrowed(&self.rle)
        } else {
            Cow::Owned(contour_to_rle(
                self.contour(),
                self.dimensions.width,
                self.dimensions.height,
            ))
        }
    }

    /// Step one rung up the ladder and return the new contour.
    pub fn simplify(&mut self) -> &Polygon {
        let next = self.level.saturating_add(1);
        if !self.levels.contains_key(&next) {
            let epsilon = f64::from(next) * self.step;
            let simplified = simplify(&self.original, epsilon);
            self.levels.insert(next, simplified);
        }
        self.level = next;
        self.contour()
    }

    /// Step one rung down the ladder and return the new contour.
    ///
    /// At level 0 this does nothing.
    pub fn complicate(&mut self) -> &Polygon {
        if self.level > 0 {
            self.level -= 1;
        }
        self.contour()
    }

    /// Replace the contour, e.g. after a manual edit.
    ///
    /// The ladder is cleared, the level resets to 0 and the RLE is
    /// re-rasterized from the new contour.
    pub fn set_contour(&mut self, contour: Polygon) {
        self.rle = contour_to_rle(&contour, self.dimensions.width, self.dimensions.height);
        self.original = contour;
        self.levels.clear();
        self.level = 0;
    }

    /// Number of distinct rungs computed so far, level 0 included.
    #[must_use]
    pub fn cached_levels(&self) -> usize {
        self.levels.len() + 1
    }
}
