//! Run-length encoded binary masks.
//!
//! Runs alternate background / foreground, always starting with a
//! background run (possibly empty), in row-major order. The runs of a
//! well-formed [`Rle`] sum to exactly `width * height`.
//!
//! Zero-length runs are legal and meaningful: the rasterizer emits a zero
//! background run between two foreground runs that touch across a row
//! boundary, so that no foreground run ever spans two rows.

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, GrayImage};

/// Errors raised when constructing an [`Rle`] from raw runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RleError {
    /// The runs do not cover the canvas exactly.
    #[error("runs sum to {actual} pixels but the canvas has {expected}")]
    RunSumMismatch {
        /// `width * height`.
        expected: u64,
        /// Sum of the supplied runs.
        actual: u64,
    },
}

/// A binary mask stored as alternating background/foreground run lengths.
///
/// Deserialization goes through [`Rle::new`], so a decoded value always
/// covers its canvas exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RleProxy")]
pub struct Rle {
    dimensions: Dimensions,
    counts: Vec<u64>,
}

/// Unvalidated wire form of [`Rle`].
#[derive(Deserialize)]
struct RleProxy {
    dimensions: Dimensions,
    counts: Vec<u64>,
}

impl TryFrom<RleProxy> for Rle {
    type Error = RleError;

    fn try_from(proxy: RleProxy) -> Result<Self, Self::Error> {
        Self::new(proxy.dimensions, proxy.counts)
    }
}

impl Rle {
    /// Wrap raw run lengths, checking that they cover the canvas exactly.
    ///
    /// # Errors
    ///
    /// Returns [`RleError::RunSumMismatch`] if the runs do not sum to
    /// `width * height`.
    pub fn new(dimensions: Dimensions, counts: Vec<u64>) -> Result<Self, RleError> {
        let actual: u64 = counts.iter().sum();
        let expected = dimensions.pixel_count();
        if actual != expected {
            return Err(RleError::RunSumMismatch { expected, actual });
        }
        Ok(Self { dimensions, counts })
    }

    /// Build from runs produced by an encoder in this crate, whose totals
    /// are correct by construction.
    pub(crate) const fn from_parts(dimensions: Dimensions, counts: Vec<u64>) -> Self {
        Self { dimensions, counts }
    }

    /// An all-background mask.
    #[must_use]
    pub fn background(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            counts: vec![dimensions.pixel_count()],
        }
    }

    /// Encode a raster row-major; any non-zero pixel is foreground.
    ///
    /// Unlike the polygon rasterizer this encoder merges foreground runs
    /// that continue across a row boundary.
    #[must_use]
    pub fn from_raster(raster: &GrayImage) -> Self {
        let dimensions = Dimensions::new(raster.width(), raster.height());
        let mut counts = Vec::new();
        let mut foreground = false;
        let mut run = 0u64;
        for &v in raster.as_raw() {
            let is_fg = v != 0;
            if is_fg != foreground {
                counts.push(run);
                run = 0;
                foreground = is_fg;
            }
            run += 1;
        }
        counts.push(run);
        Self { dimensions, counts }
    }

    /// Canvas dimensions the runs cover.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// The raw alternating run lengths, starting with background.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of foreground pixels (sum of the odd-indexed runs).
    #[must_use]
    pub fn area(&self) -> u64 {
        self.counts.iter().skip(1).step_by(2).sum()
    }

    /// Returns `true` if no pixel is foreground.
    #[must_use]
    pub fn is_background(&self) -> bool {
        self.area() == 0
    }

    /// Iterate over non-empty foreground runs as `(start, length)` with
    /// `start` a 0-based row-major pixel index.
    pub fn foreground_runs(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        let mut cursor = 0u64;
        self.counts
            .iter()
            .enumerate()
            .filter_map(move |(i, &len)| {
                let start = cursor;
                cursor += len;
                (i % 2 == 1 && len > 0).then_some((start, len))
            })
    }

    /// Flat `[start1, length1, start2, length2, ...]` layout of the
    /// foreground runs (0-based, row-major).
    #[must_use]
    pub fn to_start_lengths(&self) -> Vec<u64> {
        self.foreground_runs()
            .flat_map(|(start, len)| [start, len])
            .collect()
    }

    /// Expand into one `bool` per pixel, row-major.
    #[must_use]
    pub fn decode(&self) -> Vec<bool> {
        let total = usize::try_from(self.dimensions.pixel_count()).unwrap_or(usize::MAX);
        let mut out = vec![false; total];
        for (start, len) in self.foreground_runs() {
            let start = usize::try_from(start).unwrap_or(total).min(total);
            let end = usize::try_from(len)
                .map_or(total, |len| start.saturating_add(len))
                .min(total);
            out[start..end].fill(true);
        }
        out
    }
}
