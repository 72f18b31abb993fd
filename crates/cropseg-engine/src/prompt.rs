//! Prompts, as callers give them and as the inference collaborator
//! receives them.
//!
//! [`Prompt`] is always in full-image coordinates. [`LocalPrompt`] is the
//! same prompt translated into the encoded crop.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::grid::{Pixel, Rect};

/// Foreground and background clicks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointPrompt {
    /// Pixels on the object. At least one is required.
    pub positive: Vec<Pixel>,
    /// Pixels known not to belong to the object.
    #[serde(default)]
    pub negative: Vec<Pixel>,
}

impl PointPrompt {
    /// A prompt from positive and negative clicks.
    #[must_use]
    pub const fn new(positive: Vec<Pixel>, negative: Vec<Pixel>) -> Self {
        Self { positive, negative }
    }

    /// Every click, positives first.
    pub fn all(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.positive.iter().chain(&self.negative).copied()
    }
}

/// A binary raster marking the object, the size of the full image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskPrompt {
    /// Non-zero pixels are foreground.
    pub raster: GrayImage,
}

impl MaskPrompt {
    /// Wrap a raster.
    #[must_use]
    pub const fn new(raster: GrayImage) -> Self {
        Self { raster }
    }

    /// Tight bounding box of the foreground pixels, or `None` if there are
    /// none.
    #[must_use]
    pub fn foreground_bounds(&self) -> Option<Rect> {
        Rect::bounding(
            self.raster
                .enumerate_pixels()
                .filter(|(_, _, p)| p.0[0] != 0)
                .map(|(x, y, _)| Pixel::new(i64::from(x), i64::from(y))),
        )
    }
}

/// Any prompt, in image coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Click prompt.
    Points(PointPrompt),
    /// Box prompt.
    Box(Rect),
    /// Mask prompt.
    Mask(MaskPrompt),
}

/// A prompt translated into the encoded crop, as handed to
/// [`InferenceEngine::predict`](crate::InferenceEngine::predict).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalPrompt {
    /// Clicks in crop coordinates.
    Points {
        /// Foreground clicks.
        positive: Vec<Pixel>,
        /// Background clicks.
        negative: Vec<Pixel>,
    },
    /// Box in crop coordinates.
    Box(Rect),
    /// Mask raster the size of the crop.
    Mask(GrayImage),
}
