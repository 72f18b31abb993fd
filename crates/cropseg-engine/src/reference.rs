//! An in-process [`InferenceEngine`] that segments by luma threshold.
//!
//! Encoding thresholds the crop into a binary raster; prediction traces the
//! outer outlines of its components and keeps those the prompt touches.
//! No model is involved, which makes the engine useful for demos, for the
//! CLI and for exercising sessions end to end.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use geo::Intersects;
use image::{GrayImage, Luma, RgbaImage, imageops};
use serde::{Deserialize, Serialize};

use cropseg_geometry::Polygon;
use cropseg_geometry::contour::trace_outlines;

use crate::grid::Pixel;
use crate::inference::{EngineError, InferenceEngine};
use crate::prompt::LocalPrompt;

/// Threshold engine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdEngineConfig {
    /// Pixels with luma at or above this value are foreground.
    pub threshold: u8,
    /// Treat dark pixels as foreground instead.
    pub invert: bool,
}

impl ThresholdEngineConfig {
    /// Default for [`threshold`](Self::threshold).
    pub const DEFAULT_THRESHOLD: u8 = 128;
}

impl Default for ThresholdEngineConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            invert: false,
        }
    }
}

/// Shared flag that makes an engine's calls fail with
/// [`EngineError::Cancelled`] while it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A cleared flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Returns `true` while the flag is set.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Luma-threshold segmentation engine.
#[derive(Debug, Default)]
pub struct ThresholdEngine {
    config: ThresholdEngineConfig,
    cancel: CancelFlag,
    encoded: Option<GrayImage>,
}

impl ThresholdEngine {
    /// An engine with nothing encoded.
    #[must_use]
    pub fn new(config: ThresholdEngineConfig) -> Self {
        Self {
            config,
            cancel: CancelFlag::new(),
            encoded: None,
        }
    }

    /// A handle on this engine's cancel flag.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Binary raster of the last encoded crop.
    #[must_use]
    pub const fn encoded(&self) -> Option<&GrayImage> {
        self.encoded.as_ref()
    }

    fn check_cancelled(&self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn to_geo(polygon: &Polygon) -> geo::Polygon<f64> {
    let ring: Vec<geo::Coord<f64>> = polygon
        .points()
        .iter()
        .map(|p| geo::Coord { x: p.x, y: p.y })
        .collect();
    geo::Polygon::new(geo::LineString::new(ring), Vec::new())
}

#[allow(clippy::cast_precision_loss)]
fn pixel_point(p: Pixel) -> geo::Point<f64> {
    geo::Point::new(p.x as f64, p.y as f64)
}

impl InferenceEngine for ThresholdEngine {
    fn encode(&mut self, crop: &RgbaImage) -> Result<(), EngineError> {
        self.check_cancelled()?;
        let gray = imageops::grayscale(crop);
        let ThresholdEngineConfig { threshold, invert } = self.config;
        let binary = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let on = (gray.get_pixel(x, y).0[0] >= threshold) != invert;
            Luma([if on { 255 } else { 0 }])
        });
        self.encoded = Some(binary);
        Ok(())
    }

    fn predict(
        &mut self,
        prompt: &LocalPrompt,
        return_all: bool,
    ) -> Result<Vec<Polygon>, EngineError> {
        self.check_cancelled()?;
        let binary = self
            .encoded
            .as_ref()
            .ok_or_else(|| EngineError::Computation("predict before encode".to_owned()))?;

        let mut selected: Vec<Polygon> = match prompt {
            LocalPrompt::Points { positive, negative } => trace_outlines(binary)
                .into_iter()
                .filter(|outline| {
                    let shape = to_geo(outline);
                    positive.iter().any(|&p| shape.intersects(&pixel_point(p)))
                        && !negative.iter().any(|&p| shape.intersects(&pixel_point(p)))
                })
                .collect(),
            LocalPrompt::Box(rect) => {
                #[allow(clippy::cast_precision_loss)]
                let area = geo::Rect::new(
                    geo::Coord {
                        x: rect.x as f64,
                        y: rect.y as f64,
                    },
                    geo::Coord {
                        x: (rect.right() - 1) as f64,
                        y: (rect.bottom() - 1) as f64,
                    },
                );
                trace_outlines(binary)
                    .into_iter()
                    .filter(|outline| to_geo(outline).intersects(&area))
                    .collect()
            }
            LocalPrompt::Mask(raster) => {
                if raster.dimensions() != binary.dimensions() {
                    return Err(EngineError::Computation(format!(
                        "mask is {:?} but the encoded crop is {:?}",
                        raster.dimensions(),
                        binary.dimensions()
                    )));
                }
                let both = GrayImage::from_fn(binary.width(), binary.height(), |x, y| {
                    let on = binary.get_pixel(x, y).0[0] != 0 && raster.get_pixel(x, y).0[0] != 0;
                    Luma([if on { 255 } else { 0 }])
                });
                trace_outlines(&both)
            }
        };

        if !return_all {
            selected.sort_by(|a, b| b.area().total_cmp(&a.area()));
            selected.truncate(1);
        }
        Ok(selected)
    }
}
