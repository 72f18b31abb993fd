//! Label compositing: paint many masks into one integer raster.
//!
//! Label `0` is background. Masks are painted in iteration order with
//! labels `1, 2, ...`; where masks overlap the later one wins. There is no
//! blending.

use image::{ImageBuffer, Luma};

use crate::mask::{Mask, MaskId};
use crate::rle::Rle;
use crate::types::Dimensions;

/// One `u16` label per pixel, row-major.
pub type LabelImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Errors that can occur while compositing masks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositeError {
    /// A mask was encoded against a different canvas.
    #[error("{id} covers {actual:?} but the label canvas is {expected:?}")]
    DimensionMismatch {
        /// The offending mask.
        id: MaskId,
        /// Canvas being painted.
        expected: Dimensions,
        /// Canvas the mask's RLE covers.
        actual: Dimensions,
    },

    /// More masks than distinct non-zero labels.
    #[error("cannot label more than {max} masks", max = u16::MAX)]
    TooManyMasks,
}

/// Composite `masks` into a fresh `width x height` label raster.
///
/// # Errors
///
/// See [`paint_masks`].
pub fn build_label<'a, I>(width: u32, height: u32, masks: I) -> Result<LabelImage, CompositeError>
where
    I: IntoIterator<Item = &'a Mask>,
{
    paint_masks(LabelImage::new(width, height), masks)
}

/// Paint `masks` onto an existing raster, taking and returning ownership
/// of the buffer.
///
/// Labels start at `1` regardless of what the raster already holds.
///
/// # Errors
///
/// Returns [`CompositeError::DimensionMismatch`] if a mask's canvas
/// differs from the raster's, and [`CompositeError::TooManyMasks`] past
/// `u16::MAX` masks.
pub fn paint_masks<'a, I>(mut raster: LabelImage, masks: I) -> Result<LabelImage, CompositeError>
where
    I: IntoIterator<Item = &'a Mask>,
{
    let expected = Dimensions::new(raster.width(), raster.height());
    for (index, mask) in masks.into_iter().enumerate() {
        let label = index
            .checked_add(1)
            .and_then(|l| u16::try_from(l).ok())
            .ok_or(CompositeError::TooManyMasks)?;
        if mask.dimensions() != expected {
            return Err(CompositeError::DimensionMismatch {
                id: mask.id(),
                expected,
                actual: mask.dimensions(),
            });
        }
        paint_rle(&mut raster, &mask.rle(), label);
    }
    Ok(raster)
}

/// Write `label` into every foreground pixel of `rle`.
///
/// Runs reaching past the end of the raster are truncated.
pub fn paint_rle(raster: &mut LabelImage, rle: &Rle, label: u16) {
    let pixels: &mut [u16] = raster;
    let total = pixels.len();
    for (start, len) in rle.foreground_runs() {
        let start = usize::try_from(start).unwrap_or(total).min(total);
        let end = usize::try_from(len)
            .map_or(total, |len| start.saturating_add(len))
            .min(total);
        pixels[start..end].fill(label);
    }
}
