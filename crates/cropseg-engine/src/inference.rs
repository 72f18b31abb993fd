//! The capability the session needs from a promptable segmentation model.
//!
//! Implementations are opaque: they may run the model in-process, call out
//! to another process, or talk to a server. Both calls block until the
//! model answers.

use image::RgbaImage;

use cropseg_geometry::Polygon;

use crate::prompt::LocalPrompt;

/// Failure reported by an [`InferenceEngine`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The engine could not be reached or the exchange broke down.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The engine was reached but the model failed.
    #[error("computation failure: {0}")]
    Computation(String),

    /// The call was cancelled before it completed.
    #[error("cancelled")]
    Cancelled,
}

/// A promptable segmentation model with an explicit encode step.
///
/// A successful `encode` replaces whatever the engine held before. `predict` works on
/// the most recent successful encoding, with prompts in the coordinates of
/// that crop; the polygons it returns are in the same coordinates.
pub trait InferenceEngine {
    /// Compute and keep the embedding of `crop`.
    ///
    /// # Errors
    ///
    /// Any [`EngineError`]. A failed encode must leave the previous
    /// encoding in place: the session keeps predicting against it.
    fn encode(&mut self, crop: &RgbaImage) -> Result<(), EngineError>;

    /// Segment the encoded crop.
    ///
    /// With `return_all` the engine may return every candidate outline;
    /// otherwise it should return its best one.
    ///
    /// # Errors
    ///
    /// Any [`EngineError`].
    fn predict(&mut self, prompt: &LocalPrompt, return_all: bool)
    -> Result<Vec<Polygon>, EngineError>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn encode(&mut self, crop: &RgbaImage) -> Result<(), EngineError> {
        (**self).encode(crop)
    }

    fn predict(
        &mut self,
        prompt: &LocalPrompt,
        return_all: bool,
    ) -> Result<Vec<Polygon>, EngineError> {
        (**self).predict(prompt, return_all)
    }
}
