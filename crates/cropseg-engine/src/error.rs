//! Error type returned by [`Session`](crate::Session) operations.

use crate::inference::EngineError;
use crate::region::RegionError;

/// Errors that can occur while processing a prompt.
///
/// Only [`Collaborator`](Self::Collaborator) can leave the inference
/// engine in a different state than before the call; the session's own
/// state is untouched by every variant.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The prompt is malformed or lies outside the image or the declared
    /// viewport.
    #[error("invalid prompt: {0}")]
    InvalidPrompt(String),

    /// The inference engine failed while encoding or predicting.
    #[error("inference engine failed: {0}")]
    Collaborator(#[from] EngineError),

    /// A requested region could not be made to fit the image.
    #[error(transparent)]
    OutOfBounds(#[from] RegionError),

    /// An operation needed an encoded region before any encode happened.
    #[error("no region has been encoded yet")]
    NotEncoded,
}

impl SessionError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidPrompt(msg.into())
    }
}
