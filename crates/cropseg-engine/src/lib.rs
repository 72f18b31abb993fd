//! cropseg-engine: region tracking and re-encoding decisions for
//! promptable segmentation of large images.
//!
//! A promptable segmentation model can only encode a bounded-resolution
//! crop of a large image, and encoding is expensive. A [`Session`] keeps
//! track of which crop is currently encoded and, for every prompt, decides
//! whether that encoding can be reused, should grow to the user's viewport,
//! or must move to a crop fitted to the prompt:
//!
//! - [`grid`]: integer pixels and rectangles
//! - [`region`]: the encoded region and its tracker
//! - [`transform`]: image <-> crop coordinates
//! - [`decision`]: the pure reuse / extend / recrop planner
//! - [`session`]: validation, encode, predict, translate back
//! - [`reference`]: an in-process threshold engine
//!
//! The model itself sits behind the [`InferenceEngine`] trait.

pub mod config;
pub mod decision;
pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod inference;
pub mod prompt;
pub mod reference;
pub mod region;
pub mod session;
pub mod transform;

pub use config::{ConfigError, EngineConfig};
pub use decision::Decision;
pub use diagnostics::SessionDiagnostics;
pub use error::SessionError;
pub use grid::{Pixel, Rect};
pub use inference::{EngineError, InferenceEngine};
pub use prompt::{LocalPrompt, MaskPrompt, PointPrompt, Prompt};
pub use reference::{CancelFlag, ThresholdEngine, ThresholdEngineConfig};
pub use region::{EncodedRegion, RegionError, RegionTracker};
pub use session::Session;
