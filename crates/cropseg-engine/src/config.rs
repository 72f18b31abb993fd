//! Tunable thresholds of the re-encoding decision engine.
//!
//! None of these numbers is a hard contract: they trade encode frequency
//! against segmentation resolution and are expected to be tuned per model.

use serde::{Deserialize, Serialize};

/// Errors raised by [`EngineConfig::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A parameter is outside its accepted range.
    #[error("{field} = {value} is out of range: {reason}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value, formatted.
        value: String,
        /// Accepted range, in words.
        reason: &'static str,
    },
}

/// Parameters of the region-tracking and re-encoding logic.
///
/// Deserialization fills missing fields from [`Default`], so partial JSON
/// configs are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum side of any encoded region, in pixels. Images smaller than
    /// this are encoded whole.
    pub min_encoded_side: u32,

    /// Minimum margin added around a prompt's bounding box on each side.
    pub encode_margin: u32,

    /// Margin around point prompts as a fraction of the focus rectangle's
    /// side (the larger of this and `encode_margin` is used).
    pub needed_margin_ratio: f64,

    /// Margin added around the focus rectangle when extending the encoded
    /// region to it, as a fraction of its side.
    pub focus_margin_ratio: f64,

    /// Resolution-margin policy: a region covers a rectangle only if
    /// `region side * resolution_margin <= rectangle side` on both axes.
    /// Must lie in `(0, 1]`.
    pub resolution_margin: f64,

    /// A box prompt forces a recrop when `box side * lower_resolution_factor`
    /// is smaller than the encoded side on either axis.
    pub lower_resolution_factor: u32,

    /// Crop side per box side when recropping around a box.
    pub optimal_bbox_ratio: u32,

    /// Boxes whose aspect ratio stays within `1:aspect_band` keep their
    /// proportions when a crop is built around them; flatter boxes get a
    /// crop `aspect_band` times longer than it is wide.
    pub aspect_band: u32,

    /// Largest side encoded by [`Session::initialize`](crate::Session::initialize).
    pub max_initial_side: u32,

    /// Tolerance added per simplification step of the masks the session
    /// produces, in pixels.
    pub simplification_step: f64,
}

impl EngineConfig {
    /// Default for [`min_encoded_side`](Self::min_encoded_side).
    pub const DEFAULT_MIN_ENCODED_SIDE: u32 = 128;
    /// Default for [`encode_margin`](Self::encode_margin).
    pub const DEFAULT_ENCODE_MARGIN: u32 = 64;
    /// [`encode_margin`](Self::encode_margin) of the [`compact`](Self::compact) profile.
    pub const COMPACT_ENCODE_MARGIN: u32 = 20;
    /// Default for [`needed_margin_ratio`](Self::needed_margin_ratio).
    pub const DEFAULT_NEEDED_MARGIN_RATIO: f64 = 0.1;
    /// Default for [`focus_margin_ratio`](Self::focus_margin_ratio).
    pub const DEFAULT_FOCUS_MARGIN_RATIO: f64 = 0.2;
    /// Default for [`resolution_margin`](Self::resolution_margin).
    pub const DEFAULT_RESOLUTION_MARGIN: f64 = 0.7;
    /// Default for [`lower_resolution_factor`](Self::lower_resolution_factor).
    pub const DEFAULT_LOWER_RESOLUTION_FACTOR: u32 = 50;
    /// Default for [`optimal_bbox_ratio`](Self::optimal_bbox_ratio).
    pub const DEFAULT_OPTIMAL_BBOX_RATIO: u32 = 10;
    /// Default for [`aspect_band`](Self::aspect_band).
    pub const DEFAULT_ASPECT_BAND: u32 = 3;
    /// Default for [`max_initial_side`](Self::max_initial_side).
    pub const DEFAULT_MAX_INITIAL_SIDE: u32 = 1024;
    /// Default for [`simplification_step`](Self::simplification_step).
    pub const DEFAULT_SIMPLIFICATION_STEP: f64 = 0.5;

    /// Profile for light models with small input resolution: identical to
    /// the default apart from a tighter minimum margin.
    #[must_use]
    pub fn compact() -> Self {
        Self {
            encode_margin: Self::COMPACT_ENCODE_MARGIN,
            ..Self::default()
        }
    }

    /// Check every parameter's range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn out_of_range(
            field: &'static str,
            value: impl ToString,
            reason: &'static str,
        ) -> ConfigError {
            ConfigError::OutOfRange {
                field,
                value: value.to_string(),
                reason,
            }
        }

        if self.min_encoded_side == 0 {
            return Err(out_of_range("min_encoded_side", 0, "must be at least 1"));
        }
        for (field, value) in [
            ("needed_margin_ratio", self.needed_margin_ratio),
            ("focus_margin_ratio", self.focus_margin_ratio),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(out_of_range(field, value, "must be finite and >= 0"));
            }
        }
        if !(self.resolution_margin > 0.0 && self.resolution_margin <= 1.0) {
            return Err(out_of_range(
                "resolution_margin",
                self.resolution_margin,
                "must lie in (0, 1]",
            ));
        }
        for (field, value) in [
            ("lower_resolution_factor", self.lower_resolution_factor),
            ("optimal_bbox_ratio", self.optimal_bbox_ratio),
            ("aspect_band", self.aspect_band),
        ] {
            if value == 0 {
                return Err(out_of_range(field, value, "must be at least 1"));
            }
        }
        if self.max_initial_side < self.min_encoded_side {
            return Err(out_of_range(
                "max_initial_side",
                self.max_initial_side,
                "must be at least min_encoded_side",
            ));
        }
        if !(self.simplification_step.is_finite() && self.simplification_step > 0.0) {
            return Err(out_of_range(
                "simplification_step",
                self.simplification_step,
                "must be finite and > 0",
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_encoded_side: Self::DEFAULT_MIN_ENCODED_SIDE,
            encode_margin: Self::DEFAULT_ENCODE_MARGIN,
            needed_margin_ratio: Self::DEFAULT_NEEDED_MARGIN_RATIO,
            focus_margin_ratio: Self::DEFAULT_FOCUS_MARGIN_RATIO,
            resolution_margin: Self::DEFAULT_RESOLUTION_MARGIN,
            lower_resolution_factor: Self::DEFAULT_LOWER_RESOLUTION_FACTOR,
            optimal_bbox_ratio: Self::DEFAULT_OPTIMAL_BBOX_RATIO,
            aspect_band: Self::DEFAULT_ASPECT_BAND,
            max_initial_side: Self::DEFAULT_MAX_INITIAL_SIDE,
            simplification_step: Self::DEFAULT_SIMPLIFICATION_STEP,
        }
    }
}
