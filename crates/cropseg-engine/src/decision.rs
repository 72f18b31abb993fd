//! The re-encoding planner.
//!
//! Given the current encoded region and an incoming prompt, decide whether
//! the existing encoding can be reused or which rectangle to encode next.
//! Everything here is pure: the session applies the decision.

use cropseg_geometry::Dimensions;

use crate::config::EngineConfig;
use crate::grid::Rect;
use crate::prompt::PointPrompt;
use crate::region::RegionTracker;

/// What to do with the encoding before predicting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Predict from the current encoding.
    Reuse,
    /// Encode the (larger) viewport-based rectangle.
    Extend(Rect),
    /// Encode a new rectangle fitted to the prompt.
    Recrop(Rect),
}

impl Decision {
    /// The rectangle to encode, if any.
    #[must_use]
    pub const fn target(&self) -> Option<Rect> {
        match self {
            Self::Reuse => None,
            Self::Extend(r) | Self::Recrop(r) => Some(*r),
        }
    }
}

/// `max(ceil(ratio * side), floor)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn margin(side: i64, ratio: f64, floor: u32) -> i64 {
    ((ratio * side as f64).ceil() as i64).max(i64::from(floor))
}

/// Area that must be encoded to serve a point prompt.
///
/// The clicks' bounding box grows on each side by `needed_margin_ratio` of
/// the focus side (or `encode_margin`, whichever is larger), is clipped to
/// the image, and grows again to the minimum encoded side. Returns `None`
/// when the prompt has no clicks inside the image.
#[must_use]
pub fn needed_area(
    prompt: &PointPrompt,
    focus: Option<&Rect>,
    image: Dimensions,
    config: &EngineConfig,
) -> Option<Rect> {
    let bbox = Rect::bounding(prompt.all())?;
    let (mx, my) = focus.map_or_else(
        || {
            let m = i64::from(config.encode_margin);
            (m, m)
        },
        |f| {
            (
                margin(f.width, config.needed_margin_ratio, config.encode_margin),
                margin(f.height, config.needed_margin_ratio, config.encode_margin),
            )
        },
    );
    let clipped = bbox.expand(mx, my).clip_to(image)?;
    Some(clipped.with_min_side(config.min_encoded_side, image))
}

/// The viewport grown by `focus_margin_ratio` of its side (or
/// `encode_margin`, whichever is larger) on each side, clipped to the
/// image.
#[must_use]
pub fn extended_focus(focus: &Rect, image: Dimensions, config: &EngineConfig) -> Option<Rect> {
    let mx = margin(focus.width, config.focus_margin_ratio, config.encode_margin);
    let my = margin(focus.height, config.focus_margin_ratio, config.encode_margin);
    let clipped = focus.expand(mx, my).clip_to(image)?;
    Some(clipped.with_min_side(config.min_encoded_side, image))
}

/// Decide how to serve a point prompt whose needed area is `needed`.
///
/// In order: reuse when the current region covers `needed`; extend to
/// `extended` when it contains `needed`; otherwise recrop to `needed`.
/// Targets equal to the current region become [`Decision::Reuse`].
#[must_use]
pub fn plan_points(tracker: &RegionTracker, needed: Rect, extended: Option<Rect>) -> Decision {
    if tracker.covers(&needed) {
        return Decision::Reuse;
    }
    let current = tracker.current_region().map(|r| r.rect());

    if let Some(ext) = extended.filter(|ext| ext.contains_rect(&needed)) {
        return if current == Some(ext) {
            Decision::Reuse
        } else {
            Decision::Extend(ext)
        };
    }

    let image = tracker.image();
    let target = Rect::new(
        needed.x.min(i64::from(image.width) - needed.width),
        needed.y.min(i64::from(image.height) - needed.height),
        needed.width,
        needed.height,
    );
    if current == Some(target) {
        Decision::Reuse
    } else {
        Decision::Recrop(target)
    }
}

/// Crop fitted around a box prompt.
///
/// The short side is `optimal_bbox_ratio` times the box's short side. The
/// long side keeps the box's proportions when its aspect ratio lies within
/// `1:aspect_band`, and is `aspect_band` times the short side otherwise.
/// Each side also leaves `encode_margin` around the box and reaches the
/// minimum encoded side. The crop is centred on the box and slid inside
/// the image.
#[must_use]
pub fn box_crop(bbox: &Rect, image: Dimensions, config: &EngineConfig) -> Rect {
    let ratio = i64::from(config.optimal_bbox_ratio);
    let band = i64::from(config.aspect_band);
    let short_box = bbox.width.min(bbox.height);
    let long_box = bbox.width.max(bbox.height);

    let short = short_box * ratio;
    let long = if long_box <= band * short_box {
        long_box * ratio
    } else {
        band * short
    };
    let (w, h) = if bbox.width >= bbox.height {
        (long, short)
    } else {
        (short, long)
    };

    let pad = 2 * i64::from(config.encode_margin);
    let min_side = i64::from(config.min_encoded_side);
    let w = w.max(bbox.width + pad).max(min_side);
    let h = h.max(bbox.height + pad).max(min_side);
    bbox.recentered(w, h).shifted_inside(image)
}

/// Decide how to serve a box prompt.
///
/// The current region is kept while it contains the box and is no more
/// than `lower_resolution_factor` times the box on either axis; otherwise
/// the session recrops to [`box_crop`].
#[must_use]
pub fn plan_box(tracker: &RegionTracker, bbox: &Rect, config: &EngineConfig) -> Decision {
    let factor = i64::from(config.lower_resolution_factor);
    let current = tracker.current_region().map(|r| r.rect());
    let keep = current.is_some_and(|r| {
        r.contains_rect(bbox) && bbox.width * factor >= r.width && bbox.height * factor >= r.height
    });
    if keep {
        return Decision::Reuse;
    }
    let crop = box_crop(bbox, tracker.image(), config);
    if current == Some(crop) {
        Decision::Reuse
    } else {
        Decision::Recrop(crop)
    }
}

/// First region to encode: the whole image when both sides fit
/// `max_initial_side`, otherwise a centred crop of at most that size.
#[must_use]
pub fn initial_region(image: Dimensions, config: &EngineConfig) -> Rect {
    let whole = Rect::of_image(image);
    let max = i64::from(config.max_initial_side);
    whole
        .recentered(whole.width.min(max), whole.height.min(max))
        .shifted_inside(image)
}

/// Region for an explicit viewport: the viewport clipped to the image and
/// grown to the minimum encoded side. `None` if it misses the image.
#[must_use]
pub fn viewport_region(viewport: &Rect, image: Dimensions, config: &EngineConfig) -> Option<Rect> {
    let clipped = viewport.clip_to(image)?;
    Some(clipped.with_min_side(config.min_encoded_side, image))
}
