//! One interactive segmentation session over one image.
//!
//! The session owns the image, the inference engine and the region
//! tracker. Every prompt goes through the same steps: validate, plan,
//! optionally encode a new crop, translate into the crop, predict,
//! translate back. The tracker only advances after a successful encode.

use image::{GrayImage, RgbaImage, imageops};
use tracing::{debug, info, warn};
use web_time::Instant;

use cropseg_geometry::{Dimensions, Mask, Polygon};

use crate::config::{ConfigError, EngineConfig};
use crate::decision::{self, Decision};
use crate::diagnostics::SessionDiagnostics;
use crate::error::SessionError;
use crate::grid::Rect;
use crate::inference::InferenceEngine;
use crate::prompt::{LocalPrompt, MaskPrompt, PointPrompt, Prompt};
use crate::region::{EncodedRegion, RegionError, RegionTracker};
use crate::transform::{polygon_to_global, rect_to_local, to_local};

/// A segmentation session driving an [`InferenceEngine`] over one image.
#[derive(Debug)]
pub struct Session<E> {
    engine: E,
    image: RgbaImage,
    tracker: RegionTracker,
    config: EngineConfig,
    diagnostics: SessionDiagnostics,
}

impl<E: InferenceEngine> Session<E> {
    /// Start a session. Nothing is encoded until the first prompt (or
    /// [`initialize`](Self::initialize)).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation.
    pub fn new(engine: E, image: RgbaImage, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let dimensions = Dimensions::new(image.width(), image.height());
        Ok(Self {
            engine,
            image,
            tracker: RegionTracker::new(dimensions, config.resolution_margin),
            config,
            diagnostics: SessionDiagnostics::default(),
        })
    }

    /// Size of the session's image.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.tracker.image()
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Counters collected so far.
    #[must_use]
    pub const fn diagnostics(&self) -> &SessionDiagnostics {
        &self.diagnostics
    }

    /// The inference engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// The inference engine, mutably.
    pub const fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Consume the session and hand back the inference engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// The region the engine currently holds an encoding of.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotEncoded`] before the first successful
    /// encode.
    pub fn current_region(&self) -> Result<EncodedRegion, SessionError> {
        self.tracker.current_region().ok_or(SessionError::NotEncoded)
    }

    /// Encode the whole image, or a centred crop of `max_initial_side`
    /// when the image is larger than that.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Collaborator`] if the encode fails.
    pub fn initialize(&mut self) -> Result<EncodedRegion, SessionError> {
        let target = decision::initial_region(self.dimensions(), &self.config);
        match self.tracker.current_region() {
            Some(current) if current.rect() == target => Ok(current),
            _ => self.encode(target),
        }
    }

    /// Encode the viewport the user is looking at.
    ///
    /// The viewport is clipped to the image and grown to the minimum
    /// encoded side. Nothing happens if that is already the encoded region.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::OutOfBounds`] if the viewport misses the
    /// image, or [`SessionError::Collaborator`] if the encode fails.
    pub fn focus(&mut self, viewport: Rect) -> Result<EncodedRegion, SessionError> {
        let image = self.dimensions();
        let target = decision::viewport_region(&viewport, image, &self.config)
            .ok_or_else(|| out_of_bounds(viewport, image))?;
        let plan = match self.tracker.current_region() {
            Some(current) if current.rect() == target => Decision::Reuse,
            _ => Decision::Extend(target),
        };
        debug!(?viewport, ?plan, "focus");
        self.apply(plan)?;
        self.current_region()
    }

    /// Segment from clicks.
    ///
    /// `focus` is the rectangle the user is looking at; when given, every
    /// click must lie inside it and the encoded region may grow to cover
    /// it. Without `return_all` at most one polygon (the largest) comes
    /// back.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidPrompt`] if there is no positive click, a
    ///   click lies outside the image or outside `focus`, or `focus`
    ///   misses the image.
    /// - [`SessionError::Collaborator`] if encode or predict fails.
    pub fn process_points(
        &mut self,
        prompt: &PointPrompt,
        focus: Option<Rect>,
        return_all: bool,
    ) -> Result<Vec<Polygon>, SessionError> {
        let image = self.dimensions();
        let image_rect = Rect::of_image(image);
        if prompt.positive.is_empty() {
            return Err(SessionError::invalid("at least one positive point is required"));
        }
        if let Some(p) = prompt.all().find(|p| !image_rect.contains_pixel(*p)) {
            return Err(SessionError::invalid(format!(
                "point ({}, {}) is outside the {}x{} image",
                p.x, p.y, image.width, image.height
            )));
        }
        let focus = match focus {
            Some(f) => Some(f.clip_to(image).ok_or_else(|| {
                SessionError::invalid(format!("focus {f:?} does not overlap the image"))
            })?),
            None => None,
        };
        if let Some(f) = focus
            && let Some(p) = prompt.all().find(|p| !f.contains_pixel(*p))
        {
            return Err(SessionError::invalid(format!(
                "point ({}, {}) is outside the focus rectangle",
                p.x, p.y
            )));
        }

        let needed = decision::needed_area(prompt, focus.as_ref(), image, &self.config)
            .ok_or_else(|| SessionError::invalid("prompt has no points"))?;
        let extended =
            focus.and_then(|f| decision::extended_focus(&f, image, &self.config));
        let plan = decision::plan_points(&self.tracker, needed, extended);
        debug!(?needed, ?extended, ?plan, "point prompt");
        self.apply(plan)?;

        let region = self.current_region()?;
        let local = LocalPrompt::Points {
            positive: prompt.positive.iter().map(|&p| to_local(p, &region)).collect(),
            negative: prompt.negative.iter().map(|&p| to_local(p, &region)).collect(),
        };
        self.predict(&local, &region, return_all)
    }

    /// Segment from a box.
    ///
    /// The box is clipped to the image first.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidPrompt`] if the box is empty.
    /// - [`SessionError::OutOfBounds`] if it misses the image.
    /// - [`SessionError::Collaborator`] if encode or predict fails.
    pub fn process_box(
        &mut self,
        bbox: Rect,
        return_all: bool,
    ) -> Result<Vec<Polygon>, SessionError> {
        if bbox.is_empty() {
            return Err(SessionError::invalid(format!("box {bbox:?} is empty")));
        }
        let image = self.dimensions();
        let clipped = bbox.clip_to(image).ok_or_else(|| out_of_bounds(bbox, image))?;

        let plan = decision::plan_box(&self.tracker, &clipped, &self.config);
        debug!(bbox = ?clipped, ?plan, "box prompt");
        self.apply(plan)?;

        let region = self.current_region()?;
        let local = LocalPrompt::Box(rect_to_local(clipped, &region));
        self.predict(&local, &region, return_all)
    }

    /// Segment from a mask raster the size of the image.
    ///
    /// The crop is chosen as for a box prompt around the mask's foreground.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidPrompt`] if the raster size differs from
    ///   the image or it has no foreground.
    /// - [`SessionError::Collaborator`] if encode or predict fails.
    pub fn process_mask(
        &mut self,
        prompt: &MaskPrompt,
        return_all: bool,
    ) -> Result<Vec<Polygon>, SessionError> {
        let image = self.dimensions();
        let (w, h) = prompt.raster.dimensions();
        if (w, h) != (image.width, image.height) {
            return Err(SessionError::invalid(format!(
                "mask is {w}x{h} but the image is {}x{}",
                image.width, image.height
            )));
        }
        let bounds = prompt
            .foreground_bounds()
            .ok_or_else(|| SessionError::invalid("mask has no foreground pixels"))?;

        let plan = decision::plan_box(&self.tracker, &bounds, &self.config);
        debug!(?bounds, ?plan, "mask prompt");
        self.apply(plan)?;

        let region = self.current_region()?;
        let (x, y, cw, ch) = region.crop_bounds();
        let local: GrayImage = imageops::crop_imm(&prompt.raster, x, y, cw, ch).to_image();
        self.predict(&LocalPrompt::Mask(local), &region, return_all)
    }

    /// Dispatch any prompt. `focus` applies to point prompts only.
    ///
    /// # Errors
    ///
    /// See [`process_points`](Self::process_points),
    /// [`process_box`](Self::process_box) and
    /// [`process_mask`](Self::process_mask).
    pub fn process(
        &mut self,
        prompt: &Prompt,
        focus: Option<Rect>,
        return_all: bool,
    ) -> Result<Vec<Polygon>, SessionError> {
        match prompt {
            Prompt::Points(points) => self.process_points(points, focus, return_all),
            Prompt::Box(bbox) => self.process_box(*bbox, return_all),
            Prompt::Mask(mask) => self.process_mask(mask, return_all),
        }
    }

    /// Wrap polygons returned by this session as [`Mask`]s on the image
    /// canvas, stepping by the configured simplification step.
    #[must_use]
    pub fn masks_from(&self, polygons: Vec<Polygon>) -> Vec<Mask> {
        let canvas = self.dimensions();
        polygons
            .into_iter()
            .map(|p| Mask::from_contour(p, canvas).with_step(self.config.simplification_step))
            .collect()
    }

    fn apply(&mut self, decision: Decision) -> Result<(), SessionError> {
        match decision {
            Decision::Reuse => self.diagnostics.reuses += 1,
            Decision::Extend(rect) => {
                self.encode(rect)?;
                self.diagnostics.extends += 1;
            }
            Decision::Recrop(rect) => {
                self.encode(rect)?;
                self.diagnostics.recrops += 1;
            }
        }
        Ok(())
    }

    /// Encode `rect` and make it the current region. On failure the
    /// tracker keeps its previous region.
    fn encode(&mut self, rect: Rect) -> Result<EncodedRegion, SessionError> {
        let region = EncodedRegion::new(rect, self.dimensions(), self.config.min_encoded_side)?;
        let (x, y, w, h) = region.crop_bounds();
        let crop = imageops::crop_imm(&self.image, x, y, w, h).to_image();

        let start = Instant::now();
        let result = self.engine.encode(&crop);
        let elapsed = start.elapsed();
        self.diagnostics.encode_time += elapsed;
        drop(crop);

        match result {
            Ok(()) => {
                self.tracker.replace(region);
                self.diagnostics.encodes += 1;
                info!(x, y, width = w, height = h, ?elapsed, "encoded region");
                Ok(region)
            }
            Err(e) => {
                self.diagnostics.failures += 1;
                warn!(error = %e, ?rect, "encode failed");
                Err(e.into())
            }
        }
    }

    fn predict(
        &mut self,
        prompt: &LocalPrompt,
        region: &EncodedRegion,
        return_all: bool,
    ) -> Result<Vec<Polygon>, SessionError> {
        let start = Instant::now();
        let result = self.engine.predict(prompt, return_all);
        self.diagnostics.predict_time += start.elapsed();

        let polygons = match result {
            Ok(polygons) => polygons,
            Err(e) => {
                self.diagnostics.failures += 1;
                warn!(error = %e, "predict failed");
                return Err(e.into());
            }
        };
        self.diagnostics.predictions += 1;
        debug!(count = polygons.len(), "predicted");

        let global = polygons.iter().map(|p| polygon_to_global(p, region));
        if return_all {
            Ok(global.collect())
        } else {
            Ok(global
                .max_by(|a, b| a.area().total_cmp(&b.area()))
                .into_iter()
                .collect())
        }
    }
}

fn out_of_bounds(region: Rect, image: Dimensions) -> SessionError {
    SessionError::OutOfBounds(RegionError::OutOfBounds {
        region,
        width: image.width,
        height: image.height,
    })
}
