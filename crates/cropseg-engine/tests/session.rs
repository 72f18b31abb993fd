//! End-to-end session behaviour against a recording engine.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use cropseg_engine::{
    CancelFlag, EngineConfig, EngineError, InferenceEngine, LocalPrompt, MaskPrompt, Pixel,
    PointPrompt, Prompt, Rect, Session, SessionError, ThresholdEngine, ThresholdEngineConfig,
};
use cropseg_geometry::{Point, Polygon};
use image::{GrayImage, Luma, Rgba, RgbaImage};

/// Records every call and answers with canned polygons (crop-local).
#[derive(Debug, Default)]
struct Recorder {
    crops: Vec<(u32, u32)>,
    prompts: Vec<LocalPrompt>,
    reply: Vec<Polygon>,
    fail_encode: Option<EngineError>,
    fail_predict: Option<EngineError>,
}

impl InferenceEngine for Recorder {
    fn encode(&mut self, crop: &RgbaImage) -> Result<(), EngineError> {
        if let Some(err) = self.fail_encode.clone() {
            return Err(err);
        }
        self.crops.push(crop.dimensions());
        Ok(())
    }

    fn predict(
        &mut self,
        prompt: &LocalPrompt,
        _return_all: bool,
    ) -> Result<Vec<Polygon>, EngineError> {
        if let Some(err) = self.fail_predict.clone() {
            return Err(err);
        }
        self.prompts.push(prompt.clone());
        Ok(self.reply.clone())
    }
}

fn session(width: u32, height: u32) -> Session<Recorder> {
    Session::new(
        Recorder::default(),
        RgbaImage::new(width, height),
        EngineConfig::default(),
    )
    .unwrap()
}

fn clicks(positive: &[(i64, i64)]) -> PointPrompt {
    PointPrompt::new(
        positive.iter().map(|&(x, y)| Pixel::new(x, y)).collect(),
        Vec::new(),
    )
}

fn square(x: f64, y: f64, side: f64) -> Polygon {
    Polygon::new(vec![
        Point::new(x, y),
        Point::new(x + side, y),
        Point::new(x + side, y + side),
        Point::new(x, y + side),
    ])
}

// ---------------------------------------------------------------------------
// Box prompts
// ---------------------------------------------------------------------------

#[test]
fn box_scenario_recrops_then_reuses() {
    let mut s = session(1000, 800);

    s.process_box(Rect::new(100, 100, 40, 20), false).unwrap();
    let region = s.current_region().unwrap();
    // Ten times each box side, with both axes treated alike: 400x200,
    // not a portrait crop.
    assert_eq!(region.rect(), Rect::new(0, 10, 400, 200));
    assert_eq!(s.engine().crops, vec![(400, 200)]);
    assert_eq!(
        s.engine().prompts[0],
        LocalPrompt::Box(Rect::new(100, 90, 40, 20))
    );

    // A second box inside the crop at adequate resolution reuses it.
    s.process_box(Rect::new(150, 120, 30, 20), false).unwrap();
    assert_eq!(s.current_region().unwrap(), region);
    assert_eq!(s.engine().crops.len(), 1);
    assert_eq!(
        s.engine().prompts[1],
        LocalPrompt::Box(Rect::new(150, 110, 30, 20))
    );

    let diag = s.diagnostics();
    assert_eq!((diag.encodes, diag.recrops, diag.reuses), (1, 1, 1));
    assert_eq!(diag.predictions, 2);
}

#[test]
fn box_far_away_recrops() {
    let mut s = session(1000, 800);
    s.process_box(Rect::new(100, 100, 40, 20), false).unwrap();
    s.process_box(Rect::new(800, 700, 40, 40), false).unwrap();
    let region = s.current_region().unwrap().rect();
    assert!(region.contains_rect(&Rect::new(800, 700, 40, 40)));
    assert_eq!(s.engine().crops.len(), 2);
}

#[test]
fn box_is_clipped_to_image() {
    let mut s = session(1000, 800);
    s.process_box(Rect::new(980, 780, 40, 40), false).unwrap();
    let region = s.current_region().unwrap();
    let LocalPrompt::Box(local) = s.engine().prompts[0] else {
        panic!("expected a box prompt");
    };
    assert_eq!(local.width, 20);
    assert_eq!(local.height, 20);
    assert_eq!(local.x + region.x(), 980);
}

#[test]
fn box_outside_image_is_out_of_bounds() {
    let mut s = session(1000, 800);
    let err = s.process_box(Rect::new(2000, 0, 10, 10), false).unwrap_err();
    assert!(matches!(err, SessionError::OutOfBounds(_)));
    let err = s.process_box(Rect::new(10, 10, 0, 10), false).unwrap_err();
    assert!(matches!(err, SessionError::InvalidPrompt(_)));
    assert!(s.engine().crops.is_empty());
}

#[test]
fn boxes_and_viewports_at_the_i64_limits_are_out_of_bounds() {
    let mut s = session(1000, 800);
    let far = [
        Rect::new(i64::MAX - 5, 0, 10, 10),
        Rect::new(0, i64::MAX, i64::MAX, 1),
        Rect::new(i64::MIN, i64::MIN, 10, 10),
    ];
    for rect in far {
        let err = s.process_box(rect, false).unwrap_err();
        assert!(matches!(err, SessionError::OutOfBounds(_)), "{rect:?}");
        let err = s.focus(rect).unwrap_err();
        assert!(matches!(err, SessionError::OutOfBounds(_)), "{rect:?}");
    }
    assert!(s.engine().crops.is_empty());

    // A box running off to the i64 limit clips to the full image.
    s.process_box(Rect::from_corners(-10, -10, i64::MAX, i64::MAX), false)
        .unwrap();
    assert_eq!(s.current_region().unwrap().rect(), Rect::new(0, 0, 1000, 800));
}

// ---------------------------------------------------------------------------
// Point prompts
// ---------------------------------------------------------------------------

#[test]
fn polygons_are_translated_back_exactly_once() {
    let mut s = session(1000, 800);
    s.engine_mut().reply = vec![square(1.0, 2.0, 10.0)];

    let polygons = s.process_points(&clicks(&[(600, 500)]), None, false).unwrap();
    let region = s.current_region().unwrap();
    assert_eq!(region.rect(), Rect::new(536, 436, 129, 129));

    // The click reached the engine in crop coordinates...
    assert_eq!(
        s.engine().prompts[0],
        LocalPrompt::Points {
            positive: vec![Pixel::new(64, 64)],
            negative: Vec::new(),
        }
    );
    // ...and the polygon came back shifted by the crop origin, once.
    assert_eq!(polygons, vec![square(537.0, 438.0, 10.0)]);
}

#[test]
fn focus_extends_then_reuses() {
    let mut s = session(1000, 800);
    let focus = Some(Rect::new(100, 100, 500, 400));

    s.process_points(&clicks(&[(300, 300)]), focus, false).unwrap();
    assert_eq!(
        s.current_region().unwrap().rect(),
        Rect::new(0, 20, 700, 560)
    );
    assert_eq!(s.diagnostics().extends, 1);

    // Extending again would encode the same rectangle.
    s.process_points(&clicks(&[(310, 310)]), focus, false).unwrap();
    assert_eq!(s.engine().crops, vec![(700, 560)]);
    assert_eq!(s.diagnostics().reuses, 1);
}

#[test]
fn covered_click_reuses() {
    let mut s = session(1000, 800);
    s.process_points(&clicks(&[(600, 500)]), None, false).unwrap();
    s.process_points(&clicks(&[(600, 500)]), None, false).unwrap();
    assert_eq!(s.engine().crops.len(), 1);
    assert_eq!(s.diagnostics().reuses, 1);
}

#[test]
fn distant_click_recrops() {
    let mut s = session(1000, 800);
    s.process_points(&clicks(&[(600, 500)]), None, false).unwrap();
    s.process_points(&clicks(&[(50, 50)]), None, false).unwrap();
    assert_eq!(
        s.current_region().unwrap().rect(),
        Rect::new(0, 0, 128, 128)
    );
    assert_eq!(s.diagnostics().recrops, 2);
}

#[test]
fn return_all_false_keeps_largest() {
    let mut s = session(1000, 800);
    s.engine_mut().reply = vec![square(0.0, 0.0, 2.0), square(5.0, 5.0, 20.0), square(1.0, 1.0, 3.0)];

    let best = s.process_points(&clicks(&[(600, 500)]), None, false).unwrap();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].area(), 400.0);

    let all = s.process_points(&clicks(&[(600, 500)]), None, true).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn invalid_points_do_not_mutate() {
    let mut s = session(1000, 800);
    s.process_box(Rect::new(100, 100, 40, 20), false).unwrap();
    let before = s.current_region().unwrap();
    let calls = (s.engine().crops.len(), s.engine().prompts.len());

    let no_positive = PointPrompt::new(Vec::new(), vec![Pixel::new(5, 5)]);
    let outside_image = clicks(&[(1000, 10)]);
    let outside_focus = clicks(&[(900, 700)]);
    let focus = Some(Rect::new(0, 0, 200, 200));

    for (prompt, focus) in [
        (&no_positive, None),
        (&outside_image, None),
        (&outside_focus, focus),
    ] {
        let err = s.process_points(prompt, focus, false).unwrap_err();
        assert!(matches!(err, SessionError::InvalidPrompt(_)), "{err}");
    }
    let err = s
        .process_points(&clicks(&[(5, 5)]), Some(Rect::new(-50, -50, 10, 10)), false)
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidPrompt(_)));

    assert_eq!(s.current_region().unwrap(), before);
    assert_eq!((s.engine().crops.len(), s.engine().prompts.len()), calls);
    assert_eq!(s.diagnostics().failures, 0);
}

// ---------------------------------------------------------------------------
// Collaborator failures
// ---------------------------------------------------------------------------

#[test]
fn failed_first_encode_leaves_nothing_encoded() {
    let mut s = session(1000, 800);
    s.engine_mut().fail_encode = Some(EngineError::Transport("connection reset".into()));

    let err = s.process_box(Rect::new(100, 100, 40, 20), false).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Collaborator(EngineError::Transport(_))
    ));
    assert!(matches!(s.current_region(), Err(SessionError::NotEncoded)));
    assert!(s.engine().prompts.is_empty());
    assert_eq!(s.diagnostics().failures, 1);
    assert_eq!(s.diagnostics().encodes, 0);
}

#[test]
fn failed_recrop_keeps_last_good_region() {
    let mut s = session(1000, 800);
    s.process_box(Rect::new(100, 100, 40, 20), false).unwrap();
    let good = s.current_region().unwrap();

    s.engine_mut().fail_encode = Some(EngineError::Computation("out of memory".into()));
    let err = s.process_box(Rect::new(800, 700, 40, 40), false).unwrap_err();
    assert!(matches!(err, SessionError::Collaborator(_)));
    assert_eq!(s.current_region().unwrap(), good);

    // Not retried automatically: the next call encodes afresh.
    s.engine_mut().fail_encode = None;
    s.process_box(Rect::new(800, 700, 40, 40), false).unwrap();
    assert_ne!(s.current_region().unwrap(), good);
    assert_eq!(s.engine().crops.len(), 2);
}

#[test]
fn failed_predict_keeps_encoding() {
    let mut s = session(1000, 800);
    s.engine_mut().fail_predict = Some(EngineError::Computation("nan".into()));
    let err = s.process_box(Rect::new(100, 100, 40, 20), false).unwrap_err();
    assert!(matches!(err, SessionError::Collaborator(_)));
    // The encode itself succeeded.
    assert_eq!(s.current_region().unwrap().rect(), Rect::new(0, 10, 400, 200));
    assert_eq!(s.diagnostics().predictions, 0);
    assert_eq!(s.diagnostics().failures, 1);
}

#[test]
fn cancellation_is_terminal_for_the_call() {
    let image = RgbaImage::from_fn(300, 200, |x, y| {
        if (100..140).contains(&x) && (50..90).contains(&y) {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    });
    let engine = ThresholdEngine::new(ThresholdEngineConfig::default());
    let cancel: CancelFlag = engine.cancel_flag();
    let mut s = Session::new(engine, image, EngineConfig::default()).unwrap();

    cancel.cancel();
    let err = s.process_points(&clicks(&[(120, 70)]), None, false).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Collaborator(EngineError::Cancelled)
    ));
    assert!(matches!(s.current_region(), Err(SessionError::NotEncoded)));

    cancel.reset();
    let polygons = s.process_points(&clicks(&[(120, 70)]), None, false).unwrap();
    assert_eq!(polygons.len(), 1);
    let (lo, hi) = polygons[0].bounds().unwrap();
    assert_eq!((lo.x, lo.y, hi.x, hi.y), (100.0, 50.0, 139.0, 89.0));
}

#[test]
fn cancelled_recrop_keeps_serving_the_last_region() {
    let image = RgbaImage::from_fn(1000, 800, |x, y| {
        if (100..140).contains(&x) && (100..120).contains(&y) {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    });
    let engine = ThresholdEngine::new(ThresholdEngineConfig::default());
    let cancel = engine.cancel_flag();
    let mut s = Session::new(engine, image, EngineConfig::default()).unwrap();

    let near = Rect::new(100, 100, 40, 20);
    s.process_box(near, false).unwrap();
    let region = s.current_region().unwrap();
    assert_eq!(region.rect(), Rect::new(0, 10, 400, 200));

    cancel.cancel();
    let err = s.process_box(Rect::new(800, 700, 40, 40), false).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Collaborator(EngineError::Cancelled)
    ));
    assert_eq!(s.current_region().unwrap(), region);

    // The tracker still reports the first crop, and the engine still
    // holds its encoding, so the same box reuses it.
    cancel.reset();
    let polygons = s.process_box(near, false).unwrap();
    assert_eq!(polygons.len(), 1);
    let (lo, hi) = polygons[0].bounds().unwrap();
    assert_eq!((lo.x, lo.y, hi.x, hi.y), (100.0, 100.0, 139.0, 119.0));
    let diag = s.diagnostics();
    assert_eq!((diag.encodes, diag.reuses, diag.failures), (1, 1, 1));
}

// ---------------------------------------------------------------------------
// Mask prompts, viewport, initialization
// ---------------------------------------------------------------------------

#[test]
fn mask_prompt_is_cropped_to_region() {
    let mut s = session(1000, 800);
    let raster = GrayImage::from_fn(1000, 800, |x, y| {
        Luma([if (100..140).contains(&x) && (100..120).contains(&y) { 255 } else { 0 }])
    });
    s.process_mask(&MaskPrompt::new(raster), false).unwrap();

    let region = s.current_region().unwrap();
    assert_eq!(region.rect(), Rect::new(0, 10, 400, 200));
    let LocalPrompt::Mask(local) = &s.engine().prompts[0] else {
        panic!("expected a mask prompt");
    };
    assert_eq!(local.dimensions(), (400, 200));
    assert_eq!(local.get_pixel(100, 90).0[0], 255);
    assert_eq!(local.get_pixel(100, 89).0[0], 0);
}

#[test]
fn bad_masks_are_rejected() {
    let mut s = session(1000, 800);
    let wrong_size = MaskPrompt::new(GrayImage::from_pixel(10, 10, Luma([255])));
    assert!(matches!(
        s.process_mask(&wrong_size, false),
        Err(SessionError::InvalidPrompt(_))
    ));
    let empty = MaskPrompt::new(GrayImage::new(1000, 800));
    assert!(matches!(
        s.process_mask(&empty, false),
        Err(SessionError::InvalidPrompt(_))
    ));
    assert!(s.engine().crops.is_empty());
}

#[test]
fn initialize_encodes_whole_small_image_once() {
    let mut s = session(1000, 800);
    let region = s.initialize().unwrap();
    assert_eq!(region.rect(), Rect::new(0, 0, 1000, 800));
    s.initialize().unwrap();
    assert_eq!(s.engine().crops, vec![(1000, 800)]);
}

#[test]
fn initialize_centres_large_images() {
    let mut s = session(3000, 500);
    let region = s.initialize().unwrap();
    assert_eq!(region.rect(), Rect::new(988, 0, 1024, 500));
}

#[test]
fn focus_encodes_viewport_once() {
    let mut s = session(1000, 800);
    let region = s.focus(Rect::new(950, -50, 100, 100)).unwrap();
    assert_eq!(region.rect(), Rect::new(872, 0, 128, 128));
    s.focus(Rect::new(950, -50, 100, 100)).unwrap();
    assert_eq!(s.engine().crops.len(), 1);

    let err = s.focus(Rect::new(1200, 0, 50, 50)).unwrap_err();
    assert!(matches!(err, SessionError::OutOfBounds(_)));
}

#[test]
fn process_dispatches_by_prompt_kind() {
    let mut s = session(1000, 800);
    s.process(&Prompt::Box(Rect::new(100, 100, 40, 20)), None, false)
        .unwrap();
    s.process(&Prompt::Points(clicks(&[(120, 105)])), None, false)
        .unwrap();
    assert!(matches!(s.engine().prompts[0], LocalPrompt::Box(_)));
    assert!(matches!(s.engine().prompts[1], LocalPrompt::Points { .. }));
}

#[test]
fn masks_use_configured_step() {
    let config = EngineConfig {
        simplification_step: 2.0,
        ..EngineConfig::default()
    };
    let s = Session::new(Recorder::default(), RgbaImage::new(50, 50), config).unwrap();
    let mut masks = s.masks_from(vec![square(10.0, 10.0, 20.0)]);
    assert_eq!(masks.len(), 1);
    masks[0].simplify();
    assert_eq!(masks[0].simplification_level(), 2.0);
    assert_eq!(masks[0].dimensions().width, 50);
}

#[test]
fn invalid_config_is_rejected() {
    let config = EngineConfig {
        resolution_margin: 0.0,
        ..EngineConfig::default()
    };
    assert!(Session::new(Recorder::default(), RgbaImage::new(10, 10), config).is_err());
}
