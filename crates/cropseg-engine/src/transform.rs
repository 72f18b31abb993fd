//! Conversions between image coordinates and the coordinates of the
//! encoded crop.
//!
//! Prompts are translated into the crop once on the way to the inference
//! collaborator and its polygons are translated back once on the way out.

use cropseg_geometry::Polygon;

use crate::grid::{Pixel, Rect};
use crate::region::EncodedRegion;

/// Image pixel to crop-local pixel.
#[must_use]
pub const fn to_local(p: Pixel, region: &EncodedRegion) -> Pixel {
    Pixel::new(p.x - region.x(), p.y - region.y())
}

/// Crop-local pixel to image pixel.
#[must_use]
pub const fn to_global(p: Pixel, region: &EncodedRegion) -> Pixel {
    Pixel::new(p.x + region.x(), p.y + region.y())
}

/// Image rectangle to crop-local rectangle.
#[must_use]
pub const fn rect_to_local(rect: Rect, region: &EncodedRegion) -> Rect {
    Rect::new(
        rect.x - region.x(),
        rect.y - region.y(),
        rect.width,
        rect.height,
    )
}

/// Crop-local polygon to image coordinates.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn polygon_to_global(polygon: &Polygon, region: &EncodedRegion) -> Polygon {
    polygon.translated(region.x() as f64, region.y() as f64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cropseg_geometry::{Dimensions, Point};

    use super::*;

    fn region() -> EncodedRegion {
        EncodedRegion::new(Rect::new(300, 200, 400, 300), Dimensions::new(1000, 800), 128)
            .unwrap()
    }

    #[test]
    fn pixel_round_trip() {
        let p = Pixel::new(420, 260);
        let local = to_local(p, &region());
        assert_eq!(local, Pixel::new(120, 60));
        assert_eq!(to_global(local, &region()), p);
    }

    #[test]
    fn rect_keeps_size() {
        assert_eq!(
            rect_to_local(Rect::new(310, 250, 40, 20), &region()),
            Rect::new(10, 50, 40, 20)
        );
    }

    #[test]
    fn polygon_is_shifted_by_origin() {
        let local = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(10.5, 4.0)]);
        let global = polygon_to_global(&local, &region());
        assert_eq!(
            global.points(),
            &[Point::new(300.0, 200.0), Point::new(310.5, 204.0)]
        );
    }
}
