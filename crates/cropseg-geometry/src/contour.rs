//! Contour tracing: extract object outlines from a binary raster.
//!
//! Used to turn a predicted (or thresholded) mask raster into the polygon
//! form the rest of the crate works with.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour};

use crate::types::{Point, Polygon};

/// Trace the outer borders of every foreground component.
///
/// Input: a binary raster (non-zero = foreground). Hole borders are
/// dropped, and so are outlines with fewer than 3 vertices (isolated
/// pixels and one-pixel-wide lines), which enclose no area.
#[must_use = "returns the traced outlines"]
pub fn trace_outlines(binary: &GrayImage) -> Vec<Polygon> {
    let contours: Vec<Contour<u32>> = imageproc::contours::find_contours(binary);

    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 3)
        .map(|c| {
            let points = c
                .points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            Polygon::new(points)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if (x0..=x1).contains(&x) && (y0..=y1).contains(&y) {
                image::Luma([255])
            } else {
                image::Luma([0])
            }
        })
    }

    #[test]
    fn empty_image_produces_no_outlines() {
        assert!(trace_outlines(&GrayImage::new(10, 10)).is_empty());
    }

    #[test]
    fn single_pixel_is_filtered_out() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(5, 5, image::Luma([255]));
        assert!(trace_outlines(&img).is_empty());
    }

    #[test]
    fn rectangle_produces_one_outline_on_its_border() {
        let img = filled(20, 20, 5, 6, 14, 12);
        let outlines = trace_outlines(&img);
        assert_eq!(outlines.len(), 1);
        for p in outlines[0].points() {
            assert!((5.0..=14.0).contains(&p.x), "x out of range: {}", p.x);
            assert!((6.0..=12.0).contains(&p.y), "y out of range: {}", p.y);
        }
    }

    #[test]
    fn ring_keeps_only_the_outer_border() {
        let mut img = filled(20, 20, 2, 2, 17, 17);
        for y in 7..=12 {
            for x in 7..=12 {
                img.put_pixel(x, y, image::Luma([0]));
            }
        }
        assert_eq!(trace_outlines(&img).len(), 1);
    }

    #[test]
    fn separate_blobs_give_separate_outlines() {
        let mut img = filled(30, 10, 1, 1, 6, 6);
        for y in 2..=7 {
            for x in 20..=26 {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }
        assert_eq!(trace_outlines(&img).len(), 2);
    }
}
