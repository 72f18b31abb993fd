//! Scanline polygon fill producing run-length encoded masks.
//!
//! Each pixel row `y` is sampled along the horizontal line `y + 0.5`.
//! Intersections of that line with the polygon's non-horizontal edges are
//! sorted and paired left to right (even-odd rule); each pair `(a, b)`
//! fills the pixels `ceil(a) ..= floor(b)`.
//!
//! Background runs are carried across row boundaries, foreground runs are
//! not: a foreground span always starts a new run, preceded by a
//! background run that may be empty. The runs always sum to
//! `width * height`, whatever the input, so degenerate and
//! self-intersecting polygons still yield a well-formed [`Rle`].

use crate::rle::Rle;
use crate::types::{Dimensions, Point, Polygon};

/// One non-horizontal polygon edge, oriented bottom-up in image rows.
#[derive(Debug, Clone, Copy)]
struct Edge {
    /// Smaller y of the two endpoints.
    y_min: f64,
    /// Larger y of the two endpoints.
    y_max: f64,
    /// x at `y_min`.
    x_at_min: f64,
    /// dx/dy along the edge.
    slope: f64,
}

impl Edge {
    fn new(a: Point, b: Point) -> Option<Self> {
        if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
            return None;
        }
        if a.y == b.y {
            return None;
        }
        let (lo, hi) = if a.y < b.y { (a, b) } else { (b, a) };
        Some(Self {
            y_min: lo.y,
            y_max: hi.y,
            x_at_min: lo.x,
            slope: (hi.x - lo.x) / (hi.y - lo.y),
        })
    }

    /// Half-open activation: a vertex shared by two edges is counted once.
    fn straddles(&self, sample_y: f64) -> bool {
        self.y_min <= sample_y && sample_y < self.y_max
    }

    fn x_at(&self, sample_y: f64) -> f64 {
        (sample_y - self.y_min).mul_add(self.slope, self.x_at_min)
    }
}

/// Build the edge table, sorted by `y_min` so rows can activate edges
/// incrementally.
fn edge_table(points: &[Point]) -> Vec<Edge> {
    let mut edges: Vec<Edge> = points
        .iter()
        .enumerate()
        .filter_map(|(i, &a)| Edge::new(a, points[(i + 1) % points.len()]))
        .collect();
    edges.sort_by(|a, b| a.y_min.total_cmp(&b.y_min));
    edges
}

/// Rasterize a polygon into an RLE mask on a `width x height` canvas.
///
/// Polygons with fewer than 3 vertices, or with no non-horizontal edge,
/// produce an all-background mask.
#[must_use = "returns the encoded mask"]
pub fn contour_to_rle(polygon: &Polygon, width: u32, height: u32) -> Rle {
    let dimensions = Dimensions::new(width, height);
    let points = polygon.points();
    if points.len() < 3 || dimensions.is_empty() {
        return Rle::background(dimensions);
    }

    let edges = edge_table(points);
    if edges.is_empty() {
        return Rle::background(dimensions);
    }

    let mut encoder = RunEncoder::default();
    let mut next_edge = 0;
    let mut active: Vec<Edge> = Vec::new();
    let mut crossings: Vec<f64> = Vec::new();
    let mut spans: Vec<(u32, u32)> = Vec::new();

    for y in 0..height {
        let sample_y = f64::from(y) + 0.5;

        while next_edge < edges.len() && edges[next_edge].y_min <= sample_y {
            active.push(edges[next_edge]);
            next_edge += 1;
        }
        active.retain(|e| sample_y < e.y_max);

        crossings.clear();
        crossings.extend(
            active
                .iter()
                .filter(|e| e.straddles(sample_y))
                .map(|e| e.x_at(sample_y)),
        );
        crossings.sort_by(f64::total_cmp);

        row_spans(&crossings, width, &mut spans);
        encoder.push_row(&spans, width);
    }

    Rle::from_parts(dimensions, encoder.finish())
}

/// Pair sorted crossings into clamped, merged, inclusive pixel spans.
///
/// An unpaired trailing crossing (only possible with malformed input) is
/// ignored.
fn row_spans(crossings: &[f64], width: u32, spans: &mut Vec<(u32, u32)>) {
    spans.clear();
    let max_x = f64::from(width - 1);
    for pair in crossings.chunks_exact(2) {
        let left = pair[0].ceil().max(0.0);
        let right = pair[1].floor().min(max_x);
        if left > right {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (left, right) = (left as u32, right as u32);
        match spans.last_mut() {
            // Overlapping or touching spans from self-intersecting input.
            Some(last) if left <= last.1.saturating_add(1) => last.1 = last.1.max(right),
            _ => spans.push((left, right)),
        }
    }
}

/// Accumulates alternating runs row by row.
#[derive(Debug, Default)]
struct RunEncoder {
    counts: Vec<u64>,
    pending_background: u64,
}

impl RunEncoder {
    fn push_row(&mut self, spans: &[(u32, u32)], width: u32) {
        let mut cursor = 0u32;
        for &(left, right) in spans {
            self.pending_background += u64::from(left - cursor);
            self.counts.push(self.pending_background);
            self.counts.push(u64::from(right - left + 1));
            self.pending_background = 0;
            cursor = right + 1;
        }
        self.pending_background += u64::from(width - cursor);
    }

    fn finish(mut self) -> Vec<u64> {
        self.counts.push(self.pending_background);
        self.counts
    }
}
