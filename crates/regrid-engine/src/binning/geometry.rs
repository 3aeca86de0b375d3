//! Planar quadrilateral geometry for footprint binning.
//!
//! Footprint corners arrive labelled SW/SE/NW/NE, but after projection
//! (especially near the poles or the antimeridian) the labels no longer
//! describe a consistent winding. [`Quad::from_corners`] reorders them
//! counter-clockwise and rejects shapes that are not usable quadrilaterals.

use crate::error::{RegridError, Result};

/// Planar point (x, y).
pub type Point = (f64, f64);

/// Relative area below which a quadrilateral is considered degenerate.
const DEGENERATE_AREA_RATIO: f64 = 1e-12;

/// Axis-aligned rectangle used as a clip window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn area(&self) -> f64 {
        (self.max_x - self.min_x) * (self.max_y - self.min_y)
    }
}

/// Edge of the clipping rectangle
#[derive(Debug, Clone, Copy)]
enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top];

    fn is_inside(&self, p: Point, rect: &Rect) -> bool {
        match self {
            Edge::Left => p.0 >= rect.min_x,
            Edge::Right => p.0 <= rect.max_x,
            Edge::Bottom => p.1 >= rect.min_y,
            Edge::Top => p.1 <= rect.max_y,
        }
    }

    fn intersect(&self, p: Point, q: Point, rect: &Rect) -> Point {
        let dx = q.0 - p.0;
        let dy = q.1 - p.1;

        match self {
            Edge::Left => (rect.min_x, p.1 + (rect.min_x - p.0) / dx * dy),
            Edge::Right => (rect.max_x, p.1 + (rect.max_x - p.0) / dx * dy),
            Edge::Bottom => (p.0 + (rect.min_y - p.1) / dy * dx, rect.min_y),
            Edge::Top => (p.0 + (rect.max_y - p.1) / dy * dx, rect.max_y),
        }
    }
}

/// Clip a polygon against one edge (Sutherland-Hodgman step)
fn clip_polygon_edge(vertices: &[Point], edge: Edge, rect: &Rect) -> Vec<Point> {
    let mut output = Vec::with_capacity(vertices.len() + 2);
    let n = vertices.len();

    for i in 0..n {
        let current = vertices[i];
        let next = vertices[(i + 1) % n];

        match (edge.is_inside(current, rect), edge.is_inside(next, rect)) {
            (true, true) => output.push(next),
            (true, false) => output.push(edge.intersect(current, next, rect)),
            (false, true) => {
                output.push(edge.intersect(current, next, rect));
                output.push(next);
            }
            (false, false) => {}
        }
    }

    output
}

/// Signed shoelace area (positive for counter-clockwise winding).
fn signed_area(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    let mut twice = 0.0;
    for i in 0..n {
        let (x0, y0) = vertices[i];
        let (x1, y1) = vertices[(i + 1) % n];
        twice += x0 * y1 - x1 * y0;
    }
    0.5 * twice
}

/// Orientation of the triangle (a, b, c): > 0 counter-clockwise.
fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Whether segments ab and cd cross at an interior point.
fn segments_cross(a: Point, b: Point, c: Point, d: Point) -> bool {
    let d1 = orient(c, d, a);
    let d2 = orient(c, d, b);
    let d3 = orient(a, b, c);
    let d4 = orient(a, b, d);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// A simple quadrilateral with counter-clockwise vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    vertices: [Point; 4],
    area: f64,
}

impl Quad {
    /// Reorder four projected corners into counter-clockwise winding and
    /// validate the result.
    ///
    /// Fails with [`RegridError::InvalidGeometry`] when a corner is not
    /// finite, the reordered quad self-intersects or its area is zero.
    pub fn from_corners(corners: [Point; 4]) -> Result<Self> {
        if corners.iter().any(|p| !p.0.is_finite() || !p.1.is_finite()) {
            return Err(RegridError::InvalidGeometry(
                "corner projected to a non-finite coordinate".to_string(),
            ));
        }

        let cx = corners.iter().map(|p| p.0).sum::<f64>() * 0.25;
        let cy = corners.iter().map(|p| p.1).sum::<f64>() * 0.25;

        let mut vertices = corners;
        vertices.sort_by(|a, b| {
            let angle_a = (a.1 - cy).atan2(a.0 - cx);
            let angle_b = (b.1 - cy).atan2(b.0 - cx);
            angle_a.total_cmp(&angle_b)
        });

        let [a, b, c, d] = vertices;
        if segments_cross(a, b, c, d) || segments_cross(b, c, d, a) {
            return Err(RegridError::InvalidGeometry(
                "corners form a self-intersecting quadrilateral".to_string(),
            ));
        }

        let area = signed_area(&vertices);
        let (min_x, min_y, max_x, max_y) = bounds(&vertices);
        let diagonal_sq = (max_x - min_x).powi(2) + (max_y - min_y).powi(2);
        if !(area > DEGENERATE_AREA_RATIO * diagonal_sq) {
            return Err(RegridError::InvalidGeometry(format!(
                "quadrilateral area {} is degenerate",
                area
            )));
        }

        Ok(Self { vertices, area })
    }

    pub fn vertices(&self) -> &[Point; 4] {
        &self.vertices
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    /// Bounding box (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        bounds(&self.vertices)
    }

    /// Area centroid.
    pub fn centroid(&self) -> Point {
        let n = self.vertices.len();
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let (x0, y0) = self.vertices[i];
            let (x1, y1) = self.vertices[(i + 1) % n];
            let cross = x0 * y1 - x1 * y0;
            cx += (x0 + x1) * cross;
            cy += (y0 + y1) * cross;
        }
        let scale = 1.0 / (6.0 * self.area);
        (cx * scale, cy * scale)
    }

    /// Ray casting point-in-polygon test.
    pub fn contains(&self, point: Point) -> bool {
        let (x, y) = point;
        let mut inside = false;
        let n = self.vertices.len();
        let mut j = n - 1;

        for i in 0..n {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];

            let intersect = ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi);

            if intersect {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Area of the part of this quad inside `rect`.
    pub fn clipped_area(&self, rect: &Rect) -> f64 {
        let mut polygon: Vec<Point> = self.vertices.to_vec();
        for edge in Edge::ALL {
            polygon = clip_polygon_edge(&polygon, edge, rect);
            if polygon.len() < 3 {
                return 0.0;
            }
        }
        signed_area(&polygon).abs()
    }
}

fn bounds(points: &[Point]) -> (f64, f64, f64, f64) {
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;

    for &(x, y) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    (min_x, min_y, max_x, max_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_coords_approx_eq};

    fn unit_square_corners() -> [Point; 4] {
        // SW, SE, NW, NE
        [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
    }

    #[test]
    fn test_reorders_labelled_corners_counter_clockwise() {
        let quad = Quad::from_corners(unit_square_corners()).unwrap();
        assert_approx_eq!(quad.area(), 1.0, 1e-12);
        let v = quad.vertices();
        // SW, SE, NW, NE as stored would be a bow-tie; reordering fixes it
        assert!(signed_area(v) > 0.0);
        assert_coords_approx_eq!(quad.centroid(), (0.5, 0.5), 1e-12);
    }

    #[test]
    fn test_clockwise_input_is_reordered() {
        let quad = Quad::from_corners([(0.0, 0.0), (0.0, 2.0), (3.0, 2.0), (3.0, 0.0)]).unwrap();
        assert_approx_eq!(quad.area(), 6.0, 1e-12);
    }

    #[test]
    fn test_rotated_quad() {
        // Diamond, as produced by a rotated swath pixel
        let quad = Quad::from_corners([(0.0, -1.0), (1.0, 0.0), (-1.0, 0.0), (0.0, 1.0)]).unwrap();
        assert_approx_eq!(quad.area(), 2.0, 1e-12);
        assert!(quad.contains((0.2, 0.2)));
        assert!(!quad.contains((0.8, 0.8)));
    }

    #[test]
    fn test_degenerate_quads_rejected() {
        // Collinear
        assert!(Quad::from_corners([(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]).is_err());
        // All corners identical
        assert!(Quad::from_corners([(1.0, 1.0); 4]).is_err());
        // Non-finite
        assert!(
            Quad::from_corners([(0.0, 0.0), (f64::NAN, 0.0), (0.0, 1.0), (1.0, 1.0)]).is_err()
        );
        assert!(Quad::from_corners([
            (0.0, 0.0),
            (f64::INFINITY, 0.0),
            (0.0, 1.0),
            (1.0, 1.0)
        ])
        .is_err());
    }

    #[test]
    fn test_concave_quad_accepted() {
        // Dart shape: simple but not convex
        let quad = Quad::from_corners([(0.0, 0.0), (4.0, 0.0), (2.0, 1.0), (2.0, 4.0)]).unwrap();
        assert_approx_eq!(quad.area(), 6.0, 1e-12);
    }

    #[test]
    fn test_contains() {
        let quad = Quad::from_corners(unit_square_corners()).unwrap();
        assert!(quad.contains((0.5, 0.5)));
        assert!(!quad.contains((1.5, 0.5)));
        assert!(!quad.contains((0.5, -0.1)));
    }

    #[test]
    fn test_clipped_area() {
        let quad = Quad::from_corners([(0.0, 0.0), (2.0, 0.0), (0.0, 2.0), (2.0, 2.0)]).unwrap();

        // Fully inside a large rect
        assert_approx_eq!(quad.clipped_area(&Rect::new(-1.0, -1.0, 5.0, 5.0)), 4.0, 1e-12);
        // Quarter overlap
        assert_approx_eq!(quad.clipped_area(&Rect::new(1.0, 1.0, 3.0, 3.0)), 1.0, 1e-12);
        // Half overlap
        assert_approx_eq!(quad.clipped_area(&Rect::new(1.0, -1.0, 3.0, 3.0)), 2.0, 1e-12);
        // Disjoint
        assert_approx_eq!(quad.clipped_area(&Rect::new(3.0, 3.0, 4.0, 4.0)), 0.0, 1e-12);
    }

    #[test]
    fn test_clipped_area_partitions_rotated_quad() {
        let quad = Quad::from_corners([(1.0, 0.0), (2.0, 1.0), (0.0, 1.0), (1.0, 2.0)]).unwrap();
        let cells = [
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(1.0, 0.0, 2.0, 1.0),
            Rect::new(0.0, 1.0, 1.0, 2.0),
            Rect::new(1.0, 1.0, 2.0, 2.0),
        ];
        let total: f64 = cells.iter().map(|c| quad.clipped_area(c)).sum();
        assert_approx_eq!(total, quad.area(), 1e-12);
        for cell in &cells {
            assert_approx_eq!(quad.clipped_area(cell), 0.5, 1e-12);
        }
    }
}
