//! Even-odd point-in-polygon tests over band rings.
//!
//! ## Boundary convention
//!
//! An edge `(a, b)` counts as crossed when `(a.y > p.y) != (b.y > p.y)` and
//! `p.x` lies strictly left of the edge at height `p.y`. Each edge therefore
//! owns its lower endpoint but not its upper one, and an edge passing exactly
//! through the point is not counted, leaving the edges to its right to decide.
//!
//! For an axis-aligned rectangle this puts the minimum-x and minimum-y sides
//! inside and the maximum-x and maximum-y sides outside; of the four corners
//! only `(min_x, min_y)` is inside. Adjacent rectangles sharing a side thus
//! never both claim a point on it.

use geo::{Coord, LineString, Point};

use crate::models::types::BandPolygon;

/// True when the point lies inside any ring of the polygon
pub fn contains(point: Point, polygon: &BandPolygon) -> bool {
    polygon.rings().iter().any(|ring| ring_contains(point, ring))
}

/// Even-odd ray cast toward +x over one ring.
///
/// The ring may be closed (first vertex repeated at the end) or open; the
/// closing edge is implied either way. Rings with fewer than three vertices
/// contain nothing.
pub fn ring_contains(point: Point, ring: &LineString<f64>) -> bool {
    let coords = &ring.0;
    if coords.len() < 3 {
        return false;
    }

    let p = point.0;
    let mut inside = false;
    let mut previous = coords[coords.len() - 1];
    for &current in coords {
        if crosses(p, previous, current) {
            inside = !inside;
        }
        previous = current;
    }
    inside
}

fn crosses(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> bool {
    if (a.y > p.y) == (b.y > p.y) {
        return false;
    }
    // a.y != b.y here, so the division is safe
    let x_at_p = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
    p.x < x_at_p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::{BandPolygon, BoundingBox};
    use geo::coord;

    fn ring(points: &[(f64, f64)]) -> LineString<f64> {
        LineString::new(points.iter().map(|&(x, y)| coord! { x: x, y: y }).collect())
    }

    fn unit_square() -> LineString<f64> {
        ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)])
    }

    fn polygon(rings: Vec<LineString<f64>>) -> BandPolygon {
        BandPolygon::new(rings).unwrap()
    }

    #[test]
    fn test_interior_and_exterior() {
        let square = unit_square();
        assert!(ring_contains(Point::new(0.5, 0.5), &square));
        assert!(ring_contains(Point::new(0.001, 0.999), &square));
        assert!(!ring_contains(Point::new(1.5, 0.5), &square));
        assert!(!ring_contains(Point::new(-0.5, 0.5), &square));
        assert!(!ring_contains(Point::new(0.5, 2.0), &square));
    }

    #[test]
    fn test_open_ring_matches_closed_ring() {
        let open = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        for p in [(0.5, 0.5), (0.0, 0.5), (1.0, 0.5), (2.0, 2.0)] {
            let point = Point::new(p.0, p.1);
            assert_eq!(ring_contains(point, &open), ring_contains(point, &unit_square()));
        }
    }

    #[test]
    fn test_boundary_sides() {
        let square = unit_square();
        // minimum sides are inside
        assert!(ring_contains(Point::new(0.0, 0.5), &square));
        assert!(ring_contains(Point::new(0.5, 0.0), &square));
        // maximum sides are outside
        assert!(!ring_contains(Point::new(1.0, 0.5), &square));
        assert!(!ring_contains(Point::new(0.5, 1.0), &square));
    }

    #[test]
    fn test_boundary_corners() {
        let square = unit_square();
        assert!(ring_contains(Point::new(0.0, 0.0), &square));
        assert!(!ring_contains(Point::new(1.0, 0.0), &square));
        assert!(!ring_contains(Point::new(1.0, 1.0), &square));
        assert!(!ring_contains(Point::new(0.0, 1.0), &square));
    }

    #[test]
    fn test_shared_edge_claimed_once() {
        let left = unit_square();
        let right = ring(&[(1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        let on_edge = Point::new(1.0, 0.5);

        assert!(!ring_contains(on_edge, &left));
        assert!(ring_contains(on_edge, &right));
    }

    #[test]
    fn test_winding_direction_is_irrelevant() {
        let clockwise = ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]);
        assert!(ring_contains(Point::new(0.5, 0.5), &clockwise));
        assert!(ring_contains(Point::new(0.0, 0.5), &clockwise));
        assert!(!ring_contains(Point::new(1.0, 0.5), &clockwise));
    }

    #[test]
    fn test_concave_ring() {
        // U shape opening upward
        let u = ring(&[
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 3.0),
            (2.0, 3.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 3.0),
            (0.0, 3.0),
        ]);
        assert!(ring_contains(Point::new(0.5, 2.0), &u));
        assert!(ring_contains(Point::new(2.5, 2.0), &u));
        assert!(ring_contains(Point::new(1.5, 0.5), &u));
        assert!(!ring_contains(Point::new(1.5, 2.0), &u)); // in the notch
    }

    #[test]
    fn test_ray_through_vertex() {
        // diamond: the ray from the center passes exactly through the right vertex
        let diamond = ring(&[(0.0, -1.0), (1.0, 0.0), (0.0, 1.0), (-1.0, 0.0)]);
        assert!(ring_contains(Point::new(0.0, 0.0), &diamond));
        assert!(!ring_contains(Point::new(-2.0, 0.0), &diamond));
        assert!(!ring_contains(Point::new(2.0, 0.0), &diamond));
    }

    #[test]
    fn test_degenerate_rings() {
        assert!(!ring_contains(Point::new(0.0, 0.0), &ring(&[])));
        assert!(!ring_contains(Point::new(0.0, 0.0), &ring(&[(0.0, 0.0)])));
        assert!(!ring_contains(Point::new(0.5, 0.0), &ring(&[(0.0, 0.0), (1.0, 0.0)])));
    }

    #[test]
    fn test_any_ring_matches() {
        let far = ring(&[(10.0, 10.0), (11.0, 10.0), (11.0, 11.0), (10.0, 11.0)]);
        let band = polygon(vec![far.clone(), unit_square()]);

        assert!(contains(Point::new(0.5, 0.5), &band));
        assert!(contains(Point::new(10.5, 10.5), &band));
        assert!(!contains(Point::new(5.0, 5.0), &band));
        assert!(!contains(Point::new(0.5, 0.5), &polygon(vec![far])));
    }

    #[test]
    fn test_outside_bounding_box_is_never_contained() {
        let band = polygon(vec![
            ring(&[(-2.0, -1.0), (3.0, -2.0), (4.0, 2.0), (0.0, 4.0), (-3.0, 1.0)]),
        ]);
        let bbox = BoundingBox::from_rings(band.rings()).unwrap();

        for x in -10..=10 {
            for y in -10..=10 {
                let point = Point::new(x as f64 * 0.6, y as f64 * 0.6);
                if !bbox.contains(point) {
                    assert!(!contains(point, &band), "{point:?} is outside the bbox");
                }
            }
        }
    }
}
