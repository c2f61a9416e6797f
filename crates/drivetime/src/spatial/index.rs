//! R-tree nodes for band bounding boxes.
//!
//! The tree answers "which bands' rectangles contain this point", the cheap
//! first stage of a nearby query. The exact polygon test happens afterwards in
//! the matcher, so rectangles only ever need to over-approximate.

use std::sync::Arc;

use rstar::{Envelope, PointDistance, RTreeObject, AABB};

use crate::models::types::{BoundingBox, DriveTimeBand};

/// Convert a band bounding box into an `[long, lat]` envelope
pub fn envelope_of(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min_long, bbox.min_lat], [bbox.max_long, bbox.max_lat])
}

#[derive(Clone)]
pub struct BandNode {
    pub band: Arc<DriveTimeBand>,
    /// Position in the catalog, used to return candidates in catalog order
    pub ordinal: usize,
    aabb: AABB<[f64; 2]>,
}

impl BandNode {
    pub fn new(band: Arc<DriveTimeBand>, ordinal: usize) -> Self {
        let aabb = envelope_of(&band.bounding_box);
        Self { band, ordinal, aabb }
    }
}

impl RTreeObject for BandNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

impl PointDistance for BandNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.aabb.distance_2(point)
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.aabb.contains_point(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::BandId;
    use geo::{coord, LineString};
    use rstar::RTree;

    fn node(station: &str, x0: f64, y0: f64, x1: f64, y1: f64, ordinal: usize) -> BandNode {
        let ring = LineString::new(vec![
            coord! { x: x0, y: y0 },
            coord! { x: x1, y: y0 },
            coord! { x: x1, y: y1 },
            coord! { x: x0, y: y1 },
        ]);
        let band = DriveTimeBand::from_rings(BandId::new(station, 0, 10).unwrap(), vec![ring]).unwrap();
        BandNode::new(Arc::new(band), ordinal)
    }

    #[test]
    fn test_envelope_axes() {
        let n = node("666", -77.1, 38.8, -76.9, 39.0, 0);
        assert_eq!(n.envelope().lower(), [-77.1, 38.8]);
        assert_eq!(n.envelope().upper(), [-76.9, 39.0]);
    }

    #[test]
    fn test_point_lookup_is_inclusive() {
        let tree = RTree::bulk_load(vec![
            node("666", 0.0, 0.0, 1.0, 1.0, 0),
            node("777", 2.0, 2.0, 3.0, 3.0, 1),
        ]);

        let hits: Vec<_> = tree.locate_all_at_point(&[1.0, 1.0]).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].band.station_id().as_str(), "666");

        assert_eq!(tree.locate_all_at_point(&[1.5, 1.5]).count(), 0);
    }
}
