//! In-memory band store and facility directory.
//!
//! Bands are indexed by bounding box in an R-tree; facilities are keyed by
//! station. Both are immutable once built, so a value can be shared across
//! threads and queried without locking.

use std::collections::HashMap;
use std::sync::Arc;

use geo::Point;
use rstar::RTree;

use crate::identifiers::*;
use crate::models::{traits::*, types::*};
use crate::spatial::index::BandNode;

// ============================================================================
// Band Store
// ============================================================================

/// Immutable band catalog with a bounding-box index
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone)]
pub struct StaticBandStore {
    bands: Vec<Arc<DriveTimeBand>>,
    band_tree: RTree<BandNode>,
}

impl StaticBandStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            bands: Vec::new(),
            band_tree: RTree::new(),
        }
    }

    /// Build the catalog and its index. Catalog order is preserved.
    pub fn from_bands(bands: Vec<DriveTimeBand>) -> Self {
        let bands: Vec<Arc<DriveTimeBand>> = bands.into_iter().map(Arc::new).collect();

        let band_tree = RTree::bulk_load(
            bands
                .iter()
                .enumerate()
                .map(|(ordinal, band)| BandNode::new(band.clone(), ordinal))
                .collect(),
        );

        Self { bands, band_tree }
    }

    /// Rebuild bands from persisted rows. Each row is decoded once so that a
    /// corrupt geometry or a bounding box too small for it fails the load.
    pub fn from_records(records: impl IntoIterator<Item = BandRecord>) -> Result<Self> {
        let bands = records
            .into_iter()
            .map(|record| {
                let band = DriveTimeBand::from_record(record)?;
                band.check_bounding_box()?;
                Ok(band)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_bands(bands))
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}

impl Default for StaticBandStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BandStore for StaticBandStore {
    fn find_candidate_bands(&self, point: Point) -> Result<Vec<Arc<DriveTimeBand>>> {
        let mut hits: Vec<&BandNode> = self
            .band_tree
            .locate_all_at_point(&[point.x(), point.y()])
            .collect();
        hits.sort_unstable_by_key(|node| node.ordinal);

        Ok(hits.into_iter().map(|node| node.band.clone()).collect())
    }

    fn find_all(&self) -> Result<Vec<Arc<DriveTimeBand>>> {
        Ok(self.bands.clone())
    }
}

// ============================================================================
// Facility Directory
// ============================================================================

/// Facilities keyed by station
#[derive(Clone, Default)]
pub struct StaticFacilityDirectory {
    by_station: HashMap<StationIdentifier, Vec<Arc<Facility>>>,
}

impl StaticFacilityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_facilities(facilities: Vec<Facility>) -> Self {
        let mut by_station: HashMap<StationIdentifier, Vec<Arc<Facility>>> = HashMap::new();
        for facility in facilities {
            by_station
                .entry(facility.station_id.clone())
                .or_default()
                .push(Arc::new(facility));
        }
        Self { by_station }
    }

    pub fn len(&self) -> usize {
        self.by_station.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_station.is_empty()
    }
}

impl FacilityDirectory for StaticFacilityDirectory {
    fn facilities_by_station(&self, station_ids: &[StationIdentifier]) -> Result<Vec<Arc<Facility>>> {
        let mut seen = std::collections::HashSet::new();
        Ok(station_ids
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| self.by_station.get(id))
            .flatten()
            .cloned()
            .collect())
    }
}
