//! Collaborator seams consumed by the query engine.
//!
//! Implementations can be in-memory, database-backed, or remote.

use std::sync::Arc;

use geo::Point;

use crate::identifiers::StationIdentifier;
use crate::models::types::{DriveTimeBand, Facility, Result};

/// Source of drive-time bands
pub trait BandStore: Send + Sync {
    /// Bands whose bounding box contains the point.
    ///
    /// May return extra bands whose polygon does not cover the point, but must
    /// never omit one that does. Each call must observe a single catalog
    /// snapshot.
    fn find_candidate_bands(&self, point: Point) -> Result<Vec<Arc<DriveTimeBand>>>;

    /// Every band in the catalog
    fn find_all(&self) -> Result<Vec<Arc<DriveTimeBand>>>;
}

/// Lookup of facilities by the station their bands are filed under
pub trait FacilityDirectory: Send + Sync {
    /// Facilities registered for any of the given stations, with services.
    /// Stations without a facility are simply absent from the result.
    fn facilities_by_station(&self, station_ids: &[StationIdentifier]) -> Result<Vec<Arc<Facility>>>;
}
