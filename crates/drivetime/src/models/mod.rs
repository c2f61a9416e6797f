//! Band, facility and query models, plus collaborator traits.

pub mod traits;
pub mod types;

// Re-exports for convenience
pub use traits::{BandStore, FacilityDirectory};
pub use types::{
    BandId, BandPolygon, BandRecord, BoundingBox, DriveTimeBand, DriveTimeError, Facility,
    FacilityService, NearbyMeta, NearbyRequest, NearbyResponse, NearbyResult, Result,
    ServiceSource, UNKNOWN_BAND_VERSION,
};
