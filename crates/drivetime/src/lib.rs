//! # drivetime
//!
//! Drive-time proximity for facility directories: which facilities can be
//! reached from a point, and in which travel-time bracket.
//!
//! ## Features
//!
//! - **Bounding-box prefilter**: R-tree lookup of candidate bands
//! - **Exact containment**: even-odd ray casting over multi-ring bands
//! - **Two geometry encodings**: legacy provider JSON and a compact
//!   quantized form, detected transparently at decode time
//! - **Deterministic results**: sorted by bracket, then facility id
//! - **Parallel matching**: per-station work fans out over rayon
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use drivetime::prelude::*;
//! use geo::{coord, LineString};
//!
//! let ring = LineString::new(vec![
//!     coord! { x: -1.0, y: -1.0 },
//!     coord! { x: 1.0, y: -1.0 },
//!     coord! { x: 1.0, y: 1.0 },
//!     coord! { x: -1.0, y: 1.0 },
//! ]);
//! let band = DriveTimeBand::from_rings(BandId::new("666", 0, 10)?, vec![ring])?;
//!
//! let facility = Facility {
//!     id: FacilityIdentifier::new("vha_666"),
//!     latitude: 0.0,
//!     longitude: 0.0,
//!     station_id: StationIdentifier::new("666"),
//!     services: vec![],
//! };
//!
//! let engine = NearbyQueryEngine::new(
//!     Arc::new(StaticBandStore::from_bands(vec![band])),
//!     Arc::new(StaticFacilityDirectory::from_facilities(vec![facility])),
//! );
//!
//! let response = engine.nearby(&NearbyRequest::new(0.0, 0.0))?;
//! assert_eq!(response.data.len(), 1);
//! assert_eq!(response.data[0].max_minutes, 10);
//! # Ok::<(), DriveTimeError>(())
//! ```

pub mod config;
pub mod geometry;
pub mod identifiers;
pub mod matcher;
pub mod models;
pub mod provider;
pub mod query;
pub mod spatial;

// Re-exports for convenience
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::geometry::{EncodedGeometry, GeometryFormat};
    pub use crate::identifiers::*;
    pub use crate::matcher::first_intersection;
    pub use crate::models::{traits::*, types::*};
    pub use crate::provider::{SharedBandStore, StaticBandStore, StaticFacilityDirectory};
    pub use crate::query::NearbyQueryEngine;
}

pub use prelude::*;
