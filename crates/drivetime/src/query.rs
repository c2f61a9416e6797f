//! Drive-time "nearby" queries.
//!
//! ## Pipeline
//!
//! 1. Validate the request (coordinates, `maxDriveTimeMinutes`) before any
//!    store access
//! 2. Fetch bands whose bounding box contains the point (may over-approximate)
//! 3. Per station, pick the first band in ascending `from_minutes` whose
//!    polygon contains the point
//! 4. Resolve facilities for matched stations and apply the service filter
//! 5. Drop results beyond `maxDriveTimeMinutes`
//! 6. Sort by `min_minutes`, then facility id
//!
//! Per-station matching is independent and fans out over the rayon pool once
//! enough stations are in play. The final sort makes the output independent of
//! completion order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use geo::Point;
use rayon::prelude::*;
use tracing::debug;

use crate::config::EngineConfig;
use crate::identifiers::StationIdentifier;
use crate::matcher::first_intersection;
use crate::models::traits::{BandStore, FacilityDirectory};
use crate::models::types::*;

/// Read-only query engine over a band store and a facility directory.
///
/// Holds no mutable state; a single instance can serve any number of
/// concurrent queries.
#[derive(Clone)]
pub struct NearbyQueryEngine {
    bands: Arc<dyn BandStore>,
    facilities: Arc<dyn FacilityDirectory>,
    config: EngineConfig,
}

impl NearbyQueryEngine {
    pub fn new(bands: Arc<dyn BandStore>, facilities: Arc<dyn FacilityDirectory>) -> Self {
        Self {
            bands,
            facilities,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Facilities whose drive-time band covers the request point
    pub fn nearby(&self, request: &NearbyRequest) -> Result<NearbyResponse> {
        self.validate(request)?;

        let point = request.point();
        let candidates = self.bands.find_candidate_bands(point)?;
        debug!("{} candidate bands contain {:?} by bounding box", candidates.len(), point);

        let matched = self.match_stations(point, group_by_station(candidates))?;
        debug!("{} stations have a band covering the point", matched.len());
        if matched.is_empty() {
            return Ok(self.respond(Vec::new()));
        }

        let station_ids: Vec<StationIdentifier> =
            matched.iter().map(|band| band.station_id().clone()).collect();
        let bands_by_station: HashMap<&StationIdentifier, &Arc<DriveTimeBand>> =
            matched.iter().map(|band| (band.station_id(), band)).collect();

        let facilities = self.facilities.facilities_by_station(&station_ids)?;
        let mut results: Vec<(NearbyResult, &Arc<DriveTimeBand>)> = facilities
            .iter()
            .filter(|facility| facility.offers_any(&request.services))
            .filter_map(|facility| {
                let band = bands_by_station.get(&facility.station_id)?;
                let result = NearbyResult {
                    facility_id: facility.id.clone(),
                    min_minutes: band.from_minutes(),
                    max_minutes: band.to_minutes(),
                };
                Some((result, *band))
            })
            .filter(|(result, _)| {
                request
                    .max_drive_time
                    .map_or(true, |max| result.max_minutes <= max)
            })
            .collect();

        results.sort_by(|(a, _), (b, _)| {
            a.min_minutes
                .cmp(&b.min_minutes)
                .then_with(|| a.facility_id.cmp(&b.facility_id))
        });

        Ok(self.respond(results))
    }

    fn validate(&self, request: &NearbyRequest) -> Result<()> {
        if !request.latitude.is_finite() || !(-90.0..=90.0).contains(&request.latitude) {
            return Err(DriveTimeError::invalid_parameter("lat", request.latitude));
        }
        if !request.longitude.is_finite() || !(-180.0..=180.0).contains(&request.longitude) {
            return Err(DriveTimeError::invalid_parameter("long", request.longitude));
        }
        if let Some(max) = request.max_drive_time {
            if !self.config.is_recognized_bracket(max) {
                return Err(DriveTimeError::invalid_parameter("maxDriveTimeMinutes", max));
            }
        }
        Ok(())
    }

    fn match_stations(
        &self,
        point: Point,
        stations: Vec<Vec<Arc<DriveTimeBand>>>,
    ) -> Result<Vec<Arc<DriveTimeBand>>> {
        let match_one = |bands: &Vec<Arc<DriveTimeBand>>| {
            first_intersection(point, bands).map(|hit| hit.cloned())
        };

        let hits: Vec<Option<Arc<DriveTimeBand>>> = if stations.len() >= self.config.parallel_threshold {
            stations.par_iter().map(match_one).collect::<Result<_>>()?
        } else {
            stations.iter().map(match_one).collect::<Result<_>>()?
        };

        Ok(hits.into_iter().flatten().collect())
    }

    fn respond(&self, results: Vec<(NearbyResult, &Arc<DriveTimeBand>)>) -> NearbyResponse {
        let band_version = results
            .iter()
            .find_map(|(_, band)| band.version.as_deref())
            .unwrap_or(self.config.unknown_band_version.as_str())
            .to_string();

        NearbyResponse {
            data: results.into_iter().map(|(result, _)| result).collect(),
            meta: NearbyMeta { band_version },
        }
    }
}

/// Group bands per station, each group in ascending `from_minutes`.
/// The sort is stable, so equal brackets keep the store's order.
fn group_by_station(bands: Vec<Arc<DriveTimeBand>>) -> Vec<Vec<Arc<DriveTimeBand>>> {
    let mut groups: BTreeMap<StationIdentifier, Vec<Arc<DriveTimeBand>>> = BTreeMap::new();
    for band in bands {
        groups.entry(band.station_id().clone()).or_default().push(band);
    }

    groups
        .into_values()
        .map(|mut group| {
            group.sort_by_key(|band| band.from_minutes());
            group
        })
        .collect()
}
