//! Core data types for drive-time bands, facilities and query results.

use std::fmt;
use std::sync::Arc;

use geo::{LineString, Point};
use serde::{Deserialize, Serialize};

use crate::geometry::codec;
use crate::identifiers::*;

/// Version reported when a band (or a whole query) carries no catalog tag
pub const UNKNOWN_BAND_VERSION: &str = "Unknown";

// ============================================================================
// Geometry
// ============================================================================

/// Tight rectangle around every vertex of a band, in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_long: f64,
    pub max_long: f64,
}

impl BoundingBox {
    /// Bounds all vertices of all rings. `None` when there are no vertices.
    pub fn from_rings(rings: &[LineString<f64>]) -> Option<Self> {
        let mut coords = rings.iter().flat_map(|ring| ring.0.iter());
        let first = coords.next()?;

        let mut bbox = Self {
            min_lat: first.y,
            max_lat: first.y,
            min_long: first.x,
            max_long: first.x,
        };
        for c in coords {
            bbox.min_lat = bbox.min_lat.min(c.y);
            bbox.max_lat = bbox.max_lat.max(c.y);
            bbox.min_long = bbox.min_long.min(c.x);
            bbox.max_long = bbox.max_long.max(c.x);
        }
        Some(bbox)
    }

    /// Inclusive on every side
    pub fn contains(&self, point: Point) -> bool {
        point.y() >= self.min_lat
            && point.y() <= self.max_lat
            && point.x() >= self.min_long
            && point.x() <= self.max_long
    }

    /// True when `other` lies entirely within this box
    pub fn covers(&self, other: &BoundingBox) -> bool {
        other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_long >= self.min_long
            && other.max_long <= self.max_long
    }
}

/// The rings of one drive-time band.
///
/// Each ring is a list of `(longitude, latitude)` vertices stored as
/// `Coord { x: longitude, y: latitude }`. Rings are independent regions, not
/// exterior/hole pairs: a point is covered when any ring contains it.
#[derive(Clone, Debug, PartialEq)]
pub struct BandPolygon {
    rings: Vec<LineString<f64>>,
}

impl BandPolygon {
    pub fn new(rings: Vec<LineString<f64>>) -> Result<Self> {
        if rings.is_empty() {
            return Err(DriveTimeError::InvalidBand("geometry has no rings".into()));
        }
        Ok(Self { rings })
    }

    pub fn rings(&self) -> &[LineString<f64>] {
        &self.rings
    }

    pub fn into_rings(self) -> Vec<LineString<f64>> {
        self.rings
    }

    pub fn vertex_count(&self) -> usize {
        self.rings.iter().map(|r| r.0.len()).sum()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_rings(&self.rings)
    }
}

// ============================================================================
// Drive-Time Bands
// ============================================================================

/// Identity of a band: the station it belongs to and its minute bracket
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BandId {
    pub station_id: StationIdentifier,
    pub from_minutes: u32,
    pub to_minutes: u32,
}

impl BandId {
    pub fn new(station_id: impl Into<StationIdentifier>, from_minutes: u32, to_minutes: u32) -> Result<Self> {
        let station_id = station_id.into();
        if from_minutes >= to_minutes {
            return Err(DriveTimeError::InvalidBand(format!(
                "band {}-{}-{} has an empty bracket",
                station_id, from_minutes, to_minutes
            )));
        }
        Ok(Self {
            station_id,
            from_minutes,
            to_minutes,
        })
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.station_id, self.from_minutes, self.to_minutes)
    }
}

/// A precomputed area reachable from a station within `[from, to]` minutes.
///
/// Geometry is held in persisted (encoded) form and decoded on demand.
#[derive(Clone, Debug)]
pub struct DriveTimeBand {
    pub id: BandId,
    pub bounding_box: BoundingBox,
    pub encoded: Arc<str>,
    pub version: Option<Arc<str>>,
}

impl DriveTimeBand {
    /// Build a band from raw rings, storing the compact encoding.
    ///
    /// The bounding box is taken from the quantized vertices, so it bounds
    /// exactly what a later decode returns.
    pub fn from_rings(id: BandId, rings: Vec<LineString<f64>>) -> Result<Self> {
        let polygon = BandPolygon::new(rings)?;
        if polygon.vertex_count() == 0 {
            return Err(DriveTimeError::InvalidBand(format!("band {} has no vertices", id)));
        }
        let encoded = codec::encode(&polygon)?;
        Self::from_encoded(id, encoded)
    }

    /// Build a band from an already-encoded geometry string of either form
    pub fn from_encoded(id: BandId, encoded: impl Into<Arc<str>>) -> Result<Self> {
        let encoded = encoded.into();
        let polygon = codec::decode(&encoded)?;
        let bounding_box = polygon
            .bounding_box()
            .ok_or_else(|| DriveTimeError::InvalidBand(format!("band {} has no vertices", id)))?;

        Ok(Self {
            id,
            bounding_box,
            encoded,
            version: None,
        })
    }

    /// Build a band from a legacy provider object (attributes + rings).
    ///
    /// The legacy JSON is kept verbatim as the encoded form.
    pub fn from_legacy_json(json: &str) -> Result<Self> {
        let legacy = codec::parse_legacy(json)?;
        let attributes = legacy.attributes.as_ref().ok_or_else(|| {
            DriveTimeError::InvalidBand("legacy band has no attributes".into())
        })?;
        let id = BandId::new(
            attributes.station_number.as_str(),
            attributes.from_break,
            attributes.to_break,
        )?;
        Self::from_encoded(id, json)
    }

    /// Rebuild a band from a persisted row, trusting its stored bounding box.
    ///
    /// Nothing is decoded here. Use [`DriveTimeBand::check_bounding_box`] (as
    /// `StaticBandStore::from_records` does) to verify the row on load.
    pub fn from_record(record: BandRecord) -> Result<Self> {
        let id = BandId::new(record.station_id, record.from_minutes, record.to_minutes)?;
        Ok(Self {
            id,
            bounding_box: record.bounding_box,
            encoded: record.encoded.into(),
            version: record.version.map(Into::into),
        })
    }

    /// Decode the geometry and fail unless the stored bounding box covers
    /// every vertex. A box that is too small would hide the band from the
    /// bounding-box prefilter.
    pub fn check_bounding_box(&self) -> Result<()> {
        let actual = self
            .geometry()?
            .bounding_box()
            .ok_or_else(|| DriveTimeError::InvalidBand(format!("band {} has no vertices", self.id)))?;
        if !self.bounding_box.covers(&actual) {
            return Err(DriveTimeError::InvalidBand(format!(
                "band {} has a stored bounding box {:?} that does not cover its geometry {:?}",
                self.id, self.bounding_box, actual
            )));
        }
        Ok(())
    }

    pub fn to_record(&self) -> BandRecord {
        BandRecord {
            station_id: self.id.station_id.clone(),
            from_minutes: self.id.from_minutes,
            to_minutes: self.id.to_minutes,
            bounding_box: self.bounding_box,
            encoded: self.encoded.to_string(),
            version: self.version.as_deref().map(str::to_owned),
        }
    }

    pub fn with_version(mut self, version: impl Into<Arc<str>>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn station_id(&self) -> &StationIdentifier {
        &self.id.station_id
    }

    pub fn from_minutes(&self) -> u32 {
        self.id.from_minutes
    }

    pub fn to_minutes(&self) -> u32 {
        self.id.to_minutes
    }

    /// Catalog version tag, or "Unknown"
    pub fn version_tag(&self) -> &str {
        self.version.as_deref().unwrap_or(UNKNOWN_BAND_VERSION)
    }

    /// Decode the stored geometry
    pub fn geometry(&self) -> Result<BandPolygon> {
        codec::decode(&self.encoded)
    }
}

/// Flat persisted row for a band, as exchanged with the band store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandRecord {
    pub station_id: StationIdentifier,
    pub from_minutes: u32,
    pub to_minutes: u32,
    #[serde(flatten)]
    pub bounding_box: BoundingBox,
    pub encoded: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ============================================================================
// Facilities
// ============================================================================

/// Where a facility's service listing came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceSource {
    Facility,
    Atc,
    Cms,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityService {
    pub service: ServiceIdentifier,
    pub source: ServiceSource,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub id: FacilityIdentifier,
    pub latitude: f64,
    pub longitude: f64,
    pub station_id: StationIdentifier,
    #[serde(default)]
    pub services: Vec<FacilityService>,
}

impl Facility {
    pub fn location(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }

    /// True when any offered service matches any filter entry, ignoring case.
    /// An empty filter matches every facility.
    pub fn offers_any(&self, filter: &[String]) -> bool {
        filter.is_empty()
            || self
                .services
                .iter()
                .any(|s| filter.iter().any(|wanted| s.service.matches(wanted)))
    }
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct NearbyRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub services: Vec<String>,
    pub max_drive_time: Option<u32>,
}

impl NearbyRequest {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            services: Vec::new(),
            max_drive_time: None,
        }
    }

    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = services.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_drive_time(mut self, minutes: u32) -> Self {
        self.max_drive_time = Some(minutes);
        self
    }

    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

/// A facility reachable within the bracket of its matched band
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearbyResult {
    #[serde(rename = "id")]
    pub facility_id: FacilityIdentifier,
    #[serde(rename = "minTime")]
    pub min_minutes: u32,
    #[serde(rename = "maxTime")]
    pub max_minutes: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyMeta {
    pub band_version: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearbyResponse {
    pub data: Vec<NearbyResult>,
    pub meta: NearbyMeta,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DriveTimeError {
    #[error("Invalid geometry format: {0}")]
    Format(String),

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Invalid band: {0}")]
    InvalidBand(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl DriveTimeError {
    pub fn invalid_parameter(name: &'static str, value: impl fmt::Display) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
        }
    }

    /// Errors caused by the request rather than by stored data
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }
}

pub type Result<T> = std::result::Result<T, DriveTimeError>;
