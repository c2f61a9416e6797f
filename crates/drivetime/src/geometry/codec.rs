//! Persisted forms of band geometry.
//!
//! Two encodings are read indefinitely:
//!
//! - **Legacy**: the raw JSON object delivered by the drive-time provider,
//!   `{"attributes": {...}, "geometry": {"rings": [[[lon, lat], ...], ...]}}`.
//! - **Compact**: base64 over a varint stream of quantized, delta-coded vertices.
//!
//! ## Compact layout
//!
//! ```text
//! 0x01                          format version
//! varint   ring_count           >= 1
//! per ring:
//!   varint vertex_count         >= 1
//!   vertex_count x (zigzag Δlon, zigzag Δlat)
//! ```
//!
//! Coordinates are quantized to 1e-5 degrees. Deltas run across ring
//! boundaries: the first vertex of a ring is relative to the last vertex of the
//! previous ring, and the very first vertex is relative to `(0, 0)`.
//!
//! Decoding never looks at a stored format flag: compact parsing is attempted
//! first and the legacy parser is the fallback.

use base64::{engine::general_purpose, Engine as _};
use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::models::types::{BandId, BandPolygon, DriveTimeError, Result};

/// Quantization steps per degree (1e-5 degree resolution)
pub const QUANTIZATION: f64 = 1e5;

const COMPACT_VERSION: u8 = 1;

/// Quantized coordinates must fit in an i32, i.e. within ±21474 degrees
const MAX_QUANTIZED: i64 = i32::MAX as i64;

// ============================================================================
// Format Detection
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryFormat {
    Compact,
    Legacy,
}

/// A persisted geometry string, tagged by the form it was found to be in
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodedGeometry {
    Compact(String),
    Legacy(String),
}

impl EncodedGeometry {
    /// Classify a stored string by parsing it
    pub fn detect(raw: &str) -> Result<Self> {
        let (format, _) = decode_detecting(raw)?;
        Ok(match format {
            GeometryFormat::Compact => Self::Compact(raw.to_owned()),
            GeometryFormat::Legacy => Self::Legacy(raw.to_owned()),
        })
    }

    pub fn format(&self) -> GeometryFormat {
        match self {
            Self::Compact(_) => GeometryFormat::Compact,
            Self::Legacy(_) => GeometryFormat::Legacy,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Compact(s) | Self::Legacy(s) => s,
        }
    }

    /// Decode with the parser for this variant only
    pub fn decode(&self) -> Result<BandPolygon> {
        let rings = match self {
            Self::Compact(s) => decode_compact(s)?,
            Self::Legacy(s) => decode_legacy(s)?,
        };
        BandPolygon::new(rings)
    }
}

// ============================================================================
// Public Entry Points
// ============================================================================

/// Encode rings into the compact form
pub fn encode(polygon: &BandPolygon) -> Result<String> {
    let mut buffer = Vec::with_capacity(2 + polygon.vertex_count() * 4);
    buffer.push(COMPACT_VERSION);
    write_varint(&mut buffer, polygon.rings().len() as u64);

    let mut previous = (0i64, 0i64);
    for ring in polygon.rings() {
        if ring.0.is_empty() {
            return Err(DriveTimeError::InvalidBand("ring has no vertices".into()));
        }
        write_varint(&mut buffer, ring.0.len() as u64);

        for c in &ring.0 {
            let current = (quantize(c.x)?, quantize(c.y)?);
            write_varint(&mut buffer, zigzag(current.0 - previous.0));
            write_varint(&mut buffer, zigzag(current.1 - previous.1));
            previous = current;
        }
    }

    Ok(general_purpose::STANDARD.encode(buffer))
}

/// Decode either stored form
pub fn decode(raw: &str) -> Result<BandPolygon> {
    decode_detecting(raw).map(|(_, polygon)| polygon)
}

/// Decode either stored form, reporting which one matched
pub fn decode_detecting(raw: &str) -> Result<(GeometryFormat, BandPolygon)> {
    let compact_err = match decode_compact(raw) {
        Ok(rings) => return Ok((GeometryFormat::Compact, BandPolygon::new(rings)?)),
        Err(e) => e,
    };
    trace!("compact decode failed ({compact_err}), trying legacy form");

    match decode_legacy(raw) {
        Ok(rings) => Ok((GeometryFormat::Legacy, BandPolygon::new(rings)?)),
        Err(legacy_err) => Err(DriveTimeError::Format(format!(
            "unrecognized geometry encoding (compact: {}; legacy: {})",
            compact_err, legacy_err
        ))),
    }
}

/// Render the legacy structured form, optionally with band attributes
pub fn encode_legacy(id: Option<&BandId>, polygon: &BandPolygon) -> Result<String> {
    let legacy = LegacyBand {
        attributes: id.map(|id| LegacyAttributes {
            station_number: id.station_id.to_string(),
            from_break: id.from_minutes,
            to_break: id.to_minutes,
            name: None,
        }),
        geometry: LegacyGeometry {
            rings: polygon
                .rings()
                .iter()
                .map(|ring| ring.0.iter().map(|c| [c.x, c.y]).collect())
                .collect(),
        },
    };

    serde_json::to_string(&legacy)
        .map_err(|e| DriveTimeError::InvalidBand(format!("cannot serialize legacy band: {e}")))
}

// ============================================================================
// Legacy Form
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LegacyBand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<LegacyAttributes>,
    pub geometry: LegacyGeometry,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LegacyAttributes {
    #[serde(rename = "Sta_No")]
    pub station_number: String,
    #[serde(rename = "FromBreak")]
    pub from_break: u32,
    #[serde(rename = "ToBreak")]
    pub to_break: u32,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LegacyGeometry {
    pub rings: Vec<Vec<[f64; 2]>>,
}

/// Geometry-only view of a legacy object. Attributes are not read, so a row
/// with missing or oddly typed attributes still decodes.
#[derive(Debug, Deserialize)]
struct LegacyRings {
    geometry: LegacyGeometry,
}

/// Parse the full legacy object, attributes included
pub(crate) fn parse_legacy(raw: &str) -> Result<LegacyBand> {
    serde_json::from_str(raw).map_err(|e| DriveTimeError::Format(e.to_string()))
}

fn decode_legacy(raw: &str) -> Result<Vec<LineString<f64>>> {
    let legacy: LegacyRings =
        serde_json::from_str(raw).map_err(|e| DriveTimeError::Format(e.to_string()))?;
    if legacy.geometry.rings.is_empty() {
        return Err(DriveTimeError::Format("no rings".into()));
    }

    legacy
        .geometry
        .rings
        .into_iter()
        .map(|ring| {
            if ring.is_empty() {
                return Err(DriveTimeError::Format("ring has no vertices".into()));
            }
            Ok(LineString::new(
                ring.into_iter().map(|[x, y]| Coord { x, y }).collect(),
            ))
        })
        .collect()
}

// ============================================================================
// Compact Form
// ============================================================================

fn decode_compact(raw: &str) -> Result<Vec<LineString<f64>>> {
    let bytes = general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|e| DriveTimeError::Format(format!("not base64: {e}")))?;

    let mut reader = VarintReader::new(&bytes);
    let version = reader.read_byte()?;
    if version != COMPACT_VERSION {
        return Err(DriveTimeError::Format(format!(
            "unsupported compact version {version}"
        )));
    }

    let ring_count = reader.read_count(1)?;
    if ring_count == 0 {
        return Err(DriveTimeError::Format("no rings".into()));
    }

    let mut rings = Vec::with_capacity(ring_count);
    let mut current = (0i64, 0i64);
    for _ in 0..ring_count {
        let vertex_count = reader.read_count(2)?;
        if vertex_count == 0 {
            return Err(DriveTimeError::Format("ring has no vertices".into()));
        }

        let mut coords = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            let dx = unzigzag(reader.read_varint()?);
            let dy = unzigzag(reader.read_varint()?);
            current.0 = current
                .0
                .checked_add(dx)
                .ok_or_else(|| DriveTimeError::Format("longitude overflow".into()))?;
            current.1 = current
                .1
                .checked_add(dy)
                .ok_or_else(|| DriveTimeError::Format("latitude overflow".into()))?;
            coords.push(Coord {
                x: current.0 as f64 / QUANTIZATION,
                y: current.1 as f64 / QUANTIZATION,
            });
        }
        rings.push(LineString::new(coords));
    }

    if !reader.is_empty() {
        return Err(DriveTimeError::Format(format!(
            "{} trailing bytes",
            reader.remaining()
        )));
    }

    Ok(rings)
}

fn quantize(value: f64) -> Result<i64> {
    if !value.is_finite() {
        return Err(DriveTimeError::InvalidBand(format!(
            "non-finite coordinate {value}"
        )));
    }

    let q = (value * QUANTIZATION).round();
    if q.abs() > MAX_QUANTIZED as f64 {
        return Err(DriveTimeError::InvalidBand(format!(
            "coordinate {value} out of range"
        )));
    }
    Ok(q as i64)
}

fn zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn unzigzag(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

fn write_varint(buffer: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buffer.push((v as u8) | 0x80);
        v >>= 7;
    }
    buffer.push(v as u8);
}

struct VarintReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> VarintReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| DriveTimeError::Format("truncated compact geometry".into()))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_varint(&mut self) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_byte()?;
            // The tenth byte may only contribute the top bit
            if shift == 63 && byte > 1 {
                return Err(DriveTimeError::Format("overlong varint".into()));
            }
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// Read an element count, rejecting counts whose elements (each at least
    /// `min_bytes` long) cannot fit in what is left of the input
    fn read_count(&mut self, min_bytes: usize) -> Result<usize> {
        let count = self.read_varint()?;
        let fits = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(min_bytes))
            .is_some_and(|needed| needed <= self.remaining());
        if !fits {
            return Err(DriveTimeError::Format(format!(
                "count {count} exceeds remaining input"
            )));
        }
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::coord;

    fn polygon(rings: Vec<Vec<(f64, f64)>>) -> BandPolygon {
        BandPolygon::new(
            rings
                .into_iter()
                .map(|r| LineString::new(r.into_iter().map(|(x, y)| coord! { x: x, y: y }).collect()))
                .collect(),
        )
        .unwrap()
    }

    fn assert_same_rings(a: &BandPolygon, b: &BandPolygon, epsilon: f64) {
        assert_eq!(a.rings().len(), b.rings().len());
        for (ra, rb) in a.rings().iter().zip(b.rings()) {
            assert_eq!(ra.0.len(), rb.0.len());
            for (ca, cb) in ra.0.iter().zip(&rb.0) {
                assert_abs_diff_eq!(ca.x, cb.x, epsilon = epsilon);
                assert_abs_diff_eq!(ca.y, cb.y, epsilon = epsilon);
            }
        }
    }

    fn sample() -> BandPolygon {
        polygon(vec![
            vec![(-77.03653, 38.89768), (-77.01, 38.9), (-77.02, 38.87), (-77.03653, 38.89768)],
            vec![(-76.5, 39.1234567), (-76.4, 39.2), (-76.45, 39.25)],
        ])
    }

    #[test]
    fn test_compact_round_trip_within_quantization() {
        let original = sample();
        let decoded = decode(&encode(&original).unwrap()).unwrap();

        assert_same_rings(&original, &decoded, 0.5 / QUANTIZATION + 1e-12);
    }

    #[test]
    fn test_quantized_geometry_is_stable() {
        let once = decode(&encode(&sample()).unwrap()).unwrap();
        let encoded = encode(&once).unwrap();
        let twice = decode(&encoded).unwrap();

        assert_eq!(once, twice);
        assert_eq!(encode(&twice).unwrap(), encoded);
    }

    #[test]
    fn test_legacy_decodes_to_same_rings() {
        let original = sample();
        let legacy = encode_legacy(None, &original).unwrap();

        let (format, decoded) = decode_detecting(&legacy).unwrap();
        assert_eq!(format, GeometryFormat::Legacy);
        assert_same_rings(&original, &decoded, 1e-12);
    }

    #[test]
    fn test_legacy_provider_object() {
        let json = r#"{
            "attributes": { "Sta_No": "666", "FromBreak": 0, "ToBreak": 10, "Name": "666 : 0 - 10" },
            "geometry": { "rings": [[[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0], [-1.0, -1.0]]] }
        }"#;

        let decoded = decode(json).unwrap();
        assert_eq!(decoded.rings().len(), 1);
        assert_eq!(decoded.vertex_count(), 5);

        let legacy = parse_legacy(json).unwrap();
        let attributes = legacy.attributes.unwrap();
        assert_eq!(attributes.station_number, "666");
        assert_eq!(attributes.to_break, 10);
    }

    #[test]
    fn test_legacy_geometry_ignores_attributes() {
        for json in [
            r#"{"attributes":{"Sta_No":"666"},"geometry":{"rings":[[[0,0],[1,0],[1,1]]]}}"#,
            r#"{"attributes":{"Sta_No":666,"FromBreak":0,"ToBreak":10},"geometry":{"rings":[[[0,0],[1,0],[1,1]]]}}"#,
            r#"{"attributes":null,"extra":true,"geometry":{"rings":[[[0,0],[1,0],[1,1]]]}}"#,
        ] {
            let (format, decoded) = decode_detecting(json).unwrap();
            assert_eq!(format, GeometryFormat::Legacy);
            assert_eq!(decoded.vertex_count(), 3);
        }

        // identity still needs well-formed attributes
        assert!(parse_legacy(r#"{"attributes":{"Sta_No":"666"},"geometry":{"rings":[[[0,0]]]}}"#).is_err());
    }

    #[test]
    fn test_detect_reports_format() {
        let compact = encode(&sample()).unwrap();
        let legacy = encode_legacy(None, &sample()).unwrap();

        assert_eq!(
            EncodedGeometry::detect(&compact).unwrap().format(),
            GeometryFormat::Compact
        );
        let detected = EncodedGeometry::detect(&legacy).unwrap();
        assert_eq!(detected.format(), GeometryFormat::Legacy);
        assert_eq!(detected.as_str(), legacy);
        assert_same_rings(&detected.decode().unwrap(), &sample(), 1e-12);
    }

    #[test]
    fn test_tagged_variant_does_not_fall_back() {
        let legacy = encode_legacy(None, &sample()).unwrap();
        assert!(EncodedGeometry::Compact(legacy).decode().is_err());
    }

    #[test]
    fn test_garbage_is_format_error() {
        for raw in ["", "not a band", "{\"geometry\": 5}", "AAAA", "{\"geometry\":{\"rings\":[]}}"] {
            match decode(raw) {
                Err(DriveTimeError::Format(_)) => {}
                other => panic!("expected format error for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_compact_rejects_truncation_and_trailing_bytes() {
        let encoded = encode(&sample()).unwrap();
        let bytes = general_purpose::STANDARD.decode(&encoded).unwrap();

        let truncated = general_purpose::STANDARD.encode(&bytes[..bytes.len() - 1]);
        assert!(decode_compact(&truncated).is_err());

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(decode_compact(&general_purpose::STANDARD.encode(padded)).is_err());

        let mut wrong_version = bytes;
        wrong_version[0] = 9;
        assert!(decode_compact(&general_purpose::STANDARD.encode(wrong_version)).is_err());
    }

    #[test]
    fn test_compact_rejects_oversized_counts() {
        // version, ring_count = 2^32, nothing else
        let mut bytes = vec![COMPACT_VERSION];
        write_varint(&mut bytes, 1 << 32);
        assert!(decode_compact(&general_purpose::STANDARD.encode(bytes)).is_err());
    }

    #[test]
    fn test_encode_rejects_bad_coordinates() {
        assert!(encode(&polygon(vec![vec![(f64::NAN, 0.0)]])).is_err());
        assert!(encode(&polygon(vec![vec![(1e9, 0.0)]])).is_err());
        assert!(encode(&polygon(vec![vec![]])).is_err());
    }

    #[test]
    fn test_zigzag() {
        for v in [0i64, 1, -1, 63, -64, 1 << 40, -(1 << 40), i64::MAX, i64::MIN] {
            assert_eq!(unzigzag(zigzag(v)), v);
        }
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
    }

    #[test]
    fn test_varint_rejects_overlong() {
        let bytes = [0xffu8; 11];
        assert!(VarintReader::new(&bytes).read_varint().is_err());

        let mut max = Vec::new();
        write_varint(&mut max, u64::MAX);
        assert_eq!(VarintReader::new(&max).read_varint().unwrap(), u64::MAX);
    }
}
