use anyhow::{bail, Context, Result};
use drivetime::geometry::codec::decode_detecting;
use drivetime::prelude::*;
use std::fs;
use std::path::Path;

/// Parse a JSON array of legacy provider band objects.
///
/// Each band is re-encoded into the compact form and tagged with `version`.
pub fn legacy_bands_from_str(json: &str, version: Option<&str>) -> Result<Vec<DriveTimeBand>> {
    let objects: Vec<serde_json::Value> =
        serde_json::from_str(json).context("Legacy band file is not a JSON array")?;

    objects
        .iter()
        .enumerate()
        .map(|(index, object)| {
            let legacy = DriveTimeBand::from_legacy_json(&object.to_string())
                .with_context(|| format!("Legacy band #{index} is invalid"))?;
            let rings = legacy.geometry()?.into_rings();

            let mut band = DriveTimeBand::from_rings(legacy.id.clone(), rings)
                .with_context(|| format!("Band {} cannot be compacted", legacy.id))?;
            if let Some(tag) = version {
                band = band.with_version(tag);
            }
            Ok(band)
        })
        .collect()
}

pub fn read_legacy_bands(path: &Path, version: Option<&str>) -> Result<Vec<DriveTimeBand>> {
    let json = read_file(path)?;
    legacy_bands_from_str(&json, version)
}

pub fn read_band_records(path: &Path) -> Result<Vec<BandRecord>> {
    let json = read_file(path)?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse band records from {}", path.display()))
}

pub fn write_band_records(bands: &[DriveTimeBand], path: &Path) -> Result<()> {
    let records: Vec<BandRecord> = bands.iter().map(DriveTimeBand::to_record).collect();
    let json = serde_json::to_string_pretty(&records)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn read_facilities(path: &Path) -> Result<Vec<Facility>> {
    let json = read_file(path)?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse facilities from {}", path.display()))
}

pub fn read_config(path: &Path) -> Result<EngineConfig> {
    let json = read_file(path)?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse engine config from {}", path.display()))
}

fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("Input file does not exist: {}", path.display());
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Counts gathered while inspecting a band catalog
#[derive(Debug, Default)]
pub struct CatalogStats {
    pub band_count: usize,
    pub compact_count: usize,
    pub legacy_count: usize,
    pub ring_count: usize,
    pub vertex_count: usize,
    pub unreadable: Vec<String>,
}

impl CatalogStats {
    pub fn collect(records: &[BandRecord]) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.band_count += 1;
            match decode_detecting(&record.encoded) {
                Ok((format, polygon)) => {
                    match format {
                        GeometryFormat::Compact => stats.compact_count += 1,
                        GeometryFormat::Legacy => stats.legacy_count += 1,
                    }
                    stats.ring_count += polygon.rings().len();
                    stats.vertex_count += polygon.vertex_count();
                }
                Err(e) => {
                    log::debug!("{}-{}-{}: {}", record.station_id, record.from_minutes, record.to_minutes, e);
                    stats.unreadable.push(format!(
                        "{}-{}-{}",
                        record.station_id, record.from_minutes, record.to_minutes
                    ));
                }
            }
        }
        stats
    }

    pub fn log_summary(&self) {
        log::info!("=== Band Catalog ===");
        log::info!("Bands: {}", self.band_count);
        log::info!("Compact encoded: {}", self.compact_count);
        log::info!("Legacy encoded: {}", self.legacy_count);
        log::info!("Rings: {}", self.ring_count);
        log::info!("Vertices: {}", self.vertex_count);
        if !self.unreadable.is_empty() {
            log::warn!("Unreadable bands: {}", self.unreadable.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r#"[
        {
            "attributes": { "Sta_No": "666", "FromBreak": 0, "ToBreak": 10, "Name": "666 : 0 - 10" },
            "geometry": { "rings": [[[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0], [-1.0, -1.0]]] }
        },
        {
            "attributes": { "Sta_No": "777", "FromBreak": 80, "ToBreak": 90 },
            "geometry": { "rings": [[[9.5, 9.5], [10.5, 9.5], [10.5, 10.5]], [[20.0, 20.0], [21.0, 20.0], [21.0, 21.0]]] }
        }
    ]"#;

    #[test]
    fn test_legacy_bands_are_compacted() {
        let bands = legacy_bands_from_str(LEGACY, Some("2024.05")).unwrap();
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].id.to_string(), "666-0-10");
        assert_eq!(bands[1].bounding_box.max_lat, 21.0);
        assert_eq!(bands[1].version_tag(), "2024.05");

        let records: Vec<BandRecord> = bands.iter().map(DriveTimeBand::to_record).collect();
        let stats = CatalogStats::collect(&records);
        assert_eq!(stats.compact_count, 2);
        assert_eq!(stats.legacy_count, 0);
        assert_eq!(stats.ring_count, 3);
        assert_eq!(stats.vertex_count, 11);
    }

    #[test]
    fn test_bad_legacy_band_names_its_index() {
        let json = r#"[{ "attributes": { "Sta_No": "666", "FromBreak": 10, "ToBreak": 0 },
                         "geometry": { "rings": [[[0.0, 0.0]]] } }]"#;
        let err = legacy_bands_from_str(json, None).unwrap_err();
        assert!(err.to_string().contains("#0"), "{err}");
    }

    #[test]
    fn test_stats_report_unreadable_rows() {
        let mut record = legacy_bands_from_str(LEGACY, None).unwrap()[0].to_record();
        record.encoded = "garbage".into();

        let stats = CatalogStats::collect(&[record]);
        assert_eq!(stats.unreadable, vec!["666-0-10".to_string()]);
    }
}
