//! Selection of the band whose bracket applies to a point.

use std::sync::Arc;

use geo::Point;
use tracing::error;

use crate::geometry::contains;
use crate::models::types::{DriveTimeBand, Result};

/// Return the first band, in the order given, whose geometry contains the point.
///
/// Callers supply one station's bands in ascending `from_minutes` order; given
/// non-overlapping bands this is the single correct bracket. A band that fails
/// to decode aborts the whole match instead of being skipped.
pub fn first_intersection<'a, I>(point: Point, candidates: I) -> Result<Option<&'a Arc<DriveTimeBand>>>
where
    I: IntoIterator<Item = &'a Arc<DriveTimeBand>>,
{
    for band in candidates {
        let polygon = band.geometry().map_err(|e| {
            error!("band {} has unreadable geometry: {}", band.id, e);
            e
        })?;
        if contains(point, &polygon) {
            return Ok(Some(band));
        }
    }
    Ok(None)
}
