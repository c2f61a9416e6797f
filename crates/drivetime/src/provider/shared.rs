//! Band store whose catalog can be replaced while queries are running.

use std::sync::{Arc, RwLock};

use geo::Point;
use tracing::info;

use crate::models::traits::BandStore;
use crate::models::types::{DriveTimeBand, DriveTimeError, Result};
use crate::provider::static_provider::StaticBandStore;

/// Swappable handle over an immutable [`StaticBandStore`].
///
/// Each query clones the current snapshot `Arc` under a short read lock and
/// then runs against that snapshot alone, so a concurrent [`replace`] is
/// either fully visible to a query or not at all.
///
/// [`replace`]: SharedBandStore::replace
pub struct SharedBandStore {
    current: RwLock<Arc<StaticBandStore>>,
}

impl SharedBandStore {
    pub fn new(store: StaticBandStore) -> Self {
        Self {
            current: RwLock::new(Arc::new(store)),
        }
    }

    /// The catalog as of now
    pub fn snapshot(&self) -> Result<Arc<StaticBandStore>> {
        self.current
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| DriveTimeError::Store("band catalog lock poisoned".into()))
    }

    /// Install a new catalog, returning the previous one
    pub fn replace(&self, store: StaticBandStore) -> Result<Arc<StaticBandStore>> {
        let next = Arc::new(store);
        let band_count = next.len();
        let mut guard = self
            .current
            .write()
            .map_err(|_| DriveTimeError::Store("band catalog lock poisoned".into()))?;
        let previous = std::mem::replace(&mut *guard, next);
        drop(guard);

        info!("band catalog replaced ({} -> {} bands)", previous.len(), band_count);
        Ok(previous)
    }
}

impl BandStore for SharedBandStore {
    fn find_candidate_bands(&self, point: Point) -> Result<Vec<Arc<DriveTimeBand>>> {
        self.snapshot()?.find_candidate_bands(point)
    }

    fn find_all(&self) -> Result<Vec<Arc<DriveTimeBand>>> {
        self.snapshot()?.find_all()
    }
}
