use crate::io::catalog::CatalogQuery;
use crate::io::slc_id::SlcId;
use crate::types::{AcquisitionMode, AzimuthError, AzimuthResult};
use chrono::{DateTime, Duration, Utc};

/// Default half-width of the catalog search window around the nominal time
pub const DEFAULT_SEARCH_WINDOW_SECONDS: i64 = 30;

/// Finds the SLC acquisition covering a point near a nominal datetime
pub struct SlcResolver<'a, C: CatalogQuery + ?Sized> {
    catalog: &'a C,
    search_window: Duration,
}

impl<'a, C: CatalogQuery + ?Sized> SlcResolver<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self {
            catalog,
            search_window: Duration::seconds(DEFAULT_SEARCH_WINDOW_SECONDS),
        }
    }

    pub fn with_search_window(mut self, search_window: Duration) -> Self {
        self.search_window = search_window;
        self
    }

    /// Identifier of the IW acquisition at (`longitude`, `latitude`) whose start
    /// is closest to `datetime`. Equal distances go to the lexicographically
    /// smallest identifier.
    pub fn resolve(&self, longitude: f64, latitude: f64, datetime: DateTime<Utc>) -> AzimuthResult<SlcId> {
        let start = datetime - self.search_window;
        let end = datetime + self.search_window;

        let entries = self.catalog.search(longitude, latitude, start, end)?;
        log::debug!(
            "Catalog returned {} candidate(s) for ({:.4}, {:.4}) at {}",
            entries.len(),
            longitude,
            latitude,
            datetime
        );

        let best = entries
            .iter()
            .filter_map(|entry| match entry.scene_name.parse::<SlcId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    log::warn!("Skipping catalog entry: {}", e);
                    None
                }
            })
            .filter(|id| {
                let iw = id.acquisition_mode() == AcquisitionMode::IW;
                if !iw {
                    log::debug!("Skipping {} acquisition {}", id.acquisition_mode(), id);
                }
                iw
            })
            .map(|id| {
                let distance = (id.start - datetime).abs();
                let name = id.to_string();
                (distance, name, id)
            })
            .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        match best {
            Some((distance, name, id)) => {
                log::info!("Resolved SLC {} ({} s from {})", name, distance.num_seconds(), datetime);
                Ok(id)
            }
            None => Err(AzimuthError::NoCoverage {
                longitude,
                latitude,
                datetime,
            }),
        }
    }
}
