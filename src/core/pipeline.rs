//! End-to-end azimuth timing: catalog lookup, orbit retrieval, grid synthesis
//! and temporal interpolation weights.

use crate::core::azimuth_grid::AzimuthGridSynthesizer;
use crate::core::datetime_select::nearest_datetimes;
use crate::core::geo2rdr::{Geo2RdrParams, GeometrySolver, RangeDopplerSolver};
use crate::core::inverse_weights::inverse_weights_for_dates;
use crate::core::orbit::Orbit;
use crate::core::slc_resolver::{SlcResolver, DEFAULT_SEARCH_WINDOW_SECONDS};
use crate::io::catalog::CatalogQuery;
use crate::io::orbit::{LocalOrbitArchive, OrbitProvider};
use crate::io::slc_id::SlcId;
use crate::types::{AzimuthError, AzimuthResult, AzimuthTime, AzimuthTimeGrid, TimeResolution, WeightArray};
use chrono::{DateTime, Duration, Utc};
use ndarray::{Array, Array3, Dimension};
use serde::{Deserialize, Serialize};

/// Default padding of the orbit crop around the acquisition (seconds)
pub const DEFAULT_ORBIT_PADDING_SECONDS: i64 = 600;

/// Azimuth timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzimuthTimingConfig {
    pub geo2rdr: Geo2RdrParams,
    /// State vectors are kept within the acquisition window widened by this much
    pub orbit_padding_seconds: i64,
    /// Catalog search half-width around the requested datetime
    pub search_window_seconds: i64,
    pub time_resolution: TimeResolution,
    /// Return an all-unset grid instead of failing when no SLC covers the area
    pub empty_grid_on_no_coverage: bool,
}

impl Default for AzimuthTimingConfig {
    fn default() -> Self {
        Self {
            geo2rdr: Geo2RdrParams::default(),
            orbit_padding_seconds: DEFAULT_ORBIT_PADDING_SECONDS,
            search_window_seconds: DEFAULT_SEARCH_WINDOW_SECONDS,
            time_resolution: TimeResolution::Seconds,
            empty_grid_on_no_coverage: false,
        }
    }
}

impl AzimuthTimingConfig {
    pub fn orbit_padding(&self) -> Duration {
        Duration::seconds(self.orbit_padding_seconds)
    }

    pub fn search_window(&self) -> Duration {
        Duration::seconds(self.search_window_seconds)
    }
}

/// Azimuth time grids for acquisitions found through a catalog
pub struct AzimuthTimingPipeline<C: CatalogQuery, P: OrbitProvider, S: GeometrySolver> {
    catalog: C,
    orbits: P,
    solver: S,
    config: AzimuthTimingConfig,
}

impl<C: CatalogQuery, P: OrbitProvider> AzimuthTimingPipeline<C, P, RangeDopplerSolver> {
    /// Pipeline using the range-Doppler solver configured by `config.geo2rdr`
    pub fn with_config(catalog: C, orbits: P, config: AzimuthTimingConfig) -> Self {
        let solver = RangeDopplerSolver::new(config.geo2rdr.clone());
        Self::new(catalog, orbits, solver, config)
    }
}

impl<C: CatalogQuery> AzimuthTimingPipeline<C, LocalOrbitArchive, RangeDopplerSolver> {
    /// Pipeline reading orbit files from the archive in the user cache directory
    pub fn with_default_orbit_archive(catalog: C, config: AzimuthTimingConfig) -> AzimuthResult<Self> {
        let orbits = LocalOrbitArchive::in_default_directory()?;
        log::info!("Using orbit archive {}", orbits.directory().display());
        Ok(Self::with_config(catalog, orbits, config))
    }
}

impl<C: CatalogQuery, P: OrbitProvider, S: GeometrySolver> AzimuthTimingPipeline<C, P, S> {
    pub fn new(catalog: C, orbits: P, solver: S, config: AzimuthTimingConfig) -> Self {
        Self {
            catalog,
            orbits,
            solver,
            config,
        }
    }

    pub fn config(&self) -> &AzimuthTimingConfig {
        &self.config
    }

    /// SLC acquisition over the centre of the requested area
    pub fn resolve_slc(&self, lon: &[f64], lat: &[f64], datetime: DateTime<Utc>) -> AzimuthResult<SlcId> {
        validate_axis("longitude", lon)?;
        validate_axis("latitude", lat)?;

        SlcResolver::new(&self.catalog)
            .with_search_window(self.config.search_window())
            .resolve(mean(lon), mean(lat), datetime)
    }

    /// Orbit cropped to the padded acquisition window of `slc_id`
    pub fn orbit_for(&self, slc_id: &SlcId) -> AzimuthResult<Orbit> {
        let pad = self.config.orbit_padding();
        let path = self.orbits.orbit_file(slc_id, pad)?;
        Orbit::from_files(&[path], slc_id.start, slc_id.stop, pad)
    }

    /// Azimuth time grid of shape `(hgt, lat, lon)` for the acquisition nearest
    /// `datetime` over the area
    pub fn time_grid(
        &self,
        lon: &[f64],
        lat: &[f64],
        hgt: &[f64],
        datetime: DateTime<Utc>,
    ) -> AzimuthResult<AzimuthTimeGrid> {
        validate_axis("height", hgt)?;

        let slc_id = match self.resolve_slc(lon, lat, datetime) {
            Ok(id) => id,
            Err(e @ AzimuthError::NoCoverage { .. }) if self.config.empty_grid_on_no_coverage => {
                log::warn!("{}; returning a grid with no azimuth times", e);
                return Ok(Array3::from_elem((hgt.len(), lat.len(), lon.len()), None));
            }
            Err(e) => return Err(e),
        };

        let orbit = self.orbit_for(&slc_id)?;
        log::info!(
            "Orbit for {}: {} state vectors from {}",
            slc_id,
            orbit.len(),
            orbit.reference_epoch()
        );

        Ok(AzimuthGridSynthesizer::new(&self.solver)
            .with_resolution(self.config.time_resolution)
            .synthesize(lon, lat, hgt, &orbit))
    }

    /// Grids for a reference and a secondary acquisition over the same area
    pub fn time_grids_for_pair(
        &self,
        lon: &[f64],
        lat: &[f64],
        hgt: &[f64],
        reference: DateTime<Utc>,
        secondary: DateTime<Utc>,
    ) -> AzimuthResult<(AzimuthTimeGrid, AzimuthTimeGrid)> {
        let reference_grid = self.time_grid(lon, lat, hgt, reference)?;
        let secondary_grid = self.time_grid(lon, lat, hgt, secondary)?;
        Ok((reference_grid, secondary_grid))
    }

    /// The `count` model times nearest `reference` and their weight arrays over `grid`
    pub fn interpolation_weights<D: Dimension>(
        &self,
        grid: &Array<AzimuthTime, D>,
        reference: DateTime<Utc>,
        count: usize,
        period_hours: u32,
        temporal_window_hours: Option<f64>,
    ) -> AzimuthResult<(Vec<DateTime<Utc>>, Vec<WeightArray<D>>)> {
        let candidates = nearest_datetimes(reference, count, period_hours)?;
        let weights = inverse_weights_for_dates(grid, &candidates, temporal_window_hours)?;
        Ok((candidates, weights))
    }
}

fn validate_axis(name: &str, values: &[f64]) -> AzimuthResult<()> {
    if values.is_empty() {
        return Err(AzimuthError::InvalidParameter(format!("Empty {} axis", name)));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(AzimuthError::InvalidParameter(format!(
            "Non-finite {} value {}",
            name, bad
        )));
    }
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
