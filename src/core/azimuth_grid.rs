use crate::core::geo2rdr::GeometrySolver;
use crate::core::orbit::Orbit;
use crate::types::{
    AzimuthResult, AzimuthTimeGrid, GeodeticPoint, TimeResolution, SPEED_OF_LIGHT,
};
use chrono::{DateTime, Utc};
use ndarray::{Array3, Zip};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Absolute azimuth acquisition time of a single ground point.
///
/// The solver's raw azimuth time is shifted by the one-way propagation delay
/// `slant_range / c` before being anchored to the orbit reference epoch.
/// Solver failures are returned unchanged.
pub fn azimuth_time_at_point<S: GeometrySolver + ?Sized>(
    solver: &S,
    orbit: &Orbit,
    point: &GeodeticPoint,
) -> AzimuthResult<DateTime<Utc>> {
    let rdr = solver.solve(&point.to_radians(), orbit)?;
    let azimuth_time = rdr.azimuth_time + rdr.slant_range / SPEED_OF_LIGHT;
    Ok(orbit.to_datetime(azimuth_time))
}

/// Builds azimuth time grids over a (height, latitude, longitude) mesh
pub struct AzimuthGridSynthesizer<'a, S: GeometrySolver + ?Sized> {
    solver: &'a S,
    resolution: TimeResolution,
}

/// Outcome counts of a grid synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisReport {
    pub total: usize,
    pub solved: usize,
    pub failed: usize,
}

impl<'a, S: GeometrySolver + ?Sized> AzimuthGridSynthesizer<'a, S> {
    pub fn new(solver: &'a S) -> Self {
        Self {
            solver,
            resolution: TimeResolution::default(),
        }
    }

    pub fn with_resolution(mut self, resolution: TimeResolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Solve every node of the outer-product mesh of `hgt`, `lat` and `lon`.
    ///
    /// The output has shape `(hgt.len(), lat.len(), lon.len())`. Nodes whose
    /// solve fails stay `None` and never abort the grid, so there is no error
    /// to return; use [`synthesize_with_report`](Self::synthesize_with_report)
    /// to inspect the failure count.
    pub fn synthesize(&self, lon: &[f64], lat: &[f64], hgt: &[f64], orbit: &Orbit) -> AzimuthTimeGrid {
        let (grid, report) = self.synthesize_with_report(lon, lat, hgt, orbit);
        log::debug!("Azimuth grid synthesis: {:?}", report);
        grid
    }

    /// Same as [`synthesize`](Self::synthesize), also returning solve counts
    pub fn synthesize_with_report(
        &self,
        lon: &[f64],
        lat: &[f64],
        hgt: &[f64],
        orbit: &Orbit,
    ) -> (AzimuthTimeGrid, SynthesisReport) {
        let shape = (hgt.len(), lat.len(), lon.len());
        let total = shape.0 * shape.1 * shape.2;

        log::info!(
            "Synthesizing azimuth time grid: {} heights x {} latitudes x {} longitudes ({} nodes)",
            shape.0,
            shape.1,
            shape.2,
            total
        );

        let mut grid: AzimuthTimeGrid = Array3::from_elem(shape, None);
        let failed = AtomicUsize::new(0);
        let first_failure: Mutex<Option<String>> = Mutex::new(None);

        let solve_node = |(i, j, k): (usize, usize, usize), cell: &mut Option<DateTime<Utc>>| {
            let point = GeodeticPoint::new(lon[k], lat[j], hgt[i]);
            match azimuth_time_at_point(self.solver, orbit, &point) {
                Ok(time) => *cell = Some(self.resolution.truncate(time)),
                Err(e) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    if let Ok(mut slot) = first_failure.lock() {
                        if slot.is_none() {
                            *slot = Some(format!(
                                "lon={:.6}, lat={:.6}, hgt={:.1}: {}",
                                point.longitude, point.latitude, point.height, e
                            ));
                        }
                    }
                }
            }
        };

        #[cfg(feature = "parallel")]
        Zip::indexed(&mut grid).par_for_each(solve_node);
        #[cfg(not(feature = "parallel"))]
        Zip::indexed(&mut grid).for_each(solve_node);

        let failed = failed.into_inner();
        let report = SynthesisReport {
            total,
            solved: total - failed,
            failed,
        };

        if failed > 0 {
            let detail = first_failure
                .into_inner()
                .ok()
                .flatten()
                .unwrap_or_default();
            log::warn!(
                "{} of {} nodes failed to solve and are left unset (first failure at {})",
                failed,
                total,
                detail
            );
        }
        log::info!("Azimuth time grid complete: {}/{} nodes solved", report.solved, total);

        (grid, report)
    }
}

/// Azimuth time grid for the mesh of `lon`, `lat`, `hgt` against `orbit`
pub fn azimuth_time_grid<S: GeometrySolver + ?Sized>(
    lon: &[f64],
    lat: &[f64],
    hgt: &[f64],
    orbit: &Orbit,
    solver: &S,
    resolution: TimeResolution,
) -> AzimuthTimeGrid {
    AzimuthGridSynthesizer::new(solver)
        .with_resolution(resolution)
        .synthesize(lon, lat, hgt, orbit)
}
