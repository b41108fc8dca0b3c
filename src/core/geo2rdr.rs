//! Range-Doppler geometry: map a ground point to (azimuth time, slant range)
//!
//! The grid synthesizer only depends on the [`GeometrySolver`] trait, so a
//! different solver (or a deterministic fake in tests) can be swapped in.

use crate::core::ellipsoid::Ellipsoid;
use crate::core::orbit::Orbit;
use crate::types::{AzimuthError, AzimuthResult, LookSide, RadarCoordinate};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Point-wise geometry solve against an orbit.
///
/// `llh` is `[longitude, latitude, height]` with angles in radians. The
/// returned azimuth time is relative to `orbit.reference_epoch()`.
pub trait GeometrySolver: Sync {
    fn solve(&self, llh: &[f64; 3], orbit: &Orbit) -> AzimuthResult<RadarCoordinate>;
}

/// Newton iteration parameters for the zero-Doppler solve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geo2RdrParams {
    /// Scale applied to the Doppler lookup (radar wavelength in meters)
    pub wavelength: f64,
    /// Antenna look direction
    pub look_side: LookSide,
    /// Convergence threshold on the azimuth time update (seconds)
    pub threshold: f64,
    /// Maximum Newton iterations
    pub max_iterations: usize,
    /// Slant range step for the Doppler derivative (meters)
    pub delta_range: f64,
}

impl Default for Geo2RdrParams {
    fn default() -> Self {
        Self {
            wavelength: 0.06,
            look_side: LookSide::Right,
            threshold: 1.0e-7,
            max_iterations: 30,
            delta_range: 10.0,
        }
    }
}

/// Doppler centroid lookup over (azimuth time, slant range).
///
/// The default table is empty and evaluates to zero everywhere (zero-Doppler
/// geometry). Queries outside a populated table are clamped to its edges.
#[derive(Debug, Clone, Default)]
pub struct DopplerLut {
    azimuth_times: Vec<f64>,
    slant_ranges: Vec<f64>,
    data: Option<Array2<f64>>,
}

impl DopplerLut {
    pub fn zero_doppler() -> Self {
        Self::default()
    }

    /// Build a table; `data` is indexed (azimuth time, slant range)
    pub fn new(azimuth_times: Vec<f64>, slant_ranges: Vec<f64>, data: Array2<f64>) -> AzimuthResult<Self> {
        if data.dim() != (azimuth_times.len(), slant_ranges.len()) {
            return Err(AzimuthError::InvalidParameter(format!(
                "Doppler table shape {:?} does not match axes ({}, {})",
                data.dim(),
                azimuth_times.len(),
                slant_ranges.len()
            )));
        }
        if azimuth_times.is_empty() || slant_ranges.is_empty() {
            return Err(AzimuthError::InvalidParameter("Doppler table axes must not be empty".to_string()));
        }
        let increasing = |axis: &[f64]| axis.windows(2).all(|w| w[1] > w[0]);
        if !increasing(&azimuth_times) || !increasing(&slant_ranges) {
            return Err(AzimuthError::InvalidParameter(
                "Doppler table axes must be strictly increasing".to_string(),
            ));
        }

        Ok(Self {
            azimuth_times,
            slant_ranges,
            data: Some(data),
        })
    }

    /// Doppler frequency (Hz) at azimuth time `t` and slant range `r`
    pub fn eval(&self, t: f64, r: f64) -> f64 {
        let data = match &self.data {
            Some(data) => data,
            None => return 0.0,
        };

        let (i1, i2, dy) = bracket(&self.azimuth_times, t);
        let (j1, j2, dx) = bracket(&self.slant_ranges, r);

        let v11 = data[[i1, j1]];
        let v12 = data[[i2, j1]];
        let v21 = data[[i1, j2]];
        let v22 = data[[i2, j2]];

        let v1 = v11 * (1.0 - dx) + v21 * dx;
        let v2 = v12 * (1.0 - dx) + v22 * dx;
        v1 * (1.0 - dy) + v2 * dy
    }
}

/// Lower/upper indices and fractional offset of `x` on a sorted axis, clamped
fn bracket(axis: &[f64], x: f64) -> (usize, usize, f64) {
    let last = axis.len() - 1;
    if last == 0 || x <= axis[0] {
        return (0, 0, 0.0);
    }
    if x >= axis[last] {
        return (last, last, 0.0);
    }
    let upper = axis.partition_point(|&v| v <= x);
    let lower = upper - 1;
    let frac = (x - axis[lower]) / (axis[upper] - axis[lower]);
    (lower, upper, frac)
}

/// Iterative range-Doppler (geo2rdr) solver
#[derive(Debug, Clone, Default)]
pub struct RangeDopplerSolver {
    pub ellipsoid: Ellipsoid,
    pub doppler: DopplerLut,
    pub params: Geo2RdrParams,
}

impl RangeDopplerSolver {
    pub fn new(params: Geo2RdrParams) -> Self {
        Self {
            ellipsoid: Ellipsoid::wgs84(),
            doppler: DopplerLut::zero_doppler(),
            params,
        }
    }

    pub fn with_doppler(mut self, doppler: DopplerLut) -> Self {
        self.doppler = doppler;
        self
    }
}

impl GeometrySolver for RangeDopplerSolver {
    fn solve(&self, llh: &[f64; 3], orbit: &Orbit) -> AzimuthResult<RadarCoordinate> {
        let target = self.ellipsoid.lon_lat_to_xyz(llh);
        let dopscale = 0.5 * self.params.wavelength;

        let mut azimuth_time = orbit.mid_time();
        let mut dt = 0.0;

        for iteration in 0..self.params.max_iterations {
            let (sat_pos, sat_vel) = orbit.interpolate(azimuth_time)?;
            let dr = sub(&target, &sat_pos);
            let slant_range = norm(&dr);

            if iteration == 0 {
                let actual = if dot(&cross(&dr, &sat_vel), &sat_pos) > 0.0 {
                    LookSide::Right
                } else {
                    LookSide::Left
                };
                if actual != self.params.look_side {
                    return Err(AzimuthError::LookSide {
                        expected: self.params.look_side,
                        actual,
                    });
                }
            }

            let dopfact = dot(&dr, &sat_vel);
            let fdop = self.doppler.eval(azimuth_time, slant_range) * dopscale;
            let fdopder = (self.doppler.eval(azimuth_time, slant_range + self.params.delta_range) * dopscale
                - fdop)
                / self.params.delta_range;

            let fn_value = dopfact - fdop * slant_range;
            let c1 = -dot(&sat_vel, &sat_vel);
            let c2 = fdop / slant_range + fdopder;
            let fn_prime = c1 + c2 * dopfact;

            dt = fn_value / fn_prime;
            // Slant range stays the one evaluated before this update
            azimuth_time -= dt;

            if dt.abs() < self.params.threshold {
                log::trace!(
                    "geo2rdr converged in {} iterations: t={:.9} s, r={:.3} m",
                    iteration + 1,
                    azimuth_time,
                    slant_range
                );
                return Ok(RadarCoordinate {
                    azimuth_time,
                    slant_range,
                });
            }
        }

        Err(AzimuthError::Convergence {
            iterations: self.params.max_iterations,
            last_update: dt.abs(),
        })
    }
}

fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}
