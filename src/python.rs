//! Python bindings (`_core` extension module)
//!
//! Datetimes cross the boundary as float seconds since the Unix epoch; NaN
//! stands for a node without an azimuth time.

use crate::core::{inverse_weights_for_dates, nearest_datetimes, AzimuthGridSynthesizer, Orbit, RangeDopplerSolver};
use crate::core::geo2rdr::Geo2RdrParams;
use crate::types::{AzimuthError, AzimuthTime, TimeResolution};
use chrono::{DateTime, Duration, TimeZone, Utc};
use numpy::{IntoPyArray, PyArray3, PyArrayDyn, PyReadonlyArrayDyn};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

impl From<AzimuthError> for PyErr {
    fn from(e: AzimuthError) -> Self {
        match e {
            AzimuthError::InvalidPeriod { .. }
            | AzimuthError::InvalidParameter(_)
            | AzimuthError::InvalidSlcId { .. }
            | AzimuthError::NoCoverage { .. } => PyValueError::new_err(e.to_string()),
            other => PyRuntimeError::new_err(other.to_string()),
        }
    }
}

fn from_epoch_seconds(seconds: f64) -> PyResult<AzimuthTime> {
    if seconds.is_nan() {
        return Ok(None);
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    Utc.timestamp_opt(whole as i64, nanos)
        .single()
        .map(Some)
        .ok_or_else(|| PyValueError::new_err(format!("Timestamp {} is out of range", seconds)))
}

fn to_epoch_seconds(time: &AzimuthTime) -> f64 {
    match time {
        Some(t) => t.timestamp() as f64 + t.timestamp_subsec_nanos() as f64 * 1e-9,
        None => f64::NAN,
    }
}

fn required_datetime(seconds: f64) -> PyResult<DateTime<Utc>> {
    from_epoch_seconds(seconds)?.ok_or_else(|| PyValueError::new_err("Datetime must not be NaN"))
}

/// The `n` datetimes nearest `reference` on a `period_hours` daily grid
#[pyfunction]
fn get_n_closest_datetimes(reference: f64, n: usize, period_hours: u32) -> PyResult<Vec<f64>> {
    let reference = required_datetime(reference)?;
    let out = nearest_datetimes(reference, n, period_hours)?;
    Ok(out.iter().map(|t| to_epoch_seconds(&Some(*t))).collect())
}

/// One weight array per date, shaped like `time_grid`
#[pyfunction]
#[pyo3(signature = (time_grid, dates, temporal_window_hours = None))]
fn get_inverse_weights_for_dates<'py>(
    py: Python<'py>,
    time_grid: PyReadonlyArrayDyn<'py, f64>,
    dates: Vec<f64>,
    temporal_window_hours: Option<f64>,
) -> PyResult<Vec<&'py PyArrayDyn<f64>>> {
    let view = time_grid.as_array();
    let mut cells = Vec::with_capacity(view.len());
    for &s in view.iter() {
        cells.push(from_epoch_seconds(s)?);
    }
    let grid = ndarray::ArrayD::from_shape_vec(view.raw_dim(), cells)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    let dates = dates
        .into_iter()
        .map(required_datetime)
        .collect::<PyResult<Vec<_>>>()?;

    let weights = inverse_weights_for_dates(&grid, &dates, temporal_window_hours)?;
    Ok(weights.into_iter().map(|w| w.into_pyarray(py)).collect())
}

/// Azimuth time grid `(hgt, lat, lon)` from orbit files for an acquisition window
#[pyfunction]
#[pyo3(signature = (lon, lat, hgt, orbit_files, sensing_start, sensing_stop, orbit_padding_seconds = 600))]
#[allow(clippy::too_many_arguments)]
fn get_azimuth_time_grid<'py>(
    py: Python<'py>,
    lon: Vec<f64>,
    lat: Vec<f64>,
    hgt: Vec<f64>,
    orbit_files: Vec<String>,
    sensing_start: f64,
    sensing_stop: f64,
    orbit_padding_seconds: i64,
) -> PyResult<&'py PyArray3<f64>> {
    let start = required_datetime(sensing_start)?;
    let stop = required_datetime(sensing_stop)?;
    let orbit = Orbit::from_files(&orbit_files, start, stop, Duration::seconds(orbit_padding_seconds))?;

    let solver = RangeDopplerSolver::new(Geo2RdrParams::default());
    let grid = py.allow_threads(|| {
        AzimuthGridSynthesizer::new(&solver)
            .with_resolution(TimeResolution::Microseconds)
            .synthesize(&lon, &lat, &hgt, &orbit)
    });

    Ok(grid.map(to_epoch_seconds).into_pyarray(py))
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(get_n_closest_datetimes, m)?)?;
    m.add_function(wrap_pyfunction!(get_inverse_weights_for_dates, m)?)?;
    m.add_function(wrap_pyfunction!(get_azimuth_time_grid, m)?)?;
    Ok(())
}
