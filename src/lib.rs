//! s1-azimuth-time-grid: Sentinel-1 azimuth acquisition time grids
//!
//! Computes, for every node of a longitude/latitude/height mesh, the UTC time at
//! which a Sentinel-1 SLC acquisition imaged it, and derives inverse-time
//! weights for interpolating periodic model products (e.g. weather model
//! fields) to those times.

pub mod core;
pub mod io;
pub mod types;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    AcquisitionMode, AzimuthError, AzimuthResult, AzimuthTime, AzimuthTimeGrid, GeodeticPoint, LookSide,
    OrbitData, RadarCoordinate, StateVector, TimeResolution,
};

pub use crate::core::{
    azimuth_time_grid, inverse_weights_for_dates, nearest_datetimes, AzimuthGridSynthesizer, AzimuthTimingConfig,
    AzimuthTimingPipeline, Geo2RdrParams, GeometrySolver, Orbit, RangeDopplerSolver, SlcResolver,
};
pub use io::{CatalogEntry, CatalogQuery, Footprint, InMemoryCatalog, LocalOrbitArchive, OrbitReader, SlcId};
