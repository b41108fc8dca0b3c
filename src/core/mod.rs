//! Core azimuth timing modules

pub mod azimuth_grid;
pub mod datetime_select;
pub mod ellipsoid;
pub mod geo2rdr;
pub mod inverse_weights;
pub mod orbit;
pub mod pipeline;
pub mod slc_resolver;

// Re-export main types
pub use azimuth_grid::{azimuth_time_at_point, azimuth_time_grid, AzimuthGridSynthesizer, SynthesisReport};
pub use datetime_select::{nearest_datetimes, validate_period};
pub use ellipsoid::Ellipsoid;
pub use geo2rdr::{DopplerLut, Geo2RdrParams, GeometrySolver, RangeDopplerSolver};
pub use inverse_weights::{inverse_weights_for_dates, InverseTimeWeighting};
pub use orbit::Orbit;
pub use pipeline::{AzimuthTimingConfig, AzimuthTimingPipeline};
pub use slc_resolver::SlcResolver;
