use chrono::{DateTime, Timelike, Utc};
use ndarray::{Array, Array3, Dimension};
use serde::{Deserialize, Serialize};

/// Absolute azimuth acquisition time, `None` where the node could not be solved
pub type AzimuthTime = Option<DateTime<Utc>>;

/// Azimuth time grid indexed (height, latitude, longitude)
pub type AzimuthTimeGrid = Array3<AzimuthTime>;

/// Interpolation weights for one candidate datetime, same shape as the time grid
pub type WeightArray<D> = Array<f64, D>;

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Sentinel-1 acquisition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcquisitionMode {
    IW, // Interferometric Wide swath
    EW, // Extra Wide swath
    SM, // StripMap (S1..S6 beams)
    WV, // Wave
}

impl std::fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionMode::IW => write!(f, "IW"),
            AcquisitionMode::EW => write!(f, "EW"),
            AcquisitionMode::SM => write!(f, "SM"),
            AcquisitionMode::WV => write!(f, "WV"),
        }
    }
}

/// Side of the ground track the antenna looks towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookSide {
    Left,
    Right,
}

impl std::fmt::Display for LookSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookSide::Left => write!(f, "left"),
            LookSide::Right => write!(f, "right"),
        }
    }
}

/// Orbit state vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub time: DateTime<Utc>,
    pub position: [f64; 3],  // [x, y, z] in meters (ECEF)
    pub velocity: [f64; 3],  // [vx, vy, vz] in m/s
}

/// Orbit file content: state vectors plus the header validity window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitData {
    pub state_vectors: Vec<StateVector>,
    pub validity_start: Option<DateTime<Utc>>,
    pub validity_stop: Option<DateTime<Utc>>,
}

impl OrbitData {
    /// First and last state vector times
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.state_vectors.first(), self.state_vectors.last()) {
            (Some(first), Some(last)) => Some((first.time, last.time)),
            _ => None,
        }
    }
}

/// Geodetic point in degrees and meters above the ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl GeodeticPoint {
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self { longitude, latitude, height }
    }

    /// `[lon, lat, h]` with angles in radians, the layout the geometry solver takes
    pub fn to_radians(&self) -> [f64; 3] {
        [self.longitude.to_radians(), self.latitude.to_radians(), self.height]
    }
}

/// Solver output: azimuth time relative to the orbit reference epoch and one-way slant range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarCoordinate {
    pub azimuth_time: f64, // seconds since orbit reference epoch
    pub slant_range: f64,  // meters
}

/// Truncation applied to azimuth times stored in a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeResolution {
    Seconds,
    Milliseconds,
    Microseconds,
}

impl Default for TimeResolution {
    fn default() -> Self {
        TimeResolution::Seconds
    }
}

impl TimeResolution {
    /// Truncate a timestamp towards the past at this resolution
    pub fn truncate(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let step = match self {
            TimeResolution::Seconds => 1_000_000_000,
            TimeResolution::Milliseconds => 1_000_000,
            TimeResolution::Microseconds => 1_000,
        };
        let nanos = time.nanosecond();
        time.with_nanosecond(nanos - nanos % step).unwrap_or(time)
    }
}

/// Count of solved (non-sentinel) cells in any time grid
pub fn valid_cell_count<D: Dimension>(grid: &Array<AzimuthTime, D>) -> usize {
    grid.iter().filter(|t| t.is_some()).count()
}

/// Error types for azimuth timing
#[derive(Debug, thiserror::Error)]
pub enum AzimuthError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("XML parsing error: {0}")]
    XmlParsing(#[from] quick_xml::Error),

    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid SLC identifier '{id}': {reason}")]
    InvalidSlcId { id: String, reason: String },

    #[error("Invalid period of {period_hours} hours: must evenly divide 24 hours")]
    InvalidPeriod { period_hours: u32 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No SLC coverage for lon={longitude}, lat={latitude} at {datetime}")]
    NoCoverage {
        longitude: f64,
        latitude: f64,
        datetime: DateTime<Utc>,
    },

    #[error("No orbit file found: {0}")]
    OrbitNotFound(String),

    #[error("Orbit interpolation error: {0}")]
    OrbitInterpolation(String),

    #[error("Geometry solve did not converge after {iterations} iterations (last update {last_update:.3e} s)")]
    Convergence { iterations: usize, last_update: f64 },

    #[error("Target lies on the {actual} side of the track, expected {expected}")]
    LookSide { expected: LookSide, actual: LookSide },

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for azimuth timing operations
pub type AzimuthResult<T> = Result<T, AzimuthError>;
