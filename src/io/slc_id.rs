use crate::types::{AcquisitionMode, AzimuthError, AzimuthResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Timestamp layout used in product and orbit file names
pub const FILENAME_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

const SLC_ID_PATTERN: &str = concat!(
    r"^(?P<platform>S1[A-D])_",
    r"(?P<beam>IW|EW|WV|S[1-6])_",
    r"(?P<product>[A-Z]{3}[A-Z_])_",
    r"(?P<pol>[0-9][SA][SDHV]{2})_",
    r"(?P<start>\d{8}T\d{6})_",
    r"(?P<stop>\d{8}T\d{6})_",
    r"(?P<orbit>\d{6})_",
    r"(?P<datatake>[0-9A-F]{6})_",
    r"(?P<unique>[0-9A-F]{4})$",
);

fn slc_id_regex() -> AzimuthResult<&'static Regex> {
    static RE: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = RE.get() {
        return Ok(re);
    }
    let re = Regex::new(SLC_ID_PATTERN)
        .map_err(|e| AzimuthError::Processing(format!("Bad SLC identifier pattern: {}", e)))?;
    Ok(RE.get_or_init(|| re))
}

/// Parse a `YYYYMMDDTHHMMSS` file name timestamp as UTC
pub fn parse_filename_time(text: &str) -> AzimuthResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, FILENAME_TIME_FORMAT)
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
        .map_err(|e| AzimuthError::InvalidFormat(format!("Bad timestamp '{}': {}", text, e)))
}

/// Acquisition start of a product identifier: the sixth `_`-separated token
pub fn acquisition_start_from_id(id: &str) -> AzimuthResult<DateTime<Utc>> {
    let token = id.split('_').nth(5).ok_or_else(|| AzimuthError::InvalidSlcId {
        id: id.to_string(),
        reason: "fewer than 6 '_'-separated fields".to_string(),
    })?;
    parse_filename_time(token).map_err(|_| AzimuthError::InvalidSlcId {
        id: id.to_string(),
        reason: format!("'{}' is not a YYYYMMDDTHHMMSS timestamp", token),
    })
}

/// Sentinel-1 SLC product identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlcId {
    pub platform: String,
    pub beam_mode: String,
    pub product_type: String,
    pub polarisation: String,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub absolute_orbit: u32,
    pub data_take_id: String,
    pub unique_id: String,
}

impl SlcId {
    /// Acquisition mode of the beam (stripmap swaths S1..S6 map to SM)
    pub fn acquisition_mode(&self) -> AcquisitionMode {
        match self.beam_mode.as_str() {
            "IW" => AcquisitionMode::IW,
            "EW" => AcquisitionMode::EW,
            "WV" => AcquisitionMode::WV,
            _ => AcquisitionMode::SM,
        }
    }
}

impl FromStr for SlcId {
    type Err = AzimuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| AzimuthError::InvalidSlcId {
            id: s.to_string(),
            reason: reason.to_string(),
        };

        let caps = slc_id_regex()?
            .captures(s)
            .ok_or_else(|| invalid("does not match the Sentinel-1 product name layout"))?;

        let start = parse_filename_time(&caps["start"]).map_err(|_| invalid("bad start timestamp"))?;
        let stop = parse_filename_time(&caps["stop"]).map_err(|_| invalid("bad stop timestamp"))?;
        if stop < start {
            return Err(invalid("stop time precedes start time"));
        }
        let absolute_orbit = caps["orbit"]
            .parse()
            .map_err(|_| invalid("bad absolute orbit number"))?;

        Ok(Self {
            platform: caps["platform"].to_string(),
            beam_mode: caps["beam"].to_string(),
            product_type: caps["product"].to_string(),
            polarisation: caps["pol"].to_string(),
            start,
            stop,
            absolute_orbit,
            data_take_id: caps["datatake"].to_string(),
            unique_id: caps["unique"].to_string(),
        })
    }
}

impl fmt::Display for SlcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}_{}_{:06}_{}_{}",
            self.platform,
            self.beam_mode,
            self.product_type,
            self.polarisation,
            self.start.format(FILENAME_TIME_FORMAT),
            self.stop.format(FILENAME_TIME_FORMAT),
            self.absolute_orbit,
            self.data_take_id,
            self.unique_id
        )
    }
}
