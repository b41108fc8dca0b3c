#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use s1_azimuth_time_grid::io::{CatalogEntry, Footprint, InMemoryCatalog, OrbitReader};
use s1_azimuth_time_grid::{OrbitData, SlcId, StateVector};
use std::path::{Path, PathBuf};

/// Circular polar orbit, Earth-fixed, north-bound over `TRACK_LON`
pub const ORBIT_RADIUS: f64 = 7_071_000.0;
pub const ORBIT_PERIOD: f64 = 5924.0;
pub const TRACK_LON: f64 = -122.0;

/// Equator crossing precedes the frame start over southern California by this much
pub const EQUATOR_TO_FRAME_SECONDS: i64 = 555;

pub const REFERENCE_ID: &str = "S1B_IW_SLC__1SDV_20210723T014947_20210723T015014_027915_0354B4_B3A9";
pub const SECONDARY_IDS: [&str; 3] = [
    "S1B_IW_SLC__1SDV_20210711T014922_20210711T014949_027740_034F80_859D",
    "S1B_IW_SLC__1SDV_20210711T014947_20210711T015013_027740_034F80_D404",
    "S1B_IW_SLC__1SDV_20210711T015011_20210711T015038_027740_034F80_376C",
];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (stop - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

/// State vectors every 10 s from `equator_crossing + from_s` to `equator_crossing + to_s`
pub fn synthetic_pass(equator_crossing: DateTime<Utc>, from_s: i64, to_s: i64) -> OrbitData {
    let omega = 2.0 * std::f64::consts::PI / ORBIT_PERIOD;
    let (sin_l, cos_l) = TRACK_LON.to_radians().sin_cos();

    let state_vectors = (from_s / 10..=to_s / 10)
        .map(|i| {
            let t = i as f64 * 10.0;
            let (s, c) = (omega * t).sin_cos();
            StateVector {
                time: equator_crossing + Duration::seconds(i * 10),
                position: [ORBIT_RADIUS * c * cos_l, ORBIT_RADIUS * c * sin_l, ORBIT_RADIUS * s],
                velocity: [
                    -ORBIT_RADIUS * omega * s * cos_l,
                    -ORBIT_RADIUS * omega * s * sin_l,
                    ORBIT_RADIUS * omega * c,
                ],
            }
        })
        .collect();

    OrbitData {
        state_vectors,
        validity_start: Some(equator_crossing + Duration::seconds(from_s)),
        validity_stop: Some(equator_crossing + Duration::seconds(to_s)),
    }
}

/// Synthetic pass whose frames start `EQUATOR_TO_FRAME_SECONDS` after the equator
pub fn pass_for_frame(frame_start: DateTime<Utc>) -> OrbitData {
    let crossing = frame_start - Duration::seconds(EQUATOR_TO_FRAME_SECONDS);
    synthetic_pass(crossing, -600, 1800)
}

/// Precise orbit file name with the validity window of `orbit`
pub fn orbit_file_name(platform: &str, kind: &str, orbit: &OrbitData) -> String {
    let fmt = "%Y%m%dT%H%M%S";
    let start = orbit.validity_start.unwrap();
    let stop = orbit.validity_stop.unwrap();
    format!(
        "{}_OPER_AUX_{}_OPOD_{}_V{}_{}.EOF",
        platform,
        kind,
        (stop + Duration::days(1)).format(fmt),
        start.format(fmt),
        stop.format(fmt)
    )
}

/// Write `orbit` into `dir` under its file name and return the path
pub fn write_orbit(dir: &Path, platform: &str, kind: &str, orbit: &OrbitData) -> PathBuf {
    let path = dir.join(orbit_file_name(platform, kind, orbit));
    OrbitReader::write_eof(orbit, &path).unwrap();
    path
}

/// Three consecutive along-track frames; the one starting at `:49:47` covers 33.2-35.1 N
fn frame_footprint(start: DateTime<Utc>) -> Footprint {
    // Seconds after 01:49:47
    let offset = (start.timestamp() % 86_400 - 6587) as f64;
    // ~0.068 degrees of latitude per second along track
    let south = 33.2 + offset * 0.068;
    let north = south + 1.9;
    Footprint::from_wkt(&format!(
        "POLYGON((-120.3 {s}, -113.2 {s2}, -113.5 {n2}, -120.6 {n}, -120.3 {s}))",
        s = south,
        s2 = south - 0.1,
        n = north,
        n2 = north - 0.1
    ))
    .unwrap()
}

pub fn catalog_entry(name: &str) -> CatalogEntry {
    let id: SlcId = name.parse().unwrap();
    CatalogEntry {
        scene_name: name.to_string(),
        footprint: frame_footprint(id.start),
        start: id.start,
        stop: id.stop,
    }
}

/// Frames of the reference and secondary passes over southern California
pub fn california_catalog() -> InMemoryCatalog {
    let mut names = vec![REFERENCE_ID];
    names.extend(SECONDARY_IDS);
    InMemoryCatalog::new(names.into_iter().map(catalog_entry).collect())
}
