use crate::io::orbit::OrbitReader;
use crate::types::{AzimuthError, AzimuthResult, OrbitData, StateVector};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;

/// Number of state vectors used for Lagrange interpolation
const LAGRANGE_POINTS: usize = 8;

/// Interpolating orbit model.
///
/// State vector times are held as seconds since `reference_epoch`; the
/// geometry solver works entirely in that relative time axis.
#[derive(Debug, Clone)]
pub struct Orbit {
    reference_epoch: DateTime<Utc>,
    times: Vec<f64>,
    positions: Vec<[f64; 3]>,
    velocities: Vec<[f64; 3]>,
}

impl Orbit {
    /// Build an orbit whose reference epoch is the first state vector time
    pub fn from_state_vectors(state_vectors: &[StateVector]) -> AzimuthResult<Self> {
        let epoch = state_vectors
            .iter()
            .map(|sv| sv.time)
            .min()
            .ok_or_else(|| AzimuthError::OrbitInterpolation("No state vectors in orbit data".to_string()))?;
        Self::with_reference_epoch(state_vectors, epoch)
    }

    /// Build an orbit against an explicit reference epoch
    pub fn with_reference_epoch(
        state_vectors: &[StateVector],
        reference_epoch: DateTime<Utc>,
    ) -> AzimuthResult<Self> {
        let mut sorted = state_vectors.to_vec();
        sorted.sort_by_key(|sv| sv.time);
        sorted.dedup_by_key(|sv| sv.time);

        if sorted.len() < 2 {
            return Err(AzimuthError::OrbitInterpolation(format!(
                "At least 2 distinct state vectors are required, got {}",
                sorted.len()
            )));
        }

        let times = sorted
            .iter()
            .map(|sv| seconds_between(reference_epoch, sv.time))
            .collect();
        let positions = sorted.iter().map(|sv| sv.position).collect();
        let velocities = sorted.iter().map(|sv| sv.velocity).collect();

        Ok(Self {
            reference_epoch,
            times,
            positions,
            velocities,
        })
    }

    /// Merge the state vectors of several orbit files and keep those within
    /// `[start - pad, stop + pad]`
    pub fn from_orbit_data(
        orbits: &[OrbitData],
        sensing_start: DateTime<Utc>,
        sensing_stop: DateTime<Utc>,
        pad: Duration,
    ) -> AzimuthResult<Self> {
        let window_start = sensing_start - pad;
        let window_stop = sensing_stop + pad;

        let state_vectors: Vec<StateVector> = orbits
            .iter()
            .flat_map(|orbit| orbit.state_vectors.iter())
            .filter(|sv| sv.time >= window_start && sv.time <= window_stop)
            .cloned()
            .collect();

        log::debug!(
            "Kept {} state vectors between {} and {}",
            state_vectors.len(),
            window_start,
            window_stop
        );

        if state_vectors.is_empty() {
            let spans: Vec<String> = orbits
                .iter()
                .filter_map(|orbit| orbit.time_span())
                .map(|(first, last)| format!("{} to {}", first, last))
                .collect();
            return Err(AzimuthError::OrbitInterpolation(format!(
                "No state vectors between {} and {} (orbit data spans: [{}])",
                window_start,
                window_stop,
                spans.join(", ")
            )));
        }

        Self::from_state_vectors(&state_vectors)
    }

    /// Read orbit files and build the cropped orbit for an acquisition window
    pub fn from_files<P: AsRef<Path>>(
        paths: &[P],
        sensing_start: DateTime<Utc>,
        sensing_stop: DateTime<Utc>,
        pad: Duration,
    ) -> AzimuthResult<Self> {
        let orbits = paths
            .iter()
            .map(|path| OrbitReader::read_orbit_file(path))
            .collect::<AzimuthResult<Vec<_>>>()?;
        Self::from_orbit_data(&orbits, sensing_start, sensing_stop, pad)
    }

    pub fn reference_epoch(&self) -> DateTime<Utc> {
        self.reference_epoch
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// First state vector time relative to the reference epoch
    pub fn start_time(&self) -> f64 {
        self.times[0]
    }

    /// Last state vector time relative to the reference epoch
    pub fn end_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn mid_time(&self) -> f64 {
        0.5 * (self.start_time() + self.end_time())
    }

    /// Convert seconds since the reference epoch into an absolute timestamp
    pub fn to_datetime(&self, seconds: f64) -> DateTime<Utc> {
        let nanos = (seconds * 1e9).round() as i64;
        self.reference_epoch + Duration::nanoseconds(nanos)
    }

    /// Convert an absolute timestamp into seconds since the reference epoch
    pub fn to_relative(&self, time: DateTime<Utc>) -> f64 {
        seconds_between(self.reference_epoch, time)
    }

    /// Interpolate position and velocity at `t` seconds since the reference epoch
    pub fn interpolate(&self, t: f64) -> AzimuthResult<([f64; 3], [f64; 3])> {
        if !t.is_finite() || t < self.start_time() || t > self.end_time() {
            return Err(AzimuthError::OrbitInterpolation(format!(
                "Requested time {:.6} s is outside orbit span [{:.3}, {:.3}] s",
                t,
                self.start_time(),
                self.end_time()
            )));
        }

        let (start, end) = self.interpolation_window(t);
        let position = lagrange_interpolate(&self.times[start..end], &self.positions[start..end], t);
        let velocity = lagrange_interpolate(&self.times[start..end], &self.velocities[start..end], t);

        Ok((position, velocity))
    }

    /// Index range of the state vectors used around `t`
    fn interpolation_window(&self, t: f64) -> (usize, usize) {
        let n = self.times.len();
        let num_points = LAGRANGE_POINTS.min(n);
        let closest_idx = binary_search_closest_time(&self.times, t);

        // Center the window on the closest vector, clamped to the table
        let start = if closest_idx >= num_points / 2 {
            (closest_idx - num_points / 2).min(n - num_points)
        } else {
            0
        };

        (start, start + num_points)
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_nanoseconds() {
        Some(nanos) => nanos as f64 * 1e-9,
        None => delta.num_milliseconds() as f64 * 1e-3,
    }
}

/// Binary search for the sample closest in time to `target`
fn binary_search_closest_time(times: &[f64], target: f64) -> usize {
    if times.is_empty() {
        return 0;
    }

    let mut left = 0;
    let mut right = times.len() - 1;

    while left < right {
        let mid = left + (right - left) / 2;
        if times[mid] < target {
            left = mid + 1;
        } else {
            right = mid;
        }
    }

    if left > 0 && (times[left - 1] - target).abs() < (times[left] - target).abs() {
        return left - 1;
    }

    left
}

/// Lagrange polynomial interpolation of 3-vectors
fn lagrange_interpolate(times: &[f64], values: &[[f64; 3]], target: f64) -> [f64; 3] {
    let n = times.len();
    let mut result = [0.0; 3];

    for i in 0..n {
        let ti = times[i];
        let mut li = 1.0;

        for (j, &tj) in times.iter().enumerate() {
            if i != j {
                li *= (target - tj) / (ti - tj);
            }
        }

        for coord in 0..3 {
            result[coord] += li * values[i][coord];
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn linear_orbit(count: usize) -> Vec<StateVector> {
        let t0 = Utc.with_ymd_and_hms(2021, 7, 23, 1, 45, 0).unwrap();
        (0..count)
            .map(|i| {
                let t = i as f64 * 10.0;
                StateVector {
                    time: t0 + Duration::seconds(i as i64 * 10),
                    position: [7_000_000.0, 7000.0 * t, 1.5 * t * t],
                    velocity: [0.0, 7000.0, 3.0 * t],
                }
            })
            .collect()
    }

    #[test]
    fn test_reference_epoch_is_first_vector() {
        let mut svs = linear_orbit(20);
        svs.reverse();
        let orbit = Orbit::from_state_vectors(&svs).unwrap();

        assert_eq!(orbit.reference_epoch(), Utc.with_ymd_and_hms(2021, 7, 23, 1, 45, 0).unwrap());
        assert_abs_diff_eq!(orbit.start_time(), 0.0);
        assert_abs_diff_eq!(orbit.end_time(), 190.0);
        assert_abs_diff_eq!(orbit.mid_time(), 95.0);
    }

    #[test]
    fn test_interpolation_reproduces_polynomial_motion() {
        let orbit = Orbit::from_state_vectors(&linear_orbit(20)).unwrap();
        let (pos, vel) = orbit.interpolate(123.4).unwrap();

        assert_abs_diff_eq!(pos[0], 7_000_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(pos[1], 7000.0 * 123.4, epsilon = 1e-5);
        assert_abs_diff_eq!(pos[2], 1.5 * 123.4 * 123.4, epsilon = 1e-5);
        assert_abs_diff_eq!(vel[1], 7000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(vel[2], 3.0 * 123.4, epsilon = 1e-6);
    }

    #[test]
    fn test_interpolation_outside_span_fails() {
        let orbit = Orbit::from_state_vectors(&linear_orbit(5)).unwrap();
        assert!(matches!(orbit.interpolate(-0.5), Err(AzimuthError::OrbitInterpolation(_))));
        assert!(matches!(orbit.interpolate(40.5), Err(AzimuthError::OrbitInterpolation(_))));
        assert!(orbit.interpolate(f64::NAN).is_err());
    }

    #[test]
    fn test_duplicate_vectors_are_dropped() {
        let mut svs = linear_orbit(6);
        svs.extend(linear_orbit(6));
        let orbit = Orbit::from_state_vectors(&svs).unwrap();
        assert_eq!(orbit.len(), 6);
    }

    #[test]
    fn test_single_vector_is_rejected() {
        assert!(Orbit::from_state_vectors(&linear_orbit(1)).is_err());
        assert!(Orbit::from_state_vectors(&[]).is_err());
    }

    #[test]
    fn test_crop_to_sensing_window() {
        let data = OrbitData {
            state_vectors: linear_orbit(100),
            validity_start: None,
            validity_stop: None,
        };
        let start = Utc.with_ymd_and_hms(2021, 7, 23, 1, 50, 0).unwrap();
        let stop = start + Duration::seconds(30);
        let orbit = Orbit::from_orbit_data(&[data], start, stop, Duration::seconds(60)).unwrap();

        // 01:49:00 .. 01:51:30 at 10 s spacing
        assert_eq!(orbit.len(), 16);
        assert_eq!(orbit.reference_epoch(), start - Duration::seconds(60));
    }

    #[test]
    fn test_crop_outside_orbit_reports_data_span() {
        let data = OrbitData {
            state_vectors: linear_orbit(10),
            validity_start: None,
            validity_stop: None,
        };
        let start = Utc.with_ymd_and_hms(2021, 7, 23, 3, 0, 0).unwrap();
        let err = Orbit::from_orbit_data(&[data], start, start + Duration::seconds(30), Duration::seconds(60))
            .unwrap_err();

        assert!(matches!(err, AzimuthError::OrbitInterpolation(_)));
        let msg = err.to_string();
        assert!(msg.contains("2021-07-23 01:45:00 UTC to 2021-07-23 01:46:30 UTC"), "{}", msg);
    }

    #[test]
    fn test_relative_time_round_trip() {
        let orbit = Orbit::from_state_vectors(&linear_orbit(10)).unwrap();
        let t = orbit.to_datetime(12.345678);
        assert_abs_diff_eq!(orbit.to_relative(t), 12.345678, epsilon = 1e-9);
    }
}
