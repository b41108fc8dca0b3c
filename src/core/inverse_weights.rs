use crate::types::{AzimuthError, AzimuthResult, AzimuthTime, WeightArray};
use chrono::{DateTime, Utc};
use ndarray::{Array, Dimension, Zip};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How a pixel time relates to the candidate set
#[derive(Debug, Clone, Copy, PartialEq)]
enum Coverage {
    /// Unset pixel, or no candidate inside the window
    Uncovered,
    /// Index of the first candidate equal to the pixel time
    Exact(usize),
    /// Sum of inverse distances of the candidates inside the window
    Inverse(f64),
}

/// Inverse-distance-in-time weighting of candidate datetimes against a time grid
#[derive(Debug, Clone, Default)]
pub struct InverseTimeWeighting {
    /// Candidates further than this from a pixel get no weight there
    temporal_window_seconds: Option<f64>,
}

impl InverseTimeWeighting {
    /// `temporal_window_hours = None` lets every candidate contribute
    pub fn new(temporal_window_hours: Option<f64>) -> AzimuthResult<Self> {
        if let Some(hours) = temporal_window_hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(AzimuthError::InvalidParameter(format!(
                    "Temporal window must be a non-negative number of hours, got {}",
                    hours
                )));
            }
        }
        Ok(Self {
            temporal_window_seconds: temporal_window_hours.map(|h| h * 3600.0),
        })
    }

    /// Normalized weights of each candidate for a single pixel time.
    ///
    /// An exact match takes all the weight. Weights sum to one unless no
    /// candidate is inside the window (or the pixel is unset), in which case
    /// all weights are zero.
    pub fn pixel_weights(&self, time: &AzimuthTime, candidates: &[DateTime<Utc>]) -> Vec<f64> {
        let coverage = self.coverage(time, candidates);
        candidates
            .iter()
            .enumerate()
            .map(|(k, candidate)| self.weight(time, coverage, k, *candidate))
            .collect()
    }

    /// One weight array per candidate, each shaped like `time_grid`
    pub fn weights<D: Dimension>(
        &self,
        time_grid: &Array<AzimuthTime, D>,
        candidates: &[DateTime<Utc>],
    ) -> Vec<WeightArray<D>> {
        #[cfg(feature = "parallel")]
        let coverage = Zip::from(time_grid).par_map_collect(|time| self.coverage(time, candidates));
        #[cfg(not(feature = "parallel"))]
        let coverage = Zip::from(time_grid).map_collect(|time| self.coverage(time, candidates));

        if !candidates.is_empty() {
            let uncovered = coverage.iter().filter(|c| **c == Coverage::Uncovered).count();
            if uncovered > 0 {
                log::warn!(
                    "{} of {} pixels have no candidate datetime within the temporal window",
                    uncovered,
                    time_grid.len()
                );
            }
        }

        let candidate_weights = |k: usize| {
            Zip::from(time_grid)
                .and(&coverage)
                .map_collect(|time, pixel| self.weight(time, *pixel, k, candidates[k]))
        };

        #[cfg(feature = "parallel")]
        let indices = (0..candidates.len()).into_par_iter();
        #[cfg(not(feature = "parallel"))]
        let indices = 0..candidates.len();

        indices.map(candidate_weights).collect()
    }

    fn coverage(&self, time: &AzimuthTime, candidates: &[DateTime<Utc>]) -> Coverage {
        let time = match time {
            Some(time) => *time,
            None => return Coverage::Uncovered,
        };

        let mut total = 0.0;
        for (k, candidate) in candidates.iter().enumerate() {
            let distance = abs_seconds(time, *candidate);
            if distance == 0.0 {
                return Coverage::Exact(k);
            }
            total += self.inverse_distance(distance).unwrap_or(0.0);
        }

        if total > 0.0 {
            Coverage::Inverse(total)
        } else {
            Coverage::Uncovered
        }
    }

    /// Weight of candidate `k` at a pixel whose coverage is already known
    fn weight(&self, time: &AzimuthTime, coverage: Coverage, k: usize, candidate: DateTime<Utc>) -> f64 {
        match (coverage, time) {
            (Coverage::Exact(exact), _) => {
                if exact == k {
                    1.0
                } else {
                    0.0
                }
            }
            (Coverage::Inverse(total), Some(time)) => self
                .inverse_distance(abs_seconds(*time, candidate))
                .map_or(0.0, |w| w / total),
            _ => 0.0,
        }
    }

    fn inverse_distance(&self, seconds: f64) -> Option<f64> {
        let inside = self.temporal_window_seconds.map_or(true, |window| seconds <= window);
        if inside && seconds.is_finite() && seconds > 0.0 {
            Some(1.0 / seconds)
        } else {
            None
        }
    }
}

/// Inverse time weights of `candidates` over `time_grid` with an optional window in hours
pub fn inverse_weights_for_dates<D: Dimension>(
    time_grid: &Array<AzimuthTime, D>,
    candidates: &[DateTime<Utc>],
    temporal_window_hours: Option<f64>,
) -> AzimuthResult<Vec<WeightArray<D>>> {
    Ok(InverseTimeWeighting::new(temporal_window_hours)?.weights(time_grid, candidates))
}

fn abs_seconds(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    let delta = a - b;
    match delta.num_microseconds() {
        Some(us) => (us as f64 * 1e-6).abs(),
        None => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, TimeZone};
    use ndarray::{Array2, Array3};

    fn utc(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 1, h, 0, 0).unwrap()
    }

    fn candidates() -> Vec<DateTime<Utc>> {
        vec![utc(6), utc(12), utc(0)]
    }

    fn grid_at(time: DateTime<Utc>) -> Array2<AzimuthTime> {
        Array2::from_elem((4, 4), Some(time))
    }

    fn assert_weights(weights: &[Array2<f64>], expected: &[f64]) {
        assert_eq!(weights.len(), expected.len());
        for (w, e) in weights.iter().zip(expected) {
            assert_eq!(w.dim(), (4, 4));
            for v in w.iter() {
                assert_abs_diff_eq!(*v, *e, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_six_hour_window() {
        let w = inverse_weights_for_dates(&grid_at(utc(7)), &candidates(), Some(6.0)).unwrap();
        assert_weights(&w, &[0.833, 0.167, 0.0]);
    }

    #[test]
    fn test_three_hour_window() {
        let w = inverse_weights_for_dates(&grid_at(utc(7)), &candidates(), Some(3.0)).unwrap();
        assert_weights(&w, &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_exact_match_takes_all_weight() {
        let w = inverse_weights_for_dates(&grid_at(utc(6)), &candidates(), Some(6.0)).unwrap();
        assert_weights(&w, &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_no_window_uses_every_candidate() {
        let w = inverse_weights_for_dates(&grid_at(utc(7)), &candidates(), None).unwrap();
        // 1/3600 : 1/18000 : 1/25200
        let raw = [1.0 / 3600.0, 1.0 / 18000.0, 1.0 / 25200.0];
        let total: f64 = raw.iter().sum();
        let expected: Vec<f64> = raw.iter().map(|r| r / total).collect();
        assert_weights(&w, &expected);
    }

    #[test]
    fn test_pixels_outside_window_are_all_zero() {
        let w = inverse_weights_for_dates(&grid_at(utc(21)), &candidates(), Some(2.0)).unwrap();
        assert_weights(&w, &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unset_pixels_get_zero_weight() {
        let mut grid = grid_at(utc(7));
        grid[[1, 2]] = None;
        let w = inverse_weights_for_dates(&grid, &candidates(), Some(6.0)).unwrap();

        for k in 0..3 {
            assert_eq!(w[k][[1, 2]], 0.0);
        }
        let sum: f64 = (0..3).map(|k| w[k][[0, 0]]).sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_sum_to_one_per_pixel_on_3d_grid() {
        let base = utc(7);
        let grid = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| {
            Some(base + Duration::seconds((i * 1000 + j * 100 + k * 10) as i64))
        });
        let w = inverse_weights_for_dates(&grid, &candidates(), Some(6.0)).unwrap();

        assert_eq!(w.len(), 3);
        for idx in ndarray::indices((2, 3, 4)) {
            let sum: f64 = w.iter().map(|a| a[idx]).sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
            assert!(w.iter().all(|a| a[idx] >= 0.0));
        }
    }

    #[test]
    fn test_negative_window_is_rejected() {
        assert!(matches!(
            InverseTimeWeighting::new(Some(-1.0)),
            Err(AzimuthError::InvalidParameter(_))
        ));
        assert!(InverseTimeWeighting::new(Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_repeated_exact_candidate_weights_first_only() {
        let repeated = vec![utc(6), utc(12), utc(6)];
        let w = inverse_weights_for_dates(&grid_at(utc(6)), &repeated, None).unwrap();
        assert_weights(&w, &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_grid_weights_match_single_pixel_weights() {
        let weighting = InverseTimeWeighting::new(Some(6.0)).unwrap();
        let base = utc(7);
        let grid = Array2::from_shape_fn((3, 5), |(i, j)| {
            if (i, j) == (2, 4) {
                None
            } else {
                Some(base + Duration::seconds((i * 5000 + j * 600) as i64))
            }
        });

        let w = weighting.weights(&grid, &candidates());
        for ((i, j), time) in grid.indexed_iter() {
            let expected = weighting.pixel_weights(time, &candidates());
            for (k, e) in expected.iter().enumerate() {
                assert_eq!(w[k][[i, j]], *e);
            }
        }
    }

    #[test]
    fn test_no_candidates_gives_no_arrays() {
        let w = inverse_weights_for_dates(&grid_at(utc(7)), &[], Some(6.0)).unwrap();
        assert!(w.is_empty());
    }
}
