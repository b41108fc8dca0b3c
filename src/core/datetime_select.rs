use crate::types::{AzimuthError, AzimuthResult};
use chrono::{DateTime, Duration, Utc};

/// Check that a sampling period gives the same sample hours every day
pub fn validate_period(period_hours: u32) -> AzimuthResult<()> {
    if period_hours == 0 || 24 % period_hours != 0 {
        return Err(AzimuthError::InvalidPeriod { period_hours });
    }
    Ok(())
}

/// The `count` sample times closest to `reference` on a fixed daily grid.
///
/// Samples fall at `00:00 + k * period_hours` every day. The result is ordered
/// by absolute distance to `reference`, nearest first; equal distances put the
/// earlier sample first. Samples on neighbouring days are used when needed.
pub fn nearest_datetimes(
    reference: DateTime<Utc>,
    count: usize,
    period_hours: u32,
) -> AzimuthResult<Vec<DateTime<Utc>>> {
    validate_period(period_hours)?;

    if count == 0 {
        return Ok(Vec::new());
    }

    let period = Duration::hours(period_hours as i64);
    let samples_per_day = (24 / period_hours) as i64;
    // Enough whole days on each side that `count` samples exist on either side
    let pad_days = (count as i64 + samples_per_day - 1) / samples_per_day + 1;

    let day_start = reference
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AzimuthError::Processing(format!("Cannot take midnight of {}", reference)))?;
    let first = day_start - Duration::days(pad_days);
    let total = (2 * pad_days + 1) * samples_per_day;

    let mut candidates: Vec<DateTime<Utc>> = (0..total).map(|k| first + period * k as i32).collect();

    candidates.sort_by_key(|&t| ((t - reference).abs(), t));
    candidates.truncate(count);

    log::debug!(
        "Selected {} sample times around {} at {} h period: {:?}",
        count,
        reference,
        period_hours,
        candidates
    );

    Ok(candidates)
}
