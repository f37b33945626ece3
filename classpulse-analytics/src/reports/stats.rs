//! Arithmetic shared by the reports. Denominators are clamped to at least
//! one so an empty population yields zero instead of NaN.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / max(whole, 1) × 100`, rounded to two decimals.
#[must_use]
pub fn percentage(part: u64, whole: u64) -> f64 {
    round2(part as f64 * 100.0 / whole.max(1) as f64)
}

/// Arithmetic mean, or `None` for an empty slice.
#[must_use]
pub fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|v| *v as f64).sum();
    Some(sum / values.len() as f64)
}

/// Percentile `q` (0.0 to 1.0) of ascending `sorted` values by linear
/// interpolation between closest ranks at position `(n - 1) × q`.
#[must_use]
pub fn percentile(sorted: &[i64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = last as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    let low = sorted[lower] as f64;
    let high = sorted[upper.min(last)] as f64;
    Some(low + (high - low) * fraction)
}

/// Where a rank sits in a population of `population`, as a percentage.
/// Rank 1 is 0; the last rank of a population is 100.
#[must_use]
pub fn rank_percentile(rank: u64, population: u64) -> f64 {
    let denominator = population.saturating_sub(1).max(1);
    round2(rank.saturating_sub(1) as f64 * 100.0 / denominator as f64)
}

/// Milliseconds as a duration. Negative values, from clock skew between
/// publisher and answerer, count as zero.
#[must_use]
pub fn millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

/// Largest number of timestamps falling in any window of `window` length.
/// `times` must be ascending.
#[must_use]
pub fn peak_in_window(times: &[DateTime<Utc>], window: chrono::Duration) -> u64 {
    let mut peak = 0;
    let mut start = 0;
    for (end, at) in times.iter().enumerate() {
        while *at - times[start] >= window {
            start += 1;
        }
        peak = peak.max(end - start + 1);
    }
    peak as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn percentage_clamps_empty_denominator() {
        assert_eq!(percentage(4, 10), 40.0);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.33);
    }

    #[test]
    fn median_interpolates_even_counts() {
        assert_eq!(percentile(&[10, 20, 30, 40], 0.5), Some(25.0));
        assert_eq!(percentile(&[10, 20, 30], 0.5), Some(20.0));
        assert_eq!(percentile(&[7], 0.5), Some(7.0));
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn percentile_extremes_are_min_and_max() {
        let values = [1, 5, 9];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 1.0), Some(9.0));
    }

    #[test]
    fn rank_percentile_spans_population() {
        assert_eq!(rank_percentile(1, 5), 0.0);
        assert_eq!(rank_percentile(3, 5), 50.0);
        assert_eq!(rank_percentile(5, 5), 100.0);
        assert_eq!(rank_percentile(1, 1), 0.0);
    }

    #[test]
    fn negative_latency_is_zero() {
        assert_eq!(millis(-5.0), Duration::ZERO);
        assert_eq!(millis(1500.0), Duration::from_millis(1500));
    }

    #[test]
    fn peak_counts_densest_minute() {
        let t = |secs: i64| Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        let times = [t(0), t(10), t(50), t(70), t(200)];
        assert_eq!(peak_in_window(&times, chrono::Duration::minutes(1)), 3);
        assert_eq!(peak_in_window(&[], chrono::Duration::minutes(1)), 0);
    }
}
