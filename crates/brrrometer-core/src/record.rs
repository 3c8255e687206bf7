//! Daily activity records and the minute-level merge.
//!
//! A flush reduces the buffered raw samples to a [`MinuteStats`]; the store
//! folds that into the day's [`DailyActivityRecord`] with [`DailyActivityRecord::merge`].
//! Averages are minutes-weighted across merges, never recomputed from raw samples.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Reduction of one flush window's active samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinuteStats {
    /// Active samples × sampling interval, in minutes.
    pub minutes: f64,
    /// Highest active sample, truncated to an integer percentage.
    pub peak: u8,
    /// Mean of the active samples.
    pub avg: f64,
}

impl MinuteStats {
    /// Reduce raw samples. Returns `None` when no sample exceeds `threshold`.
    pub fn reduce(samples: &[f64], threshold: f64, minutes_per_sample: f64) -> Option<Self> {
        let active: Vec<f64> = samples.iter().copied().filter(|&v| v > threshold).collect();
        if active.is_empty() {
            return None;
        }
        let max = active.iter().copied().fold(f64::MIN, f64::max);
        let avg = active.iter().sum::<f64>() / active.len() as f64;
        Some(Self {
            minutes: active.len() as f64 * minutes_per_sample,
            peak: max.clamp(0.0, 100.0) as u8,
            avg,
        })
    }
}

/// One persisted row: the activity of a single calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivityRecord {
    pub date: NaiveDate,
    pub active_minutes: f64,
    pub peak_utilization: u8,
    pub avg_utilization: f64,
    pub last_updated: DateTime<Utc>,
}

impl DailyActivityRecord {
    /// First record of a day, taken directly from a minute reduction.
    pub fn from_stats(date: NaiveDate, stats: &MinuteStats, now: DateTime<Utc>) -> Self {
        Self {
            date,
            active_minutes: stats.minutes,
            peak_utilization: stats.peak,
            avg_utilization: stats.avg,
            last_updated: now,
        }
    }

    /// Fold a minute reduction into this record.
    ///
    /// Minutes add, peak is the max, and the average is weighted by minutes.
    pub fn merge(&self, stats: &MinuteStats, now: DateTime<Utc>) -> Self {
        let total = self.active_minutes + stats.minutes;
        let avg = if total > 0.0 {
            (self.active_minutes * self.avg_utilization + stats.minutes * stats.avg) / total
        } else {
            stats.avg
        };
        Self {
            date: self.date,
            active_minutes: total,
            peak_utilization: self.peak_utilization.max(stats.peak),
            avg_utilization: avg,
            last_updated: now,
        }
    }

    /// Merge into `existing` if present, otherwise start a new record.
    pub fn merge_into(
        existing: Option<&Self>,
        date: NaiveDate,
        stats: &MinuteStats,
        now: DateTime<Utc>,
    ) -> Self {
        match existing {
            Some(record) => record.merge(stats, now),
            None => Self::from_stats(date, stats, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PER_SAMPLE: f64 = 5.0 / 60.0;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn stats(minutes: f64, peak: u8, avg: f64) -> MinuteStats {
        MinuteStats { minutes, peak, avg }
    }

    #[test]
    fn reduce_ignores_samples_at_or_below_threshold() {
        let samples = [0.0, 1.0, 0.5, 2.0, 40.0, 1.0];
        let s = MinuteStats::reduce(&samples, 1.0, PER_SAMPLE).unwrap();
        assert!((s.minutes - 2.0 * PER_SAMPLE).abs() < 1e-12);
        assert_eq!(s.peak, 40);
        assert!((s.avg - 21.0).abs() < 1e-12);
    }

    #[test]
    fn reduce_all_idle_is_none() {
        assert!(MinuteStats::reduce(&[0.0; 12], 1.0, PER_SAMPLE).is_none());
        assert!(MinuteStats::reduce(&[], 1.0, PER_SAMPLE).is_none());
    }

    #[test]
    fn full_minute_of_activity() {
        let s = MinuteStats::reduce(&[50.0; 12], 1.0, PER_SAMPLE).unwrap();
        assert!((s.minutes - 1.0).abs() < 1e-12);
        assert_eq!(s.peak, 50);
    }

    #[test]
    fn peak_truncates_fractional_readings() {
        let s = MinuteStats::reduce(&[99.9, 3.0], 1.0, PER_SAMPLE).unwrap();
        assert_eq!(s.peak, 99);
    }

    #[test]
    fn merge_two_reductions_into_empty_day() {
        let now = Utc::now();
        let first = DailyActivityRecord::merge_into(None, day(), &stats(0.5, 30, 20.0), now);
        let second = DailyActivityRecord::merge_into(Some(&first), day(), &stats(1.5, 80, 60.0), now);

        assert!((second.active_minutes - 2.0).abs() < 1e-12);
        assert_eq!(second.peak_utilization, 80);
        let expected = (0.5 * 20.0 + 1.5 * 60.0) / 2.0;
        assert!((second.avg_utilization - expected).abs() < 1e-9);
    }

    #[test]
    fn merge_grid_holds_weighted_mean_and_max() {
        let now = Utc::now();
        for &(m1, p1, a1) in &[(0.25, 10u8, 5.0), (1.0, 100, 100.0), (3.0, 2, 2.0)] {
            for &(m2, p2, a2) in &[(0.0833, 55u8, 55.0), (1.0, 1, 1.5), (10.0, 99, 70.0)] {
                let r = DailyActivityRecord::from_stats(day(), &stats(m1, p1, a1), now)
                    .merge(&stats(m2, p2, a2), now);
                assert!((r.active_minutes - (m1 + m2)).abs() < 1e-9);
                assert_eq!(r.peak_utilization, p1.max(p2));
                let want = (m1 * a1 + m2 * a2) / (m1 + m2);
                assert!((r.avg_utilization - want).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn minutes_never_decrease() {
        let now = Utc::now();
        let mut r = DailyActivityRecord::from_stats(day(), &stats(0.1, 5, 5.0), now);
        for i in 0..50 {
            let before = r.active_minutes;
            r = r.merge(&stats(f64::from(i % 3) * 0.25, 10, 10.0), now);
            assert!(r.active_minutes >= before);
        }
    }

    #[test]
    fn degenerate_zero_total_falls_back_to_new_average() {
        let now = Utc::now();
        let r = DailyActivityRecord::from_stats(day(), &stats(0.0, 0, 0.0), now)
            .merge(&stats(0.0, 7, 42.0), now);
        assert_eq!(r.avg_utilization, 42.0);
        assert_eq!(r.peak_utilization, 7);
    }
}
