//! Aggregator: buffers raw samples and turns them into daily records.
//!
//! [`Aggregator`] is the pure state machine: it owns the sample buffer, the
//! time of the last flush and the calendar day last observed. Feeding it a
//! sample and a wall-clock time yields a [`FlushPlan`] whenever the flush
//! interval has elapsed. [`Collector`] is the driver that samples the device,
//! applies plans to an [`ActivityStore`], and runs retention on day rollover.
//!
//! Nothing on the loop path is fatal: store failures are logged and the plan
//! is dropped, device failures were already turned into `0.0` by the sampler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone, Utc};
use log::{debug, error, info};

use crate::config::CollectorConfig;
use crate::record::{DailyActivityRecord, MinuteStats};
use crate::retention;
use crate::sampler::Sampler;
use crate::store::ActivityStore;

/// Outcome of one flush: what to merge, and whether the day rolled over.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushPlan {
    /// Day the reduction is attributed to (the flush time's local date).
    pub day: NaiveDate,
    /// `None` when the window held no active sample.
    pub stats: Option<MinuteStats>,
    /// Samples that were in the buffer.
    pub samples: usize,
    /// New current day if the calendar day advanced since the previous flush.
    pub rollover: Option<NaiveDate>,
}

/// Sample buffer and flush timing.
///
/// Flush timing is measured between absolute instants, so a clock shift such
/// as the end of daylight saving time does not stall flushing. Day
/// attribution uses the date in the caller's time zone.
#[derive(Debug, Clone)]
pub struct Aggregator {
    buffer: Vec<f64>,
    last_flush: DateTime<Utc>,
    current_day: NaiveDate,
    flush_interval: TimeDelta,
    threshold: f64,
    minutes_per_sample: f64,
}

impl Aggregator {
    pub fn new<Tz: TimeZone>(config: &CollectorConfig, now: DateTime<Tz>) -> Self {
        let flush_interval =
            TimeDelta::from_std(config.flush_interval).unwrap_or_else(|_| TimeDelta::seconds(60));
        Self {
            buffer: Vec::new(),
            last_flush: now.with_timezone(&Utc),
            current_day: now.date_naive(),
            flush_interval,
            threshold: config.activity_threshold,
            minutes_per_sample: config.minutes_per_sample(),
        }
    }

    pub fn buffered(&self) -> &[f64] {
        &self.buffer
    }

    pub fn current_day(&self) -> NaiveDate {
        self.current_day
    }

    pub fn is_flush_due<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        now.with_timezone(&Utc) - self.last_flush >= self.flush_interval
    }

    /// Append a sample, then flush if the interval has elapsed.
    pub fn observe<Tz: TimeZone>(&mut self, sample: f64, now: DateTime<Tz>) -> Option<FlushPlan> {
        self.buffer.push(sample);
        if self.is_flush_due(&now) {
            Some(self.flush(now))
        } else {
            None
        }
    }

    /// Reduce and clear the buffer unconditionally.
    pub fn flush<Tz: TimeZone>(&mut self, now: DateTime<Tz>) -> FlushPlan {
        let samples = self.buffer.len();
        let stats = MinuteStats::reduce(&self.buffer, self.threshold, self.minutes_per_sample);
        self.buffer.clear();
        self.last_flush = now.with_timezone(&Utc);

        let today = now.date_naive();
        let rollover = (today != self.current_day).then_some(today);
        self.current_day = today;

        FlushPlan {
            day: today,
            stats,
            samples,
            rollover,
        }
    }
}

/// What applying a plan actually did.
#[derive(Debug, Default)]
pub struct FlushReport {
    pub merged: Option<DailyActivityRecord>,
    pub purged: Option<usize>,
    /// Store operations that failed and were skipped.
    pub failures: usize,
}

/// Apply a flush plan to the store: merge, then retention on rollover.
///
/// Errors are logged and counted, never returned.
pub fn apply_plan(
    plan: &FlushPlan,
    store: &dyn ActivityStore,
    retention_days: i64,
    now: DateTime<Utc>,
) -> FlushReport {
    let mut report = FlushReport::default();

    match &plan.stats {
        Some(stats) => match store.merge_day(plan.day, stats, now) {
            Ok(record) => {
                info!(
                    "Updated {}: +{:.1} minutes (total: {:.1})",
                    plan.day, stats.minutes, record.active_minutes
                );
                report.merged = Some(record);
            }
            Err(e) => {
                error!("Failed to update {}: {e}", plan.day);
                report.failures += 1;
            }
        },
        None => debug!("No activity in last {} samples", plan.samples),
    }

    if let Some(day) = plan.rollover {
        match retention::purge_expired(store, day, retention_days) {
            Ok(n) => report.purged = Some(n),
            Err(e) => {
                error!("Retention failed for {day}: {e}");
                report.failures += 1;
            }
        }
    }

    report
}

/// Drives sampling, aggregation and persistence.
pub struct Collector {
    aggregator: Aggregator,
    sampler: Sampler,
    store: Arc<dyn ActivityStore>,
    config: CollectorConfig,
}

impl Collector {
    pub fn new(
        config: CollectorConfig,
        sampler: Sampler,
        store: Arc<dyn ActivityStore>,
        now: DateTime<Local>,
    ) -> Self {
        Self {
            aggregator: Aggregator::new(&config, now),
            sampler,
            store,
            config,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// One loop iteration at wall-clock `now`: sample, buffer, maybe flush.
    pub fn tick(&mut self, now: DateTime<Local>) -> Option<FlushReport> {
        let sample = self.sampler.sample();
        let plan = self.aggregator.observe(sample, now)?;
        Some(apply_plan(
            &plan,
            self.store.as_ref(),
            self.config.retention_days,
            now.with_timezone(&Utc),
        ))
    }

    /// Run until `running` is cleared, one tick per sampling interval.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            "GPU activity collector started (source: {}, every {:?}, flush {:?})",
            self.sampler.source_name(),
            self.config.sample_interval,
            self.config.flush_interval
        );
        while running.load(Ordering::SeqCst) {
            let deadline = Instant::now() + self.config.sample_interval;
            self.tick(Local::now());
            while Instant::now() < deadline && running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(100));
            }
        }
        info!(
            "GPU activity collector stopped ({} device read failures)",
            self.sampler.failures()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::sources::ScriptedSource;
    use crate::store::SqliteStore;
    use chrono::{FixedOffset, NaiveDate};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn feed(agg: &mut Aggregator, start: DateTime<Utc>, values: &[f64]) -> Vec<FlushPlan> {
        values
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| agg.observe(v, start + TimeDelta::seconds(5 * (i as i64 + 1))))
            .collect()
    }

    #[test]
    fn flushes_every_minute() {
        let start = at(2024, 4, 1, 10, 0, 0);
        let mut agg = Aggregator::new(&CollectorConfig::default(), start);
        let plans = feed(&mut agg, start, &[50.0; 24]);

        assert_eq!(plans.len(), 2);
        for plan in &plans {
            assert_eq!(plan.samples, 12);
            let stats = plan.stats.unwrap();
            assert!((stats.minutes - 1.0).abs() < 1e-12);
            assert_eq!(stats.peak, 50);
            assert!(plan.rollover.is_none());
        }
        assert!(agg.buffered().is_empty());
    }

    #[test]
    fn idle_window_clears_buffer_without_stats() {
        let start = at(2024, 4, 1, 10, 0, 0);
        let mut agg = Aggregator::new(&CollectorConfig::default(), start);
        let plans = feed(&mut agg, start, &[0.0, 1.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(plans.len(), 1);
        assert!(plans[0].stats.is_none());
        assert!(agg.buffered().is_empty());
    }

    #[test]
    fn late_loop_flushes_fewer_samples() {
        let start = at(2024, 4, 1, 10, 0, 0);
        let mut agg = Aggregator::new(&CollectorConfig::default(), start);
        assert!(agg.observe(30.0, start + TimeDelta::seconds(20)).is_none());
        let plan = agg.observe(30.0, start + TimeDelta::seconds(61)).unwrap();
        assert_eq!(plan.samples, 2);
        assert!((plan.stats.unwrap().minutes - 10.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn rollover_detected_once() {
        let start = at(2024, 4, 1, 23, 59, 30);
        let mut agg = Aggregator::new(&CollectorConfig::default(), start);
        agg.observe(10.0, at(2024, 4, 1, 23, 59, 50));
        let plan = agg.observe(10.0, at(2024, 4, 2, 0, 0, 31)).unwrap();
        assert_eq!(plan.rollover, Some(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()));
        assert_eq!(plan.day, NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
        assert_eq!(agg.current_day(), NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());

        let next = agg.observe(10.0, at(2024, 4, 2, 0, 1, 31)).unwrap();
        assert!(next.rollover.is_none());
    }

    #[test]
    fn wall_clock_falling_back_keeps_flushing() {
        // 2024-11-03 01:59:30 EDT, then 60 s later the clock reads 01:00:30 EST.
        let edt = FixedOffset::west_opt(4 * 3600).unwrap();
        let est = FixedOffset::west_opt(5 * 3600).unwrap();
        let before = edt.with_ymd_and_hms(2024, 11, 3, 1, 59, 30).unwrap();
        let after = est.with_ymd_and_hms(2024, 11, 3, 1, 0, 30).unwrap();
        assert!(after.naive_local() < before.naive_local());

        let mut agg = Aggregator::new(&CollectorConfig::default(), before);
        assert!(agg.observe(40.0, est.with_ymd_and_hms(2024, 11, 3, 1, 0, 0).unwrap()).is_none());
        let plan = agg.observe(40.0, after).unwrap();
        assert_eq!(plan.samples, 2);
        assert!(plan.rollover.is_none());
        assert_eq!(plan.day, NaiveDate::from_ymd_opt(2024, 11, 3).unwrap());
    }

    #[test]
    fn apply_plan_merges_and_purges() {
        let store = SqliteStore::open_in_memory().unwrap();
        let old = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let stats = MinuteStats {
            minutes: 1.0,
            peak: 10,
            avg: 10.0,
        };
        store.merge_day(old, &stats, Utc::now()).unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let plan = FlushPlan {
            day,
            stats: Some(stats),
            samples: 12,
            rollover: Some(day),
        };
        let report = apply_plan(&plan, &store, 365, Utc::now());
        assert_eq!(report.failures, 0);
        assert_eq!(report.purged, Some(1));
        assert_eq!(report.merged.unwrap().date, day);
        assert!(store.get(old).unwrap().is_none());
    }

    struct BrokenStore;

    impl ActivityStore for BrokenStore {
        fn merge_day(
            &self,
            _: NaiveDate,
            _: &MinuteStats,
            _: DateTime<Utc>,
        ) -> Result<DailyActivityRecord, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
        fn get(&self, _: NaiveDate) -> Result<Option<DailyActivityRecord>, StoreError> {
            Ok(None)
        }
        fn range(
            &self,
            _: NaiveDate,
            _: NaiveDate,
        ) -> Result<Vec<DailyActivityRecord>, StoreError> {
            Ok(Vec::new())
        }
        fn delete_before(&self, _: NaiveDate) -> Result<usize, StoreError> {
            Err(StoreError::Io(std::io::Error::other("read-only")))
        }
        fn all_desc(&self) -> Result<Vec<DailyActivityRecord>, StoreError> {
            Ok(Vec::new())
        }
        fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn store_failures_are_absorbed() {
        let day = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let plan = FlushPlan {
            day,
            stats: Some(MinuteStats {
                minutes: 1.0,
                peak: 10,
                avg: 10.0,
            }),
            samples: 12,
            rollover: Some(day),
        };
        let report = apply_plan(&plan, &BrokenStore, 365, Utc::now());
        assert_eq!(report.failures, 2);
        assert!(report.merged.is_none());
        assert!(report.purged.is_none());
    }

    #[test]
    fn collector_ticks_into_store() {
        let store: Arc<SqliteStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let config = CollectorConfig::default();
        let sampler = Sampler::new(
            Arc::new(ScriptedSource::new(vec![Some(80.0), None, Some(0.0), Some(20.0)])),
            Duration::from_secs(1),
        );
        let start = Local.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let mut collector = Collector::new(config, sampler, store.clone(), start);

        let mut reports = Vec::new();
        for i in 1..=12 {
            if let Some(r) = collector.tick(start + TimeDelta::seconds(5 * i)) {
                reports.push(r);
            }
        }
        assert_eq!(reports.len(), 1);

        // 12 samples cycle the script 3 times: 80 and 20 are active, the
        // failure and the 0 are not.
        let rec = store.get(start.date_naive()).unwrap().unwrap();
        assert!((rec.active_minutes - 6.0 * 5.0 / 60.0).abs() < 1e-9);
        assert_eq!(rec.peak_utilization, 80);
        assert!((rec.avg_utilization - 50.0).abs() < 1e-9);
    }

    #[test]
    fn run_returns_when_stopped() {
        let store: Arc<SqliteStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let sampler = Sampler::new(Arc::new(ScriptedSource::constant(5.0)), Duration::from_secs(1));
        let mut collector = Collector::new(CollectorConfig::default(), sampler, store, Local::now());
        let running = AtomicBool::new(false);
        collector.run(&running);
        assert!(collector.aggregator().buffered().is_empty());
    }
}
