//! Per-day record store.
//!
//! [`ActivityStore`] is the seam the collector and the renderer depend on: an
//! atomic merge-by-date, range scans, and delete-by-cutoff. [`SqliteStore`] is
//! the production implementation, one row per calendar date.
//!
//! # Thread Safety
//!
//! `rusqlite::Connection` is `Send` but not `Sync`, so [`SqliteStore`] guards it
//! with a `Mutex`. The collector and the server normally run as separate
//! processes against the same file; WAL mode lets the server read while the
//! collector writes, and each merge runs in its own immediate transaction.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use crate::error::StoreError;
use crate::record::{DailyActivityRecord, MinuteStats};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS gpu_activity (
        date TEXT PRIMARY KEY,
        minutes REAL NOT NULL DEFAULT 0,
        peak_utilization INTEGER NOT NULL DEFAULT 0,
        avg_utilization REAL NOT NULL DEFAULT 0,
        last_updated TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_date ON gpu_activity(date DESC);
";

const SELECT_COLUMNS: &str =
    "SELECT date, minutes, peak_utilization, avg_utilization, last_updated FROM gpu_activity";

/// Storage operations required by the collector and the query path.
pub trait ActivityStore: Send + Sync {
    /// Atomically fold `stats` into the record for `date`, creating it if absent.
    fn merge_day(
        &self,
        date: NaiveDate,
        stats: &MinuteStats,
        now: DateTime<Utc>,
    ) -> Result<DailyActivityRecord, StoreError>;

    fn get(&self, date: NaiveDate) -> Result<Option<DailyActivityRecord>, StoreError>;

    /// Records with `from <= date <= to`, ascending by date.
    fn range(&self, from: NaiveDate, to: NaiveDate)
    -> Result<Vec<DailyActivityRecord>, StoreError>;

    /// Delete every record dated strictly before `cutoff`; returns the count.
    fn delete_before(&self, cutoff: NaiveDate) -> Result<usize, StoreError>;

    /// Every record, newest first.
    fn all_desc(&self) -> Result<Vec<DailyActivityRecord>, StoreError>;

    /// Cheap liveness probe.
    fn ping(&self) -> Result<(), StoreError>;

    /// Active minutes per date for `from..=to`.
    fn minutes_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>, StoreError> {
        Ok(self
            .range(from, to)?
            .into_iter()
            .map(|r| (r.date, r.active_minutes))
            .collect())
    }
}

/// SQLite-backed [`ActivityStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        Self::init(conn)
    }

    /// In-memory database, destroyed with the store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fetch(conn: &Connection, date: NaiveDate) -> Result<Option<DailyActivityRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE date = ?1");
        let raw = conn
            .query_row(&sql, params![date], RawRow::from_row)
            .optional()?;
        raw.map(RawRow::into_record).transpose()
    }

    fn collect(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<DailyActivityRecord>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, RawRow::from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_record()?);
        }
        Ok(out)
    }
}

impl ActivityStore for SqliteStore {
    fn merge_day(
        &self,
        date: NaiveDate,
        stats: &MinuteStats,
        now: DateTime<Utc>,
    ) -> Result<DailyActivityRecord, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing = Self::fetch(&tx, date)?;
        let record = DailyActivityRecord::merge_into(existing.as_ref(), date, stats, now);
        tx.execute(
            "INSERT INTO gpu_activity (date, minutes, peak_utilization, avg_utilization, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(date) DO UPDATE SET
                 minutes = excluded.minutes,
                 peak_utilization = excluded.peak_utilization,
                 avg_utilization = excluded.avg_utilization,
                 last_updated = excluded.last_updated",
            params![
                record.date,
                record.active_minutes,
                i64::from(record.peak_utilization),
                record.avg_utilization,
                record.last_updated,
            ],
        )?;
        tx.commit()?;
        Ok(record)
    }

    fn get(&self, date: NaiveDate) -> Result<Option<DailyActivityRecord>, StoreError> {
        Self::fetch(&self.lock(), date)
    }

    fn range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyActivityRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE date >= ?1 AND date <= ?2 ORDER BY date");
        Self::collect(&self.lock(), &sql, params![from, to])
    }

    fn delete_before(&self, cutoff: NaiveDate) -> Result<usize, StoreError> {
        let deleted = self
            .lock()
            .execute("DELETE FROM gpu_activity WHERE date < ?1", params![cutoff])?;
        Ok(deleted)
    }

    fn all_desc(&self) -> Result<Vec<DailyActivityRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY date DESC");
        Self::collect(&self.lock(), &sql, [])
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.lock().query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

/// Column values as stored, before invariant checks.
struct RawRow {
    date: NaiveDate,
    minutes: f64,
    peak: i64,
    avg: f64,
    last_updated: DateTime<Utc>,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date: row.get(0)?,
            minutes: row.get(1)?,
            peak: row.get(2)?,
            avg: row.get(3)?,
            last_updated: row.get(4)?,
        })
    }

    fn into_record(self) -> Result<DailyActivityRecord, StoreError> {
        let corrupt = |reason: String| StoreError::CorruptRow {
            date: self.date.to_string(),
            reason,
        };
        if !(self.minutes >= 0.0) {
            return Err(corrupt(format!("active minutes {}", self.minutes)));
        }
        let peak = u8::try_from(self.peak)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| corrupt(format!("peak utilization {}", self.peak)))?;
        Ok(DailyActivityRecord {
            date: self.date,
            active_minutes: self.minutes,
            peak_utilization: peak,
            avg_utilization: self.avg,
            last_updated: self.last_updated,
        })
    }
}
