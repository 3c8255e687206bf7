//! Retention: purges records that fell out of the trailing window.

use chrono::{Days, NaiveDate};
use log::info;

use crate::error::StoreError;
use crate::store::ActivityStore;

/// Oldest date kept when the reference date is `today`.
///
/// Records dated strictly before this are expired. Saturates at
/// [`NaiveDate::MIN`] rather than failing for absurd windows.
pub fn cutoff_date(today: NaiveDate, window_days: i64) -> NaiveDate {
    let days = Days::new(window_days.max(0).unsigned_abs());
    today.checked_sub_days(days).unwrap_or(NaiveDate::MIN)
}

/// Delete every record older than `today - window_days`; returns the count.
pub fn purge_expired(
    store: &dyn ActivityStore,
    today: NaiveDate,
    window_days: i64,
) -> Result<usize, StoreError> {
    let cutoff = cutoff_date(today, window_days);
    let deleted = store.delete_before(cutoff)?;
    if deleted > 0 {
        info!("Cleaned up {deleted} old entries (before {cutoff})");
    }
    Ok(deleted)
}
