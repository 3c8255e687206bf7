//! Error taxonomy for the sampling, storage and rendering paths.
//!
//! Each error type maps to one recovery boundary:
//! - [`DeviceReadError`] is absorbed by the [`Sampler`](crate::sampler::Sampler),
//!   which substitutes a `0` reading.
//! - [`StoreError`] is logged by the collector loop; the flush is dropped.
//! - [`RenderError`] is absorbed by the query service, which serves the
//!   fallback graphic.

use std::time::Duration;

use thiserror::Error;

/// Failure to read an instantaneous utilization value from the device.
#[derive(Debug, Error)]
pub enum DeviceReadError {
    /// No usable device was found, or the source is not available here.
    #[error("device unavailable: {0}")]
    Unavailable(String),
    /// A helper program could not be run or exited unsuccessfully.
    #[error("{program} failed: {reason}")]
    Command { program: String, reason: String },
    /// The device answered with something that is not a number.
    #[error("unparseable utilization reading: {0:?}")]
    Parse(String),
    /// The device answered with a number outside 0..=100.
    #[error("utilization reading out of range: {0}")]
    OutOfRange(f64),
    /// The read did not complete within the polling interval.
    #[error("device read timed out after {0:?}")]
    Timeout(Duration),
    /// An earlier read is still outstanding; no new read was started.
    #[error("previous device read still in progress")]
    Busy,
    #[error("device i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of the per-day record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// A persisted row violates the record invariants.
    #[error("corrupt row for {date}: {reason}")]
    CorruptRow { date: String, reason: String },
}

/// Failure while producing a calendar graphic.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not load activity history: {0}")]
    Store(#[from] StoreError),
    /// The requested fetch window cannot be represented as calendar dates.
    #[error("invalid history window: {0}")]
    InvalidWindow(String),
}
