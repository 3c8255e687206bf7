//! Sampler: one bounded, infallible utilization reading.
//!
//! Wraps a [`UtilizationSource`] so that a read never fails and never blocks
//! longer than the configured timeout. Any [`DeviceReadError`] is logged and
//! degrades that one sample to `0.0`, which the activity threshold excludes.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use log::{debug, warn};

use crate::error::DeviceReadError;
use crate::source::UtilizationSource;

type Reading = Result<f64, DeviceReadError>;

/// Bounded reader in front of a utilization source.
///
/// At most one read is outstanding at a time: when a read outlives its
/// timeout, later samples return `0.0` without touching the device until it
/// finishes.
pub struct Sampler {
    source: Arc<dyn UtilizationSource>,
    timeout: Duration,
    failures: u64,
    pending: Option<mpsc::Receiver<Reading>>,
}

impl Sampler {
    /// `timeout` is normally the sampling interval.
    pub fn new(source: Arc<dyn UtilizationSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            failures: 0,
            pending: None,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Number of reads that degraded to `0.0` so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Whether a timed-out read is still running.
    pub fn is_read_pending(&mut self) -> bool {
        self.reap_pending();
        self.pending.is_some()
    }

    /// Read once; failures and timeouts yield `0.0`.
    pub fn sample(&mut self) -> f64 {
        match self.try_sample() {
            Ok(v) => v,
            Err(e) => {
                self.failures += 1;
                warn!("{}: {e}", self.source.name());
                0.0
            }
        }
    }

    /// Read once, surfacing the error instead of substituting `0.0`.
    pub fn try_sample(&mut self) -> Reading {
        if self.reap_pending() {
            return Err(DeviceReadError::Busy);
        }

        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        std::thread::Builder::new()
            .name("brrrometer-sample".to_string())
            .spawn(move || {
                let _ = tx.send(source.read());
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.pending = Some(rx);
                Err(DeviceReadError::Timeout(self.timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(DeviceReadError::Unavailable(
                "sampling thread exited without a reading".to_string(),
            )),
        }
    }

    /// Drop a late read once it has finished. Returns `true` while it is still running.
    fn reap_pending(&mut self) -> bool {
        let state = match &self.pending {
            Some(rx) => rx.try_recv(),
            None => return false,
        };
        match state {
            Err(mpsc::TryRecvError::Empty) => true,
            Ok(late) => {
                debug!("{}: discarded late reading {late:?}", self.source.name());
                self.pending = None;
                false
            }
            Err(mpsc::TryRecvError::Disconnected) => {
                self.pending = None;
                false
            }
        }
    }
}
