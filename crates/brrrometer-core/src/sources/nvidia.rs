//! NvidiaSmiSource: GPU core utilization via `nvidia-smi`.
//!
//! Queries the driver's management tool for the `utilization.gpu` field of a
//! single device. The binary is resolved once when the source is opened; every
//! read is one short-lived query.

use std::path::PathBuf;
use std::time::Duration;

use super::helpers::{find_program, parse_percent_line, run_command};
use crate::error::DeviceReadError;
use crate::source::{Platform, SourceInfo, SourceKind, UtilizationSource, checked_percent};

const NVIDIA_SMI: &str = "nvidia-smi";

/// A query still running after this long is killed. Kept under the default
/// sampling interval.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(4);

static NVIDIA_SMI_INFO: SourceInfo = SourceInfo {
    name: "nvidia_smi",
    description: "NVIDIA GPU core utilization via nvidia-smi",
    kind: SourceKind::VendorTool,
    platform: Platform::Any,
};

/// Reads `utilization.gpu` for one NVIDIA device.
pub struct NvidiaSmiSource {
    program: Option<PathBuf>,
    index: u32,
    timeout: Duration,
}

impl NvidiaSmiSource {
    /// Resolve `nvidia-smi` from `PATH` for the device at `index`.
    pub fn new(index: u32) -> Self {
        Self {
            program: find_program(NVIDIA_SMI),
            index,
            timeout: QUERY_TIMEOUT,
        }
    }

    /// Use an explicit binary path (mainly for tests).
    pub fn with_program(program: impl Into<PathBuf>, index: u32) -> Self {
        Self {
            program: Some(program.into()),
            index,
            timeout: QUERY_TIMEOUT,
        }
    }

    /// Override the per-query kill deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn query_args(&self) -> [String; 4] {
        [
            "--query-gpu=utilization.gpu".to_string(),
            "--format=csv,noheader,nounits".to_string(),
            "-i".to_string(),
            self.index.to_string(),
        ]
    }
}

impl UtilizationSource for NvidiaSmiSource {
    fn info(&self) -> &SourceInfo {
        &NVIDIA_SMI_INFO
    }

    fn is_available(&self) -> bool {
        self.program.as_ref().is_some_and(|p| p.is_file())
    }

    fn read(&self) -> Result<f64, DeviceReadError> {
        let program = self
            .program
            .as_deref()
            .ok_or_else(|| DeviceReadError::Unavailable(format!("{NVIDIA_SMI} not found")))?;
        let args = self.query_args();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdout = run_command(program, &arg_refs, self.timeout)?;
        checked_percent(parse_percent_line(&stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nvidia_info() {
        let src = NvidiaSmiSource::with_program("/nonexistent/nvidia-smi", 0);
        assert_eq!(src.name(), "nvidia_smi");
        assert_eq!(src.info().kind, SourceKind::VendorTool);
    }

    #[test]
    fn query_targets_requested_index() {
        let src = NvidiaSmiSource::with_program("/nonexistent/nvidia-smi", 2);
        let args = src.query_args();
        assert_eq!(args[0], "--query-gpu=utilization.gpu");
        assert_eq!(args[3], "2");
    }

    #[test]
    fn query_deadline_fits_in_one_sample() {
        assert!(QUERY_TIMEOUT < crate::config::SAMPLE_INTERVAL);
        let src = NvidiaSmiSource::with_program("/nonexistent/nvidia-smi", 0)
            .with_timeout(Duration::from_millis(750));
        assert_eq!(src.timeout, Duration::from_millis(750));
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let src = NvidiaSmiSource::with_program("/nonexistent/nvidia-smi", 0);
        assert!(!src.is_available());
        assert!(src.read().is_err());
    }

    #[test]
    #[ignore] // Requires an NVIDIA GPU and driver
    fn nvidia_reads_real_device() {
        let src = NvidiaSmiSource::new(0);
        if src.is_available() {
            let value = src.read().unwrap();
            assert!((0.0..=100.0).contains(&value));
        }
    }
}
