//! Explicit configuration passed to component constructors.

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the activity database.
pub const DEFAULT_DB_PATH: &str = "/var/lib/gpu-brrrometer/activity.db";

/// A sample must exceed this utilization to count as active.
pub const ACTIVITY_THRESHOLD: f64 = 1.0;

/// Default sampling interval between device reads.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Default interval between buffer reductions.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Trailing window of days kept by retention.
pub const RETENTION_DAYS: i64 = 365;

/// Which device backend the collector reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    /// First available backend.
    #[default]
    Auto,
    Nvidia,
    Sysfs,
}

impl std::str::FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "nvidia" | "nvidia-smi" | "nvml" => Ok(Self::Nvidia),
            "sysfs" | "amdgpu" | "drm" => Ok(Self::Sysfs),
            other => Err(format!("unknown device kind '{other}'")),
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => f.pad("auto"),
            Self::Nvidia => f.pad("nvidia"),
            Self::Sysfs => f.pad("sysfs"),
        }
    }
}

/// Device selection.
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    pub kind: DeviceKind,
    /// Zero-based GPU / DRM card index.
    pub index: u32,
}

/// Configuration for the aggregation loop.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub db_path: PathBuf,
    pub sample_interval: Duration,
    pub flush_interval: Duration,
    pub activity_threshold: f64,
    pub retention_days: i64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            sample_interval: SAMPLE_INTERVAL,
            flush_interval: FLUSH_INTERVAL,
            activity_threshold: ACTIVITY_THRESHOLD,
            retention_days: RETENTION_DAYS,
        }
    }
}

impl CollectorConfig {
    /// Minutes of activity one active sample stands for.
    pub fn minutes_per_sample(&self) -> f64 {
        self.sample_interval.as_secs_f64() / 60.0
    }
}
