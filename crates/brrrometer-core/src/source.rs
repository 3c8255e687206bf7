//! Abstract utilization source trait and its metadata.
//!
//! Every device backend implements the [`UtilizationSource`] trait, which
//! provides metadata via [`SourceInfo`], availability checking, and a single
//! instantaneous reading.

use crate::error::DeviceReadError;

/// How a source obtains its reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Vendor management tool queried as a subprocess.
    VendorTool,
    /// Kernel-exported counter file.
    Sysfs,
    /// In-process fixture (tests, demos).
    Synthetic,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VendorTool => f.pad("vendor_tool"),
            Self::Sysfs => f.pad("sysfs"),
            Self::Synthetic => f.pad("synthetic"),
        }
    }
}

/// Target platform for a utilization source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Works on any platform.
    Any,
    /// Requires Linux.
    Linux,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.pad("any"),
            Self::Linux => f.pad("linux"),
        }
    }
}

/// Metadata about a utilization source.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Unique identifier (e.g. `"nvidia_smi"`).
    pub name: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
    pub kind: SourceKind,
    pub platform: Platform,
}

/// Trait that every utilization source must implement.
///
/// Implementations hold whatever device handle they need for their whole
/// lifetime; dropping the source releases it.
pub trait UtilizationSource: Send + Sync {
    /// Source metadata.
    fn info(&self) -> &SourceInfo;

    /// Check if this source can operate on the current machine.
    fn is_available(&self) -> bool;

    /// Read the current utilization percentage, in `0.0..=100.0`.
    fn read(&self) -> Result<f64, DeviceReadError>;

    /// Convenience: name from info.
    fn name(&self) -> &'static str {
        self.info().name
    }
}

/// Validate a raw reading, rejecting NaN and values outside 0..=100.
pub fn checked_percent(value: f64) -> Result<f64, DeviceReadError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(DeviceReadError::OutOfRange(value))
    }
}
