//! Utilization source implementations.

pub mod helpers;

pub mod nvidia;
pub mod synthetic;
pub mod sysfs;

use crate::config::{DeviceConfig, DeviceKind};
use crate::source::UtilizationSource;

pub use nvidia::NvidiaSmiSource;
pub use synthetic::ScriptedSource;
pub use sysfs::SysfsBusySource;

/// All hardware source constructors for device `index`, in preference order.
pub fn all_sources(index: u32) -> Vec<Box<dyn UtilizationSource>> {
    vec![
        Box::new(NvidiaSmiSource::new(index)),
        Box::new(SysfsBusySource::new(index)),
    ]
}

/// Open the source selected by `config`, or `None` if it is not usable here.
///
/// [`DeviceKind::Auto`] picks the first available entry of [`all_sources`].
pub fn detect_source(config: &DeviceConfig) -> Option<Box<dyn UtilizationSource>> {
    let candidates: Vec<Box<dyn UtilizationSource>> = match config.kind {
        DeviceKind::Auto => all_sources(config.index),
        DeviceKind::Nvidia => vec![Box::new(NvidiaSmiSource::new(config.index))],
        DeviceKind::Sysfs => vec![Box::new(SysfsBusySource::new(config.index))],
    };
    candidates.into_iter().find(|s| s.is_available())
}
