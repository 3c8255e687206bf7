//! SysfsBusySource: GPU busy percentage from the DRM sysfs interface.
//!
//! amdgpu (and some other DRM drivers) export `gpu_busy_percent` under
//! `/sys/class/drm/card<N>/device/`. The file is opened once and re-read from
//! offset 0 on every sample; the handle is closed when the source is dropped.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::helpers::parse_percent_line;
use crate::error::DeviceReadError;
use crate::source::{Platform, SourceInfo, SourceKind, UtilizationSource, checked_percent};

static SYSFS_BUSY_INFO: SourceInfo = SourceInfo {
    name: "sysfs_gpu_busy",
    description: "DRM gpu_busy_percent counter (amdgpu and compatible drivers)",
    kind: SourceKind::Sysfs,
    platform: Platform::Linux,
};

/// Path of the busy counter for DRM card `index`.
pub fn busy_percent_path(index: u32) -> PathBuf {
    PathBuf::from(format!("/sys/class/drm/card{index}/device/gpu_busy_percent"))
}

/// Reads a kernel busy-percent counter through a held file handle.
pub struct SysfsBusySource {
    path: PathBuf,
    handle: Option<Mutex<File>>,
}

impl SysfsBusySource {
    /// Open the busy counter for DRM card `index`.
    pub fn new(index: u32) -> Self {
        Self::open(busy_percent_path(index))
    }

    /// Open an arbitrary counter file. A missing file yields an unavailable source.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let handle = File::open(&path).ok().map(Mutex::new);
        Self { path, handle }
    }
}

impl UtilizationSource for SysfsBusySource {
    fn info(&self) -> &SourceInfo {
        &SYSFS_BUSY_INFO
    }

    fn is_available(&self) -> bool {
        self.handle.is_some()
    }

    fn read(&self) -> Result<f64, DeviceReadError> {
        let handle = self.handle.as_ref().ok_or_else(|| {
            DeviceReadError::Unavailable(format!("{} could not be opened", self.path.display()))
        })?;
        let mut file = handle
            .lock()
            .map_err(|_| DeviceReadError::Unavailable("sysfs handle poisoned".to_string()))?;
        file.seek(SeekFrom::Start(0))?;
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        checked_percent(parse_percent_line(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sysfs_info() {
        let src = SysfsBusySource::open("/nonexistent/gpu_busy_percent");
        assert_eq!(src.name(), "sysfs_gpu_busy");
        assert_eq!(src.info().platform, Platform::Linux);
    }

    #[test]
    fn card_path_layout() {
        assert_eq!(
            busy_percent_path(1),
            PathBuf::from("/sys/class/drm/card1/device/gpu_busy_percent")
        );
    }

    #[test]
    fn missing_counter_is_unavailable() {
        let src = SysfsBusySource::open("/nonexistent/gpu_busy_percent");
        assert!(!src.is_available());
        assert!(matches!(src.read(), Err(DeviceReadError::Unavailable(_))));
    }

    #[test]
    fn rereads_through_same_handle() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "12").unwrap();
        let src = SysfsBusySource::open(tmp.path());
        assert!(src.is_available());
        assert_eq!(src.read().unwrap(), 12.0);

        // Overwrite in place; the held handle sees the new value.
        let mut f = std::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(tmp.path())
            .unwrap();
        writeln!(f, "88").unwrap();
        assert_eq!(src.read().unwrap(), 88.0);
    }

    #[test]
    fn out_of_range_counter_is_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "250").unwrap();
        let src = SysfsBusySource::open(tmp.path());
        assert!(matches!(src.read(), Err(DeviceReadError::OutOfRange(_))));
    }
}
