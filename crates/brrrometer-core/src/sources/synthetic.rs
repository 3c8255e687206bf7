//! ScriptedSource: replays a fixed sequence of readings.
//!
//! Used to drive the sampler and aggregator without hardware. Each entry is
//! either a reading or a failure; the script cycles when exhausted.

use std::sync::Mutex;

use crate::error::DeviceReadError;
use crate::source::{Platform, SourceInfo, SourceKind, UtilizationSource, checked_percent};

static SCRIPTED_INFO: SourceInfo = SourceInfo {
    name: "scripted",
    description: "Replays a scripted sequence of utilization readings",
    kind: SourceKind::Synthetic,
    platform: Platform::Any,
};

/// A reading source backed by a cyclic script; `None` entries fail.
pub struct ScriptedSource {
    script: Vec<Option<f64>>,
    cursor: Mutex<usize>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Option<f64>>) -> Self {
        Self {
            script,
            cursor: Mutex::new(0),
        }
    }

    /// A source that always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![Some(value)])
    }

    /// A source that always fails.
    pub fn failing() -> Self {
        Self::new(vec![None])
    }
}

impl UtilizationSource for ScriptedSource {
    fn info(&self) -> &SourceInfo {
        &SCRIPTED_INFO
    }

    fn is_available(&self) -> bool {
        !self.script.is_empty()
    }

    fn read(&self) -> Result<f64, DeviceReadError> {
        if self.script.is_empty() {
            return Err(DeviceReadError::Unavailable("empty script".to_string()));
        }
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| DeviceReadError::Unavailable("script cursor poisoned".to_string()))?;
        let entry = self.script[*cursor % self.script.len()];
        *cursor += 1;
        match entry {
            Some(v) => checked_percent(v),
            None => Err(DeviceReadError::Unavailable("scripted failure".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_script() {
        let src = ScriptedSource::new(vec![Some(1.0), None, Some(50.0)]);
        assert_eq!(src.read().unwrap(), 1.0);
        assert!(src.read().is_err());
        assert_eq!(src.read().unwrap(), 50.0);
        assert_eq!(src.read().unwrap(), 1.0);
    }

    #[test]
    fn empty_script_is_unavailable() {
        let src = ScriptedSource::new(Vec::new());
        assert!(!src.is_available());
        assert!(src.read().is_err());
    }
}
