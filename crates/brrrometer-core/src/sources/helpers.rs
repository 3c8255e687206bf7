//! Shared helpers used by multiple utilization source implementations.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::DeviceReadError;

// ---------------------------------------------------------------------------
// Shared command utilities
// ---------------------------------------------------------------------------

const COMMAND_POLL: Duration = Duration::from_millis(20);

/// Resolve a program name against `PATH`, returning the first executable match.
///
/// Names containing a path separator are checked as-is.
pub fn find_program(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|p| p.is_file())
}

/// Run a subprocess and return its stdout as a `String`.
///
/// A spawn failure or non-zero exit status becomes
/// [`DeviceReadError::Command`] carrying the program name and the reason.
/// A child still running at `timeout` is killed and reaped, and the call
/// returns [`DeviceReadError::Timeout`].
pub fn run_command(
    program: &Path,
    args: &[&str],
    timeout: Duration,
) -> Result<String, DeviceReadError> {
    let display = program.display().to_string();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DeviceReadError::Command {
            program: display.clone(),
            reason: e.to_string(),
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait()? {
            Some(_) => break,
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DeviceReadError::Timeout(timeout));
            }
            None => std::thread::sleep(COMMAND_POLL),
        }
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeviceReadError::Command {
            program: display,
            reason: format!("{} {}", output.status, stderr.trim()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse the first non-empty line of a tool's output as a percentage.
///
/// Accepts an optional trailing `%` and surrounding whitespace.
pub fn parse_percent_line(text: &str) -> Result<f64, DeviceReadError> {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| DeviceReadError::Parse(text.to_string()))?;
    let numeric = line.trim_end_matches('%').trim();
    numeric
        .parse::<f64>()
        .map_err(|_| DeviceReadError::Parse(line.to_string()))
}
