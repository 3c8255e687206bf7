pub mod collect;
pub mod dry_run;
pub mod server;
pub mod show_db;
pub mod sources;

use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use brrrometer_core::SqliteStore;

/// Log `msg` and exit with a failure status.
pub fn fatal(msg: impl Display) -> ! {
    log::error!("{msg}");
    std::process::exit(1);
}

/// Open the activity database, exiting if it cannot be opened.
pub fn open_store(path: &Path) -> SqliteStore {
    SqliteStore::open(path)
        .unwrap_or_else(|e| fatal(format!("Cannot open database {}: {e}", path.display())))
}

/// Parse a duration string like "5m", "30s", "1h", "100ms". Bare numbers are seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (numeric, multiplier) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 1u64)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1000)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60_000)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 3_600_000)
    } else {
        (s, 1000)
    };

    let value: u64 = numeric
        .trim()
        .parse()
        .map_err(|_| format!("Invalid duration: {s}"))?;
    let millis = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Duration too large: {s}"))?;
    if millis == 0 {
        return Err(format!("Duration must be positive: {s}"));
    }
    Ok(Duration::from_millis(millis))
}
