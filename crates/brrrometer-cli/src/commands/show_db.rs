use std::fmt::Write;
use std::path::Path;

use brrrometer_core::{ActivityStore, DailyActivityRecord};

pub fn run(db_path: &Path) {
    let store = super::open_store(db_path);
    let records = store
        .all_desc()
        .unwrap_or_else(|e| super::fatal(format!("Cannot read database: {e}")));
    print!("{}", format_dump(&records));
}

/// Aligned table of `records`, in the order given.
fn format_dump(records: &[DailyActivityRecord]) -> String {
    if records.is_empty() {
        return "Database is empty\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "GPU Activity Database Contents:");
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(
        out,
        "{:<12} {:<15} {:<10} {:<10} {:<20}",
        "Date", "Minutes", "Peak %", "Avg %", "Last Updated"
    );
    let _ = writeln!(out, "{}", "-".repeat(80));
    for r in records {
        let _ = writeln!(
            out,
            "{:<12} {:<15.1} {:<10} {:<10.1} {:<20}",
            r.date.format("%Y-%m-%d").to_string(),
            r.active_minutes,
            r.peak_utilization,
            r.avg_utilization,
            r.last_updated.format("%Y-%m-%d %H:%M:%S").to_string()
        );
    }
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(out, "Total records: {}", records.len());
    out
}
