//! Calendar grid layout: the 7 × N week matrix behind the heatmap.
//!
//! # Layout
//!
//! - The grid covers `today - 364 days` through `today`, with the start moved
//!   back to the Sunday on or before it, so every column is a full
//!   Sunday-to-Saturday week except possibly the last.
//! - Row = weekday with Sunday = 0 … Saturday = 6.
//! - Column = whole weeks since the grid start.
//! - `week_count` spans every cell column plus one leading column that holds
//!   the weekday labels; the grid is centered on the canvas with
//!   `x_offset = (760 - week_count * 13) / 2` and a cell sits at
//!   `x_offset + (column + 1) * 13`.
//!
//! Absent dates count as zero minutes.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Days, NaiveDate};

/// Canvas width in SVG units.
pub const CANVAS_WIDTH: i64 = 760;
/// Canvas height in SVG units.
pub const CANVAS_HEIGHT: i64 = 130;
/// Distance between neighbouring cells (cell + gutter).
pub const CELL_PITCH: i64 = 13;
/// Visible cell edge.
pub const CELL_SIZE: i64 = 11;
/// Days before `today` covered by the grid (before Sunday alignment).
pub const WINDOW_DAYS: u64 = 364;

/// Upper bounds (inclusive) of active minutes for levels 1, 2 and 3.
const LEVEL_BOUNDS: [f64; 3] = [60.0, 180.0, 360.0];

/// Discrete activity level 0..=4 for a day's active minutes.
pub fn activity_level(minutes: f64) -> u8 {
    if !(minutes > 0.0) {
        return 0;
    }
    LEVEL_BOUNDS
        .iter()
        .position(|&bound| minutes <= bound)
        .map_or(4, |i| i as u8 + 1)
}

/// Weekday row: Sunday = 0 … Saturday = 6.
pub fn weekday_row(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

/// First date of the grid: `today - 364 days`, moved back to a Sunday.
pub fn grid_start(today: NaiveDate) -> NaiveDate {
    let raw = today
        .checked_sub_days(Days::new(WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN);
    raw.checked_sub_days(Days::new(u64::from(weekday_row(raw))))
        .unwrap_or(raw)
}

/// One day square.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub minutes: f64,
    pub level: u8,
    pub row: u32,
    pub column: u32,
    /// Left edge on the canvas.
    pub x: i64,
    /// Top edge relative to the grid group.
    pub y: i64,
}

/// Month name anchored above the first week of that month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthLabel {
    pub year: i32,
    pub month: u32,
    /// Abbreviated English name (`"Jan"`).
    pub name: String,
    /// x of the anchoring cell.
    pub x: i64,
}

/// Footer statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryStats {
    /// Dates with more than zero active minutes.
    pub active_days: usize,
    /// Consecutive active days ending today.
    pub streak: usize,
    pub total_hours: f64,
}

impl SummaryStats {
    /// Compute footer statistics.
    ///
    /// `active_days` and `total_hours` cover every record passed in; the streak
    /// walks back from `today` and never goes past `start`.
    pub fn compute(records: &BTreeMap<NaiveDate, f64>, today: NaiveDate, start: NaiveDate) -> Self {
        let active_days = records.values().filter(|&&m| m > 0.0).count();
        let total_hours = records.values().sum::<f64>() / 60.0;

        let mut streak = 0;
        let mut day = today;
        while day >= start && minutes_on(records, day) > 0.0 {
            streak += 1;
            match day.pred_opt() {
                Some(prev) => day = prev,
                None => break,
            }
        }

        Self {
            active_days,
            streak,
            total_hours,
        }
    }

    /// Total hours rounded to the nearest whole hour.
    pub fn rounded_hours(&self) -> i64 {
        self.total_hours.round() as i64
    }
}

fn minutes_on(records: &BTreeMap<NaiveDate, f64>, date: NaiveDate) -> f64 {
    records.get(&date).copied().unwrap_or(0.0)
}

/// Derived, read-only projection of the history for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarGrid {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub week_count: i64,
    pub x_offset: i64,
    /// One cell per date from `start` to `end`, chronological.
    pub cells: Vec<DayCell>,
    /// Chronological month anchors.
    pub months: Vec<MonthLabel>,
    pub stats: SummaryStats,
}

impl CalendarGrid {
    pub fn build(records: &BTreeMap<NaiveDate, f64>, today: NaiveDate) -> Self {
        let start = grid_start(today);
        let last_column = (today - start).num_days().max(0) / 7;
        let week_count = last_column + 2;
        let x_offset = (CANVAS_WIDTH - week_count * CELL_PITCH).div_euclid(2);

        let mut cells = Vec::new();
        let mut months = Vec::new();
        let mut seen_months = HashSet::new();

        for date in start.iter_days().take_while(|d| *d <= today) {
            let column = (date - start).num_days() / 7;
            let row = weekday_row(date);
            let minutes = minutes_on(records, date);
            let x = x_offset + (column + 1) * CELL_PITCH;

            if date.day() <= 7 && seen_months.insert((date.year(), date.month())) {
                months.push(MonthLabel {
                    year: date.year(),
                    month: date.month(),
                    name: date.format("%b").to_string(),
                    x,
                });
            }

            cells.push(DayCell {
                date,
                minutes,
                level: activity_level(minutes),
                row,
                column: column as u32,
                x,
                y: i64::from(row) * CELL_PITCH,
            });
        }

        Self {
            start,
            end: today,
            week_count,
            x_offset,
            cells,
            months,
            stats: SummaryStats::compute(records, today, start),
        }
    }
}
