//! SVG rendering of a [`CalendarGrid`].
//!
//! Output is a pure function of `(records, today, theme)`: the same inputs
//! always produce byte-identical documents. When history cannot be loaded the
//! caller serves [`fallback_svg`], an empty canvas of the same size.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{Days, NaiveDate};

use crate::calendar::{CANVAS_HEIGHT, CANVAS_WIDTH, CELL_PITCH, CELL_SIZE, CalendarGrid};
use crate::error::RenderError;
use crate::store::ActivityStore;

/// Default history fetch window, in weeks.
pub const DEFAULT_WEEKS: u32 = 53;
/// Largest accepted fetch window, in weeks.
pub const MAX_WEEKS: u32 = 520;

const FONT_FAMILY: &str = "-apple-system, BlinkMacSystemFont, Segoe UI, Helvetica, Arial, sans-serif";
/// Vertical offset of the cell grid below the month labels.
const GRID_TOP: i64 = 20;
/// Month names sit a little right of their anchoring cell.
const MONTH_LABEL_NUDGE: i64 = 16;
const WEEKDAY_LABELS: [(&str, i64); 3] = [("M", 1), ("W", 3), ("F", 5)];

/// Color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Colors used by one theme.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    /// Fill per activity level 0..=4.
    pub levels: [&'static str; 5],
}

const LIGHT: Palette = Palette {
    background: "#ffffff",
    text: "#57606a",
    levels: ["#ebedf0", "#9be9a8", "#40c463", "#30a14e", "#216e39"],
};

const DARK: Palette = Palette {
    background: "#0d1117",
    text: "#7d8590",
    levels: ["#161b22", "#0e4429", "#006d32", "#26a641", "#39d353"],
};

impl Theme {
    /// Lenient query-parameter parsing; anything unrecognized is light.
    pub fn from_param(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("dark") {
            Self::Dark
        } else {
            Self::Light
        }
    }

    pub fn palette(self) -> &'static Palette {
        match self {
            Self::Light => &LIGHT,
            Self::Dark => &DARK,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Light => f.pad("light"),
            Self::Dark => f.pad("dark"),
        }
    }
}

/// Render the heatmap for `records` as seen on `today`.
pub fn render(records: &BTreeMap<NaiveDate, f64>, today: NaiveDate, theme: Theme) -> String {
    render_grid(&CalendarGrid::build(records, today), theme)
}

/// Serialize an already-built grid.
pub fn render_grid(grid: &CalendarGrid, theme: Theme) -> String {
    let palette = theme.palette();
    let mut svg = String::with_capacity(64 * 1024);

    let _ = writeln!(
        svg,
        r#"<svg width="{CANVAS_WIDTH}" height="{CANVAS_HEIGHT}" xmlns="http://www.w3.org/2000/svg">"#
    );
    let _ = writeln!(
        svg,
        r#"    <rect width="{CANVAS_WIDTH}" height="{CANVAS_HEIGHT}" fill="{}" rx="3"/>"#,
        palette.background
    );

    svg.push_str("    ");
    for month in &grid.months {
        let _ = write!(
            svg,
            r#"<text x="{}" y="10" fill="{}" font-size="10" font-family="{FONT_FAMILY}">{}</text>"#,
            month.x + MONTH_LABEL_NUDGE,
            palette.text,
            month.name
        );
    }
    svg.push('\n');

    let _ = writeln!(svg, r#"    <g transform="translate(0, {GRID_TOP})">"#);
    svg.push_str("        ");
    for (label, row) in WEEKDAY_LABELS {
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" fill="{}" font-size="10" font-family="{FONT_FAMILY}">{label}</text>"#,
            grid.x_offset - 10,
            row * CELL_PITCH + CELL_SIZE,
            palette.text
        );
    }
    svg.push('\n');

    svg.push_str("        ");
    for cell in &grid.cells {
        let _ = write!(
            svg,
            r#"<rect x="{}" y="{}" width="{CELL_SIZE}" height="{CELL_SIZE}" rx="2" fill="{}"><title>{}: {:.0} minutes of activity</title></rect>"#,
            cell.x,
            cell.y,
            palette.levels[usize::from(cell.level.min(4))],
            cell.date.format("%Y-%m-%d"),
            cell.minutes
        );
    }
    svg.push('\n');
    svg.push_str("    </g>\n");

    let _ = writeln!(
        svg,
        r#"    <text x="{}" y="{CANVAS_HEIGHT}" fill="{}" font-family="{FONT_FAMILY}" font-size="11">"#,
        grid.x_offset, palette.text
    );
    let _ = writeln!(
        svg,
        "        {} active days | {} day streak | {} total hours",
        grid.stats.active_days,
        grid.stats.streak,
        grid.stats.rounded_hours()
    );
    svg.push_str("    </text>\n</svg>");
    svg
}

/// Minimal valid graphic of the fixed canvas size.
pub fn fallback_svg(theme: Theme) -> String {
    format!(
        r#"<svg width="{CANVAS_WIDTH}" height="{CANVAS_HEIGHT}" xmlns="http://www.w3.org/2000/svg"><rect width="{CANVAS_WIDTH}" height="{CANVAS_HEIGHT}" fill="{}" rx="3"/></svg>"#,
        theme.palette().background
    )
}

/// Clamp a requested fetch window to `1..=MAX_WEEKS`.
pub fn clamp_weeks(weeks: u32) -> u32 {
    weeks.clamp(1, MAX_WEEKS)
}

/// First date fetched for a `weeks`-long window ending `today`.
pub fn fetch_start(today: NaiveDate, weeks: u32) -> Result<NaiveDate, RenderError> {
    let days = u64::from(clamp_weeks(weeks)) * 7;
    today
        .checked_sub_days(Days::new(days))
        .ok_or_else(|| RenderError::InvalidWindow(format!("{weeks} weeks before {today}")))
}

/// Load `weeks` of history from `store` and render it.
///
/// The fetch window only bounds which records feed the summary statistics;
/// the grid itself always spans the fixed 364-day window.
pub fn render_from_store(
    store: &dyn ActivityStore,
    today: NaiveDate,
    theme: Theme,
    weeks: u32,
) -> Result<String, RenderError> {
    let from = fetch_start(today, weeks)?;
    let records = store.minutes_between(from, today)?;
    Ok(render(&records, today, theme))
}
