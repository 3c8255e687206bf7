//! # brrrometer-core
//!
//! **How hard did your GPU work today?**
//!
//! `brrrometer-core` samples a GPU's utilization, folds the samples into one
//! activity record per calendar day, keeps a rolling year of history, and
//! renders that history as a contribution-style calendar heatmap.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use brrrometer_core::{Theme, render};
//! use chrono::NaiveDate;
//!
//! let today = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
//! let history: BTreeMap<NaiveDate, f64> = [(today, 95.0)].into_iter().collect();
//! let svg = render(&history, today, Theme::Dark);
//! assert!(svg.starts_with("<svg"));
//! ```
//!
//! ## Architecture
//!
//! Source → Sampler → Aggregator (buffer → minute reduction → merge) → Store → Renderer
//!
//! - The [`Collector`] drives its own loop and is the only writer.
//! - [`render`] is pure and never touches the collector; readers see each
//!   day's row either before or after a merge, never half-written.
//!
//! Every device backend implements the [`UtilizationSource`] trait; every
//! storage backend implements [`ActivityStore`].

pub mod aggregator;
pub mod calendar;
pub mod config;
pub mod error;
pub mod record;
pub mod render;
pub mod retention;
pub mod sampler;
pub mod source;
pub mod sources;
pub mod store;

pub use aggregator::{Aggregator, Collector, FlushPlan, FlushReport, apply_plan};
pub use calendar::{CalendarGrid, DayCell, MonthLabel, SummaryStats, activity_level, grid_start};
pub use config::{CollectorConfig, DeviceConfig, DeviceKind};
pub use error::{DeviceReadError, RenderError, StoreError};
pub use record::{DailyActivityRecord, MinuteStats};
pub use render::{DEFAULT_WEEKS, Theme, fallback_svg, render, render_from_store};
pub use retention::purge_expired;
pub use sampler::Sampler;
pub use source::{SourceInfo, SourceKind, UtilizationSource};
pub use sources::detect_source;
pub use store::{ActivityStore, SqliteStore};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
