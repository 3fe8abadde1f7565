//! Moonshot Analysis: reports built on top of the fetch layer and local CSV exports.
//!
//! - Earnings coverage per ticker (quarters returned vs quarters expected)
//! - Micro-cap screen over Polygon grouped daily bars
//! - Grid hygiene summary of a parameter-sweep export
//! - StockTwits vs Reddit calibration summary
//! - TOML configuration for the fetch layer

pub mod calibration;
pub mod config;
pub mod coverage;
pub mod grid;
pub mod reporting;
pub mod screen;

pub use calibration::{summarize_file, CalibrationSummary, PolarityBucket, DEFAULT_CALIBRATION_PATH};
pub use config::MoonshotConfig;
pub use coverage::{render_coverage_table, render_sample_events, summarize_events, CoverageSummary};
pub use grid::{load_grid, summarize_grid, GridSummary, PromotedSet};
pub use screen::{render_screen_table, run_screen, DailyBarSource, ScreenParams, ScreenRow};
