//! Domain types: provider records, normalized earnings events, date ranges.

pub mod bar;
pub mod earnings;
mod lenient;
pub mod range;

pub use bar::GroupedBar;
pub use earnings::{dedupe_events, EarningsEvent, FinnhubEarning, PolygonEarning, Provider};
pub use range::DateRange;
