//! Earnings coverage: how many fiscal quarters a provider returned for a
//! ticker relative to how many the requested range should contain.

use chrono::NaiveDate;
use moonshot_core::domain::{DateRange, EarningsEvent};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write;

/// Events shown per ticker by `--verbose`.
pub const SAMPLE_EVENTS: usize = 3;

/// Coverage statistics for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub ticker: String,
    /// Events with a parseable report date.
    pub events: usize,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
    pub max_gap_days: Option<i64>,
    pub unique_quarters: usize,
    pub coverage_ratio: f64,
}

/// Quarters a range is expected to contain: `max(1, round(months / 3))`.
pub fn expected_quarters(range: DateRange) -> usize {
    let quarters = (f64::from(range.month_span()) / 3.0).round();
    (quarters as usize).max(1)
}

/// Summarize one ticker's events against the requested range.
///
/// Undated events don't count toward `events` or the date statistics but do
/// contribute their fiscal quarter.
pub fn summarize_events(ticker: &str, events: &[EarningsEvent], range: DateRange) -> CoverageSummary {
    let mut dates: Vec<NaiveDate> = events.iter().filter_map(|e| e.report_date).collect();
    dates.sort();

    if dates.is_empty() {
        return CoverageSummary {
            ticker: ticker.to_string(),
            events: 0,
            first: None,
            last: None,
            max_gap_days: None,
            unique_quarters: 0,
            coverage_ratio: 0.0,
        };
    }

    let max_gap = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .max()
        .unwrap_or(0);

    let quarters: HashSet<String> = events.iter().map(EarningsEvent::quarter_key).collect();
    let ratio = quarters.len() as f64 / expected_quarters(range) as f64;

    CoverageSummary {
        ticker: ticker.to_string(),
        events: dates.len(),
        first: dates.first().copied(),
        last: dates.last().copied(),
        max_gap_days: Some(max_gap),
        unique_quarters: quarters.len(),
        coverage_ratio: ratio.min(1.0),
    }
}

/// Fixed-width console table.
pub fn render_coverage_table(rows: &[CoverageSummary]) -> String {
    let mut out =
        String::from("ticker events first_report last_report max_gap_days unique_quarters coverage_ratio\n");
    for row in rows {
        let first = row.first.map_or_else(|| "-".to_string(), |d| d.to_string());
        let last = row.last.map_or_else(|| "-".to_string(), |d| d.to_string());
        let gap = row.max_gap_days.map_or_else(|| "-".to_string(), |g| g.to_string());
        let _ = writeln!(
            out,
            "{:6} {:6} {:12} {:12} {:12} {:14} {:5.1}%",
            row.ticker,
            row.events,
            first,
            last,
            gap,
            row.unique_quarters,
            row.coverage_ratio * 100.0
        );
    }
    out
}

/// First `count` events of a ticker, one line each, for eyeballing raw data.
pub fn render_sample_events(ticker: &str, events: &[EarningsEvent], count: usize) -> String {
    if events.is_empty() {
        return format!("  {ticker}: no events returned\n");
    }
    let mut out = format!("  {ticker}: showing up to {count} events\n");
    for e in events.iter().take(count) {
        let _ = writeln!(
            out,
            "    {} fiscal={} {} eps={} est={} surprise={}",
            show(e.report_date),
            e.fiscal_period.as_deref().unwrap_or("-"),
            show(e.fiscal_year),
            show(e.eps_actual),
            show(e.eps_estimate),
            show(e.eps_surprise_pct),
        );
    }
    out
}

fn show<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use moonshot_core::domain::Provider;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn event(date: Option<NaiveDate>, period: &str, year: i32) -> EarningsEvent {
        EarningsEvent {
            provider: Provider::Polygon,
            report_date: date,
            symbol: Some("AAPL".into()),
            fiscal_period: Some(period.into()),
            fiscal_year: Some(year),
            eps_actual: Some(1.5),
            eps_estimate: None,
            eps_surprise_pct: None,
            session: None,
        }
    }

    fn year_2024() -> DateRange {
        DateRange::new(d(2024, 1, 1), d(2024, 12, 31)).unwrap()
    }

    #[test]
    fn expected_quarters_rounds_and_floors_at_one() {
        assert_eq!(expected_quarters(year_2024()), 4);
        assert_eq!(expected_quarters(DateRange::new(d(2024, 1, 5), d(2024, 1, 20)).unwrap()), 1);
        // 17 months → 5.67 → 6
        assert_eq!(expected_quarters(DateRange::new(d(2023, 1, 1), d(2024, 5, 1)).unwrap()), 6);
        // 4 months → 1.33 → 1
        assert_eq!(expected_quarters(DateRange::new(d(2024, 1, 1), d(2024, 4, 1)).unwrap()), 1);
    }

    #[test]
    fn full_year_with_four_quarters_is_complete() {
        let events = vec![
            event(Some(d(2024, 1, 25)), "Q1", 2024),
            event(Some(d(2024, 4, 25)), "Q2", 2024),
            event(Some(d(2024, 7, 25)), "Q3", 2024),
            event(Some(d(2024, 10, 24)), "Q4", 2024),
        ];
        let s = summarize_events("AAPL", &events, year_2024());
        assert_eq!(s.events, 4);
        assert_eq!(s.first, Some(d(2024, 1, 25)));
        assert_eq!(s.last, Some(d(2024, 10, 24)));
        assert_eq!(s.max_gap_days, Some(91));
        assert_eq!(s.unique_quarters, 4);
        assert_eq!(s.coverage_ratio, 1.0);
    }

    #[test]
    fn half_coverage() {
        let events = vec![
            event(Some(d(2024, 1, 25)), "Q1", 2024),
            event(Some(d(2024, 1, 26)), "Q1", 2024),
            event(Some(d(2024, 4, 25)), "Q2", 2024),
        ];
        let s = summarize_events("AAPL", &events, year_2024());
        assert_eq!(s.unique_quarters, 2);
        assert_eq!(s.coverage_ratio, 0.5);
    }

    #[test]
    fn ratio_is_capped_at_one() {
        let events: Vec<_> = (1..=6)
            .map(|q| event(Some(d(2024, q, 1)), &format!("Q{q}"), 2024))
            .collect();
        let s = summarize_events("AAPL", &events, year_2024());
        assert_eq!(s.unique_quarters, 6);
        assert_eq!(s.coverage_ratio, 1.0);
    }

    #[test]
    fn undated_events_count_quarters_only() {
        let events = vec![event(Some(d(2024, 2, 1)), "Q1", 2024), event(None, "Q2", 2024)];
        let s = summarize_events("AAPL", &events, year_2024());
        assert_eq!(s.events, 1);
        assert_eq!(s.max_gap_days, Some(0));
        assert_eq!(s.unique_quarters, 2);
    }

    #[test]
    fn no_dated_events_is_zero_summary() {
        let s = summarize_events("NONE", &[event(None, "Q1", 2024)], year_2024());
        assert_eq!(s.events, 0);
        assert_eq!(s.first, None);
        assert_eq!(s.max_gap_days, None);
        assert_eq!(s.unique_quarters, 0);
        assert_eq!(s.coverage_ratio, 0.0);
    }

    #[test]
    fn table_layout() {
        let rows = vec![
            summarize_events("AAPL", &[event(Some(d(2024, 1, 25)), "Q1", 2024)], year_2024()),
            summarize_events("ZZZ", &[], year_2024()),
        ];
        let table = render_coverage_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "AAPL        1 2024-01-25   2024-01-25   0                         1  25.0%");
        assert_eq!(lines[2], "ZZZ         0 -            -            -                         0   0.0%");
    }

    #[test]
    fn sample_dump() {
        assert_eq!(render_sample_events("X", &[], 3), "  X: no events returned\n");
        let events = vec![event(Some(d(2024, 1, 25)), "Q1", 2024); 5];
        let dump = render_sample_events("AAPL", &events, 3);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "  AAPL: showing up to 3 events");
        assert_eq!(lines[1], "    2024-01-25 fiscal=Q1 2024 eps=1.5 est=- surprise=-");
    }
}
