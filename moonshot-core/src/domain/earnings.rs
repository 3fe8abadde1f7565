//! Earnings records: one raw type per provider, one normalized event type.

use super::lenient;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Which API produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Polygon,
    Finnhub,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Polygon => "polygon",
            Provider::Finnhub => "finnhub",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polygon `reference/earnings` entry.
///
/// The endpoint's field names changed between API versions, so the older
/// spellings (`quarter`, `period`, `year`, `actual`, `estimate`,
/// `surprisePercent`) are kept as separate fields and used as fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonEarning {
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub report_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub ticker: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub fiscal_period: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub quarter: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub period: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub fiscal_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub eps_actual: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub actual: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub eps_estimate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub estimate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub eps_surprise_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub surprise_percent: Option<f64>,
}

/// Finnhub `calendar/earnings` entry (element of `earningsCalendar`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinnhubEarning {
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub quarter: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub period: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub eps_actual: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub eps_estimate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub eps_surprise_percent: Option<f64>,
    /// `bmo` / `amc` / `dmh`.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub hour: Option<String>,
}

/// Provider-neutral earnings event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsEvent {
    pub provider: Provider,
    pub report_date: Option<NaiveDate>,
    pub symbol: Option<String>,
    pub fiscal_period: Option<String>,
    pub fiscal_year: Option<i32>,
    pub eps_actual: Option<f64>,
    pub eps_estimate: Option<f64>,
    pub eps_surprise_pct: Option<f64>,
    /// Report session (`bmo`, `amc`), Finnhub only.
    pub session: Option<String>,
}

impl EarningsEvent {
    /// Identity used for deduplication: (report date, symbol).
    pub fn dedup_key(&self) -> (Option<NaiveDate>, Option<&str>) {
        (self.report_date, self.symbol.as_deref())
    }

    /// Fiscal-quarter identifier, e.g. `"Q1 2024"` or `"3 2023"`.
    ///
    /// Missing period renders as `?`; missing year leaves just the period.
    pub fn quarter_key(&self) -> String {
        let period = self.fiscal_period.as_deref().unwrap_or("?");
        match self.fiscal_year {
            Some(year) => format!("{period} {year}"),
            None => period.to_string(),
        }
    }
}

impl From<PolygonEarning> for EarningsEvent {
    fn from(raw: PolygonEarning) -> Self {
        Self {
            provider: Provider::Polygon,
            report_date: raw.report_date,
            symbol: raw.ticker,
            fiscal_period: raw.fiscal_period.or(raw.quarter).or(raw.period),
            fiscal_year: raw.fiscal_year.or(raw.year),
            eps_actual: raw.eps_actual.or(raw.actual),
            eps_estimate: raw.eps_estimate.or(raw.estimate),
            eps_surprise_pct: raw.eps_surprise_pct.or(raw.surprise_percent),
            session: None,
        }
    }
}

impl From<FinnhubEarning> for EarningsEvent {
    fn from(raw: FinnhubEarning) -> Self {
        Self {
            provider: Provider::Finnhub,
            report_date: raw.date,
            symbol: raw.symbol,
            fiscal_period: raw.quarter.or(raw.period),
            fiscal_year: raw.year,
            eps_actual: raw.eps_actual,
            eps_estimate: raw.eps_estimate,
            eps_surprise_pct: raw.eps_surprise_percent,
            session: raw.hour,
        }
    }
}

/// Stable-sort by (report date, symbol) and keep the first event per key.
///
/// Events missing a date or symbol sort ahead of those that have one.
pub fn dedupe_events(mut events: Vec<EarningsEvent>) -> Vec<EarningsEvent> {
    events.sort_by(|a, b| a.dedup_key().cmp(&b.dedup_key()));
    let mut seen: HashSet<(Option<NaiveDate>, Option<String>)> = HashSet::new();
    events.retain(|e| seen.insert((e.report_date, e.symbol.clone())));
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(date: &str, symbol: &str, eps: f64) -> EarningsEvent {
        EarningsEvent {
            provider: Provider::Finnhub,
            report_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            symbol: Some(symbol.to_string()),
            fiscal_period: Some("1".into()),
            fiscal_year: Some(2024),
            eps_actual: Some(eps),
            eps_estimate: None,
            eps_surprise_pct: None,
            session: None,
        }
    }

    #[test]
    fn polygon_falls_back_to_legacy_names() {
        let raw: PolygonEarning = serde_json::from_str(
            r#"{"reportDate":"2024-01-25","ticker":"AAPL","quarter":"Q1","year":"2024",
                "actual":2.18,"estimate":2.1,"surprisePercent":3.8}"#,
        )
        .unwrap();
        let evt = EarningsEvent::from(raw);
        assert_eq!(evt.provider, Provider::Polygon);
        assert_eq!(evt.fiscal_period.as_deref(), Some("Q1"));
        assert_eq!(evt.fiscal_year, Some(2024));
        assert_eq!(evt.eps_actual, Some(2.18));
        assert_eq!(evt.eps_estimate, Some(2.1));
        assert_eq!(evt.eps_surprise_pct, Some(3.8));
        assert_eq!(evt.quarter_key(), "Q1 2024");
    }

    #[test]
    fn polygon_prefers_current_names() {
        let raw: PolygonEarning = serde_json::from_str(
            r#"{"fiscalPeriod":"Q2","quarter":"Q9","fiscalYear":2023,"year":1999}"#,
        )
        .unwrap();
        let evt = EarningsEvent::from(raw);
        assert_eq!(evt.quarter_key(), "Q2 2023");
        assert!(evt.report_date.is_none());
    }

    #[test]
    fn finnhub_quarter_then_period() {
        let raw: FinnhubEarning = serde_json::from_str(
            r#"{"date":"2024-04-25","symbol":"MSFT","quarter":3,"year":2024,
                "epsActual":2.94,"epsEstimate":2.82,"epsSurprisePercent":4.2,"hour":"amc"}"#,
        )
        .unwrap();
        let evt = EarningsEvent::from(raw);
        assert_eq!(evt.quarter_key(), "3 2024");
        assert_eq!(evt.session.as_deref(), Some("amc"));

        let raw: FinnhubEarning =
            serde_json::from_str(r#"{"symbol":"MSFT","period":"2024-03-31"}"#).unwrap();
        assert_eq!(EarningsEvent::from(raw).quarter_key(), "2024-03-31");
    }

    #[test]
    fn quarter_key_placeholders() {
        let mut evt = event("2024-01-01", "X", 0.0);
        evt.fiscal_period = None;
        assert_eq!(evt.quarter_key(), "? 2024");
        evt.fiscal_year = None;
        assert_eq!(evt.quarter_key(), "?");
    }

    #[test]
    fn dedupe_keeps_first_of_duplicate_key() {
        let events = vec![
            event("2024-04-25", "MSFT", 2.94),
            event("2024-01-30", "MSFT", 2.93),
            event("2024-04-25", "MSFT", 9.99),
        ];
        let deduped = dedupe_events(events);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].report_date, NaiveDate::from_ymd_opt(2024, 1, 30));
        assert_eq!(deduped[1].eps_actual, Some(2.94));
    }

    #[test]
    fn dedupe_orders_missing_dates_first() {
        let mut undated = event("2024-01-01", "AAPL", 1.0);
        undated.report_date = None;
        let deduped = dedupe_events(vec![event("2024-01-01", "AAPL", 2.0), undated]);
        assert!(deduped[0].report_date.is_none());
        assert_eq!(deduped.len(), 2);
    }
}
