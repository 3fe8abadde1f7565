//! Finnhub earnings calendar client.
//!
//! Finnhub has no pagination cursor; large ranges are split into 90-day
//! windows instead, one request each. Windows can return overlapping events,
//! so the combined list is deduplicated on (report date, symbol).

use super::http::{HttpTransport, ReqwestTransport};
use super::paginate::{AuthStyle, Credential, FetchRequest, Page, PageShape, PagedFetcher};
use super::provider::{EarningsSource, FetchError};
use crate::domain::{dedupe_events, DateRange, EarningsEvent, FinnhubEarning};
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use tracing::debug;
use url::form_urlencoded;

pub const FINNHUB_BASE_URL: &str = "https://finnhub.io";
pub const FINNHUB_KEY_PARAM: &str = "token";
pub const WINDOW_DAYS: i64 = 90;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarEnvelope {
    #[serde(default)]
    earnings_calendar: Option<Vec<FinnhubEarning>>,
}

/// `{"earningsCalendar": [...]}`, single page.
pub struct FinnhubCalendar;

impl PageShape for FinnhubCalendar {
    type Record = FinnhubEarning;

    fn parse(body: &str) -> Result<Page<FinnhubEarning>, serde_json::Error> {
        let env: CalendarEnvelope = serde_json::from_str(body)?;
        Ok(Page {
            results: env.earnings_calendar.unwrap_or_default(),
            next_url: None,
        })
    }
}

/// Split `range` into consecutive inclusive windows of at most
/// `WINDOW_DAYS + 1` days: `[s, min(s + 90, end)]`, then from the next day.
pub fn calendar_windows(range: DateRange) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let mut cursor = range.start();
    while cursor <= range.end() {
        let window_end = (cursor + Duration::days(WINDOW_DAYS)).min(range.end());
        windows.push((cursor, window_end));
        match window_end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    windows
}

/// Finnhub client.
pub struct FinnhubClient<T = ReqwestTransport> {
    fetcher: PagedFetcher<T>,
    base_url: String,
    credential: Credential,
}

impl<T: HttpTransport> FinnhubClient<T> {
    pub fn new(fetcher: PagedFetcher<T>, api_key: impl Into<String>, auth: AuthStyle) -> Self {
        Self {
            fetcher,
            base_url: FINNHUB_BASE_URL.to_string(),
            credential: Credential::new(auth, FINNHUB_KEY_PARAM, api_key),
        }
    }

    /// Point at a different host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn calendar_url(&self, ticker: &str, from: NaiveDate, to: NaiveDate) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("from", &from.to_string())
            .append_pair("to", &to.to_string())
            .append_pair("symbol", ticker);
        if let Some((param, value)) = self.credential.query_pair() {
            query.append_pair(param, value);
        }
        format!("{}/api/v1/calendar/earnings?{}", self.base_url, query.finish())
    }
}

impl<T: HttpTransport> EarningsSource for FinnhubClient<T> {
    fn name(&self) -> &str {
        "finnhub"
    }

    fn fetch_earnings(
        &self,
        ticker: &str,
        range: DateRange,
    ) -> Result<Vec<EarningsEvent>, FetchError> {
        let mut collected = Vec::new();

        // Paced after every window, the last one included.
        for (from, to) in calendar_windows(range) {
            let request = FetchRequest::new(self.calendar_url(ticker, from, to), self.credential.clone());
            let raw = self.fetcher.fetch_all::<FinnhubCalendar>(&request)?;
            debug!(ticker, %from, %to, events = raw.len(), "calendar window");
            collected.extend(raw.into_iter().map(EarningsEvent::from));
            self.fetcher.pace();
        }

        Ok(dedupe_events(collected))
    }
}
