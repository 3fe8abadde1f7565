//! Polygon.io client: earnings reference data and grouped daily aggregates.
//!
//! The earnings endpoint has moved between API versions and between
//! query-style (`/reference/earnings?ticker=X`) and path-style
//! (`/reference/earnings/X`) routes. Rather than guess, the client walks
//! every (version, route) combination in a fixed priority order and takes
//! the first one that returns events.

use super::http::{HttpTransport, ReqwestTransport};
use super::paginate::{AuthStyle, Credential, FetchRequest, Page, PageShape, PagedFetcher};
use super::provider::{EarningsSource, FetchError};
use crate::domain::{DateRange, EarningsEvent, GroupedBar, PolygonEarning};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;
use tracing::{debug, info, warn};
use url::form_urlencoded;

pub const POLYGON_BASE_URL: &str = "https://api.polygon.io";
pub const POLYGON_KEY_PARAM: &str = "apiKey";

/// API versions in the order they are tried.
pub const EARNINGS_API_VERSIONS: [&str; 3] = ["v3", "v2", "v1"];

/// Earnings route shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarningsRoute {
    /// `/{version}/reference/earnings?...&ticker=T`
    Query,
    /// `/{version}/reference/earnings/{T}?...&apiKey=K`
    Path,
}

/// One (version, route) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarningsEndpoint {
    pub version: &'static str,
    pub route: EarningsRoute,
}

/// Every combination, highest priority first: v3-query, v3-path, v2-query, ...
pub fn earnings_endpoints() -> impl Iterator<Item = EarningsEndpoint> {
    EARNINGS_API_VERSIONS.into_iter().flat_map(|version| {
        [EarningsRoute::Query, EarningsRoute::Path]
            .into_iter()
            .map(move |route| EarningsEndpoint { version, route })
    })
}

/// Polygon list envelope: `{"results": [...], "next_url": "..."}`.
#[derive(Debug, Deserialize)]
#[serde(bound = "R: DeserializeOwned")]
struct Envelope<R> {
    #[serde(default)]
    results: Option<Vec<R>>,
    #[serde(default)]
    next_url: Option<String>,
}

/// Page shape for any Polygon list endpoint.
pub struct PolygonPaged<R>(PhantomData<R>);

impl<R: DeserializeOwned> PageShape for PolygonPaged<R> {
    type Record = R;

    fn parse(body: &str) -> Result<Page<R>, serde_json::Error> {
        let env: Envelope<R> = serde_json::from_str(body)?;
        Ok(Page {
            results: env.results.unwrap_or_default(),
            next_url: env.next_url.filter(|u| !u.trim().is_empty()),
        })
    }
}

/// Polygon.io client.
pub struct PolygonClient<T = ReqwestTransport> {
    fetcher: PagedFetcher<T>,
    base_url: String,
    credential: Credential,
}

impl<T: HttpTransport> PolygonClient<T> {
    pub fn new(fetcher: PagedFetcher<T>, api_key: impl Into<String>, auth: AuthStyle) -> Self {
        Self {
            fetcher,
            base_url: POLYGON_BASE_URL.to_string(),
            credential: Credential::new(auth, POLYGON_KEY_PARAM, api_key),
        }
    }

    /// Point at a different host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn fetcher(&self) -> &PagedFetcher<T> {
        &self.fetcher
    }

    /// First-page URL for one earnings endpoint combination.
    pub fn earnings_url(&self, endpoint: EarningsEndpoint, ticker: &str, range: DateRange) -> String {
        let key = self.credential.query_pair();
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("order", "asc")
            .append_pair("sort", "reportDate")
            .append_pair("limit", "100");

        let version = endpoint.version;
        match endpoint.route {
            EarningsRoute::Query => {
                if let Some((param, value)) = key {
                    query.append_pair(param, value);
                }
                append_date_filters(&mut query, range);
                query.append_pair("ticker", ticker);
                format!(
                    "{}/{version}/reference/earnings?{}",
                    self.base_url,
                    query.finish()
                )
            }
            EarningsRoute::Path => {
                append_date_filters(&mut query, range);
                if let Some((param, value)) = key {
                    query.append_pair(param, value);
                }
                format!(
                    "{}/{version}/reference/earnings/{ticker}?{}",
                    self.base_url,
                    query.finish()
                )
            }
        }
    }

    /// Grouped daily bars for every US stock on `date`.
    ///
    /// Weekends and holidays return an empty list.
    pub fn grouped_daily(&self, date: NaiveDate) -> Result<Vec<GroupedBar>, FetchError> {
        let mut url = format!(
            "{}/v2/aggs/grouped/locale/us/market/stocks/{}?adjusted=true",
            self.base_url,
            date.format("%Y-%m-%d")
        );
        if let Some((param, value)) = self.credential.query_pair() {
            url.push('&');
            url.push_str(
                &form_urlencoded::Serializer::new(String::new())
                    .append_pair(param, value)
                    .finish(),
            );
        }
        let request = FetchRequest::new(url, self.credential.clone());
        self.fetcher.fetch_all::<PolygonPaged<GroupedBar>>(&request)
    }
}

fn append_date_filters(query: &mut form_urlencoded::Serializer<'_, String>, range: DateRange) {
    query
        .append_pair("reportDate.gte", &range.start().to_string())
        .append_pair("reportDate.lte", &range.end().to_string());
}

impl<T: HttpTransport> EarningsSource for PolygonClient<T> {
    fn name(&self) -> &str {
        "polygon"
    }

    /// Walk the endpoint combinations in priority order.
    ///
    /// The first combination with at least one event wins. A failing
    /// combination is remembered and skipped; a combination that answers with
    /// zero events is skipped too. If nothing produced events, the last error
    /// seen is returned, or an empty list when every combination answered
    /// cleanly.
    fn fetch_earnings(
        &self,
        ticker: &str,
        range: DateRange,
    ) -> Result<Vec<EarningsEvent>, FetchError> {
        let mut last_error = None;

        for endpoint in earnings_endpoints() {
            let url = self.earnings_url(endpoint, ticker, range);
            let request = FetchRequest::new(url, self.credential.clone());

            match self.fetcher.fetch_all::<PolygonPaged<PolygonEarning>>(&request) {
                Ok(raw) if !raw.is_empty() => {
                    info!(
                        ticker,
                        version = endpoint.version,
                        route = ?endpoint.route,
                        events = raw.len(),
                        "earnings endpoint answered"
                    );
                    return Ok(raw.into_iter().map(EarningsEvent::from).collect());
                }
                Ok(_) => {
                    debug!(ticker, version = endpoint.version, route = ?endpoint.route, "no events");
                }
                Err(e) => {
                    warn!(
                        ticker,
                        version = endpoint.version,
                        route = ?endpoint.route,
                        error = %e,
                        "earnings endpoint failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}
