//! Resilient paginated fetcher.
//!
//! One logical query = one [`FetchRequest`]. The fetcher GETs the first page,
//! retries each page up to `max_attempts` times with linear backoff
//! (`backoff_base × attempt`), follows the continuation URL the provider
//! returns, and concatenates every page's results in provider order.
//!
//! A page that exhausts its attempts aborts the whole query and discards
//! the pages already collected.

use super::http::{HttpTransport, ReqwestTransport};
use super::provider::{AttemptError, FetchError};
use crate::validate::ConfigError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

const REDACTED: &str = "REDACTED";
const BODY_SNIPPET_CHARS: usize = 200;

/// How a provider expects its API key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStyle {
    /// `?apiKey=...` / `?token=...`
    #[default]
    Query,
    /// `Authorization: Bearer ...`
    Bearer,
}

/// Credential attached to every page of a query.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Query { param: String, value: String },
    Bearer(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Query { param, .. } => write!(f, "Query({param}={REDACTED})"),
            Credential::Bearer(_) => write!(f, "Bearer({REDACTED})"),
        }
    }
}

impl Credential {
    pub fn new(style: AuthStyle, param: &str, value: impl Into<String>) -> Self {
        match style {
            AuthStyle::Query => Credential::Query {
                param: param.to_string(),
                value: value.into(),
            },
            AuthStyle::Bearer => Credential::Bearer(value.into()),
        }
    }

    /// `(name, value)` when the credential travels in the query string.
    pub fn query_pair(&self) -> Option<(&str, &str)> {
        match self {
            Credential::Query { param, value } => Some((param, value)),
            Credential::Bearer(_) => None,
        }
    }

    pub fn bearer(&self) -> Option<&str> {
        match self {
            Credential::Bearer(token) => Some(token),
            Credential::Query { .. } => None,
        }
    }

    /// Re-append the query credential when a continuation URL dropped it.
    pub fn ensure_on(&self, mut url: Url) -> Url {
        if let Some((param, value)) = self.query_pair() {
            if !url.query_pairs().any(|(k, _)| k == param) {
                url.query_pairs_mut().append_pair(param, value);
            }
        }
        url
    }

    fn secret(&self) -> &str {
        match self {
            Credential::Query { value, .. } => value,
            Credential::Bearer(token) => token,
        }
    }

    /// Copy of `text` with the secret replaced, safe for logs and errors.
    ///
    /// URLs are redacted pair by pair and the rest of the URL is kept as is.
    /// Other text loses both the raw and the form-encoded secret.
    pub fn redact(&self, text: &str) -> String {
        if self.secret().is_empty() {
            return text.to_string();
        }
        match (self, Url::parse(text)) {
            (Credential::Query { param, value }, Ok(url)) if url.query().is_some() => {
                redact_query(url, param, value)
            }
            _ => redact_text(text, self.secret()),
        }
    }
}

/// Blank the value of `param` and of any pair carrying the secret verbatim.
fn redact_query(mut url: Url, param: &str, secret: &str) -> String {
    let query = url.query().unwrap_or_default();
    let pieces: Vec<String> = query
        .split('&')
        .map(|piece| {
            let hit = form_urlencoded::parse(piece.as_bytes())
                .next()
                .is_some_and(|(k, v)| k == param || v == secret);
            if hit {
                let raw_key = piece.split_once('=').map_or(piece, |(k, _)| k);
                format!("{raw_key}={REDACTED}")
            } else {
                piece.to_string()
            }
        })
        .collect();
    url.set_query(Some(&pieces.join("&")));
    url.into()
}

fn redact_text(text: &str, secret: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(secret.as_bytes()).collect();
    let out = text.replace(secret, REDACTED);
    if encoded == secret {
        out
    } else {
        out.replace(encoded.as_str(), REDACTED)
    }
}

/// First-page URL plus the credential every page needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    url: String,
    credential: Credential,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, credential: Credential) -> Self {
        Self {
            url: url.into(),
            credential,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// Attempt budget and pacing for one fetcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    page_delay: Duration,
}

impl RetryPolicy {
    /// Earnings endpoints: 5 attempts, 1.5 s linear backoff, 0.25 s between pages.
    pub const EARNINGS: RetryPolicy = RetryPolicy {
        max_attempts: 5,
        backoff_base: Duration::from_millis(1500),
        page_delay: Duration::from_millis(250),
    };

    /// Grouped-daily screen: 3 attempts, 1.5 s linear backoff, 0.25 s between days.
    pub const SCREEN: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        backoff_base: Duration::from_millis(1500),
        page_delay: Duration::from_millis(250),
    };

    pub fn new(
        max_attempts: u32,
        backoff_base_secs: f64,
        page_delay_secs: f64,
    ) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidPolicy(
                "max_attempts must be at least 1".into(),
            ));
        }
        Ok(Self {
            max_attempts,
            backoff_base: seconds("backoff", backoff_base_secs)?,
            page_delay: seconds("page delay", page_delay_secs)?,
        })
    }

    /// Same policy with a different inter-page delay.
    pub fn with_page_delay(self, page_delay_secs: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            page_delay: seconds("page delay", page_delay_secs)?,
            ..self
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    pub fn page_delay(&self) -> Duration {
        self.page_delay
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::InvalidPolicy(format!(
            "{name} must be a non-negative number of seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ConfigError::InvalidPolicy(format!("{name}: {e}")))
}

/// Where the fetcher sleeps. Swapped out in tests to record the schedule.
pub trait Pause: Send + Sync {
    fn pause(&self, duration: Duration);
}

/// Real sleeping via `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// One decoded page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub results: Vec<R>,
    pub next_url: Option<String>,
}

/// Provider-specific page layout: where the results live and where the
/// continuation cursor (if any) lives.
pub trait PageShape {
    type Record;

    fn parse(body: &str) -> Result<Page<Self::Record>, serde_json::Error>;
}

/// Bounded-retry, cursor-following GET loop.
pub struct PagedFetcher<T = ReqwestTransport> {
    transport: T,
    policy: RetryPolicy,
    pause: Arc<dyn Pause>,
}

impl<T: HttpTransport> PagedFetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            pause: Arc::new(ThreadPause),
        }
    }

    /// Replace the sleeping strategy.
    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sleep the inter-request delay. Callers that issue several independent
    /// queries back to back (date windows, trading days) use this between them.
    pub fn pace(&self) {
        self.pause.pause(self.policy.page_delay);
    }

    /// Fetch every page of `request` and concatenate the results.
    pub fn fetch_all<S: PageShape>(&self, request: &FetchRequest) -> Result<Vec<S::Record>, FetchError> {
        let credential = request.credential();
        let mut records = Vec::new();
        let mut next = Some(request.url().to_string());
        let mut page_no = 0usize;

        while let Some(url) = next.take() {
            page_no += 1;
            let page = self.fetch_page::<S>(&url, credential)?;
            debug!(
                page = page_no,
                records = page.results.len(),
                url = %credential.redact(&url),
                "fetched page"
            );
            records.extend(page.results);

            if let Some(cursor) = page.next_url {
                let resolved = resolve(&url, &cursor).map_err(|reason| FetchError::InvalidUrl {
                    url: credential.redact(&cursor),
                    reason,
                })?;
                next = Some(credential.ensure_on(resolved).into());
                self.pace();
            }
        }

        Ok(records)
    }

    /// One page, retried up to the attempt budget.
    fn fetch_page<S: PageShape>(
        &self,
        url: &str,
        credential: &Credential,
    ) -> Result<Page<S::Record>, FetchError> {
        let max = self.policy.max_attempts;
        let mut attempt = 1;
        loop {
            let err = match self.attempt::<S>(url, credential) {
                Ok(page) => return Ok(page),
                Err(e) => e,
            };
            let err = scrub(err, credential);
            warn!(
                attempt,
                max_attempts = max,
                url = %credential.redact(url),
                error = %err,
                "page request failed"
            );
            if attempt >= max {
                return Err(FetchError::Exhausted {
                    url: credential.redact(url),
                    attempts: attempt,
                    last: err,
                });
            }
            self.pause.pause(self.policy.backoff_after(attempt));
            attempt += 1;
        }
    }

    fn attempt<S: PageShape>(
        &self,
        url: &str,
        credential: &Credential,
    ) -> Result<Page<S::Record>, AttemptError> {
        let resp = self.transport.get(url, credential.bearer())?;
        if resp.status != 200 {
            return Err(AttemptError::Status {
                status: resp.status,
                body: resp.body.chars().take(BODY_SNIPPET_CHARS).collect(),
            });
        }
        S::parse(&resp.body).map_err(|e| AttemptError::Decode(e.to_string()))
    }
}

/// Cursors are usually absolute; relative ones resolve against the current page.
fn resolve(current: &str, cursor: &str) -> Result<Url, String> {
    let base = Url::parse(current).map_err(|e| e.to_string())?;
    base.join(cursor).map_err(|e| e.to_string())
}

/// Providers sometimes echo the request URL in error bodies.
fn scrub(err: AttemptError, credential: &Credential) -> AttemptError {
    match err {
        AttemptError::Status { status, body } => AttemptError::Status {
            status,
            body: credential.redact(&body),
        },
        AttemptError::Timeout(m) => AttemptError::Timeout(credential.redact(&m)),
        AttemptError::Transport(m) => AttemptError::Transport(credential.redact(&m)),
        AttemptError::Decode(m) => AttemptError::Decode(credential.redact(&m)),
    }
}
