//! Blocking HTTP transport.
//!
//! The fetcher only needs "GET this URL, give me status + body". Keeping that
//! behind a trait lets tests script responses without a network.

use super::provider::{AttemptError, FetchError};
use std::time::Duration;

/// Status code and body of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }
}

/// Performs a single GET. Implementations must not retry on their own.
pub trait HttpTransport {
    fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse, AttemptError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse, AttemptError> {
        (**self).get(url, bearer)
    }
}

/// Per-request settings for the real client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("moonshot/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// `reqwest::blocking` transport.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::ClientSetup(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse, AttemptError> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let resp = request.send().map_err(classify)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(classify)?;
        Ok(HttpResponse { status, body })
    }
}

/// Error text never includes the URL. The fetcher attaches a redacted copy.
fn classify(e: reqwest::Error) -> AttemptError {
    let e = e.without_url();
    if e.is_timeout() {
        AttemptError::Timeout(e.to_string())
    } else {
        AttemptError::Transport(e.to_string())
    }
}
