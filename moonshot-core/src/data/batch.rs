//! Batch driver: fetch earnings for many tickers, one at a time.
//!
//! A ticker that fails is reported and skipped; the rest of the batch still
//! runs. The caller decides what an all-failed batch means.

use super::provider::{EarningsSource, FetchError};
use crate::domain::{DateRange, EarningsEvent};
use tracing::{info, warn};

/// Progress callback for multi-ticker operations.
pub trait BatchProgress {
    /// Called when starting to fetch a ticker.
    fn on_start(&self, ticker: &str, index: usize, total: usize);

    /// Called when a ticker fetch completes. `Ok` carries the event count.
    fn on_complete(&self, ticker: &str, index: usize, total: usize, result: &Result<usize, FetchError>);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Prints failures (always) and progress (when verbose) to stderr.
pub struct StderrProgress {
    pub verbose: bool,
}

impl BatchProgress for StderrProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize) {
        if self.verbose {
            eprintln!("[{}/{}] Fetching {ticker}...", index + 1, total);
        }
    }

    fn on_complete(&self, ticker: &str, _index: usize, _total: usize, result: &Result<usize, FetchError>) {
        match result {
            Ok(n) if self.verbose => eprintln!("  OK: {ticker} ({n} events)"),
            Ok(_) => {}
            Err(e) => eprintln!("Error fetching {ticker}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        if self.verbose {
            eprintln!("Fetch complete: {succeeded}/{total} succeeded, {failed} failed");
        }
    }
}

/// Events for one ticker that fetched successfully.
#[derive(Debug)]
pub struct TickerEvents {
    pub ticker: String,
    pub events: Vec<EarningsEvent>,
}

/// Outcome of a batch, successes in input order.
#[derive(Debug)]
pub struct BatchSummary {
    pub fetched: Vec<TickerEvents>,
    pub errors: Vec<(String, FetchError)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.fetched.len() + self.errors.len()
    }

    pub fn any_succeeded(&self) -> bool {
        !self.fetched.is_empty()
    }
}

/// Fetch every ticker sequentially, in input order.
pub fn fetch_batch(
    source: &dyn EarningsSource,
    tickers: &[String],
    range: DateRange,
    progress: &dyn BatchProgress,
) -> BatchSummary {
    let total = tickers.len();
    let mut fetched = Vec::new();
    let mut errors = Vec::new();

    for (i, ticker) in tickers.iter().enumerate() {
        progress.on_start(ticker, i, total);

        match source.fetch_earnings(ticker, range) {
            Ok(events) => {
                info!(ticker = %ticker, provider = source.name(), events = events.len(), "ticker fetched");
                progress.on_complete(ticker, i, total, &Ok(events.len()));
                fetched.push(TickerEvents {
                    ticker: ticker.clone(),
                    events,
                });
            }
            Err(e) => {
                warn!(ticker = %ticker, provider = source.name(), error = %e, "ticker failed");
                let result: Result<usize, FetchError> = Err(e);
                progress.on_complete(ticker, i, total, &result);
                if let Err(e) = result {
                    errors.push((ticker.clone(), e));
                }
            }
        }
    }

    progress.on_batch_complete(fetched.len(), errors.len(), total);

    BatchSummary { fetched, errors }
}
