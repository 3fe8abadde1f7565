//! Moonshot Core: record types, the resilient paginated fetcher, provider clients.
//!
//! This crate contains everything that talks to the network:
//! - Typed provider records (Polygon earnings, Finnhub calendar, grouped daily bars)
//! - Blocking HTTP transport behind a trait seam
//! - Bounded-retry, cursor-following page fetcher with linear backoff
//! - Polygon and Finnhub clients with their endpoint fallback / windowing policy
//! - Sequential per-ticker batch driver that survives individual failures
//! - Up-front validation of dates, tickers and retry policies

pub mod data;
pub mod domain;
pub mod stats;
pub mod validate;

pub use validate::ConfigError;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn records_are_send_sync() {
        assert_send::<domain::EarningsEvent>();
        assert_sync::<domain::EarningsEvent>();
        assert_send::<domain::GroupedBar>();
        assert_sync::<domain::GroupedBar>();
        assert_send::<domain::DateRange>();
        assert_sync::<domain::DateRange>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<data::FetchError>();
        assert_sync::<data::FetchError>();
        assert_send::<ConfigError>();
        assert_sync::<ConfigError>();
    }

    #[test]
    fn fetcher_is_send_sync() {
        assert_send::<data::PagedFetcher<data::ReqwestTransport>>();
        assert_sync::<data::PagedFetcher<data::ReqwestTransport>>();
    }
}
