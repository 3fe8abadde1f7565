//! Network layer: transport, paginated fetcher, provider clients, batch driver.

pub mod batch;
pub mod finnhub;
pub mod http;
pub mod paginate;
pub mod polygon;
pub mod provider;

pub use batch::{fetch_batch, BatchProgress, BatchSummary, StderrProgress, TickerEvents};
pub use finnhub::FinnhubClient;
pub use http::{HttpResponse, HttpSettings, HttpTransport, ReqwestTransport};
pub use paginate::{
    AuthStyle, Credential, FetchRequest, Page, PageShape, PagedFetcher, Pause, RetryPolicy,
    ThreadPause,
};
pub use polygon::{PolygonClient, PolygonPaged};
pub use provider::{AttemptError, EarningsSource, FetchError};
