//! Screen driver: weekend skipping, the trading-day stop, pacing and
//! error propagation, plus one run through the Polygon client.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use moonshot_analysis::screen::{run_screen, DailyBarSource, ScreenParams};
use moonshot_core::data::{
    AttemptError, AuthStyle, FetchError, HttpResponse, HttpTransport, PagedFetcher, Pause,
    PolygonClient, RetryPolicy,
};
use moonshot_core::domain::GroupedBar;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bar(t: &str, o: f64, c: f64, v: f64, vw: f64) -> GroupedBar {
    GroupedBar {
        ticker: Some(t.into()),
        open: Some(o),
        close: Some(c),
        volume: Some(v),
        vwap: Some(vw),
    }
}

/// Canned bars per date; unlisted dates are empty (weekends, holidays).
#[derive(Default)]
struct FakeSource {
    days: HashMap<NaiveDate, Vec<GroupedBar>>,
    failing: Option<NaiveDate>,
    requested: RefCell<Vec<NaiveDate>>,
    paces: Cell<usize>,
}

impl DailyBarSource for FakeSource {
    fn grouped_daily(&self, date: NaiveDate) -> Result<Vec<GroupedBar>, FetchError> {
        self.requested.borrow_mut().push(date);
        if self.failing == Some(date) {
            return Err(FetchError::Exhausted {
                url: "https://poly.test/grouped?apiKey=REDACTED".into(),
                attempts: 3,
                last: AttemptError::Status {
                    status: 500,
                    body: "boom".into(),
                },
            });
        }
        Ok(self.days.get(&date).cloned().unwrap_or_default())
    }

    fn pace(&self) {
        self.paces.set(self.paces.get() + 1);
    }
}

fn week() -> FakeSource {
    // Monday 2024-05-06 back to Wednesday 2024-05-01; the weekend is empty.
    let mut days = HashMap::new();
    days.insert(
        d(2024, 5, 6),
        vec![
            bar("MOON", 4.0, 5.0, 1e6, 4.5),
            bar("FLAT", 10.0, 10.0, 1e6, 10.0),
            bar("MEGA", 15.0, 15.3, 5e7, 15.0),
        ],
    );
    days.insert(
        d(2024, 5, 3),
        vec![
            bar("MOON", 5.0, 4.0, 2e6, 4.5),
            bar("FLAT", 10.0, 10.0, 1e6, 10.0),
            bar("MEGA", 15.0, 15.0, 5e7, 15.0),
        ],
    );
    days.insert(
        d(2024, 5, 2),
        vec![
            bar("MOON", 4.0, 4.4, 1e6, 4.2),
            bar("FLAT", 10.0, 10.0, 1e6, 10.0),
            bar("MEGA", 15.0, 15.0, 5e7, 15.0),
        ],
    );
    days.insert(d(2024, 5, 1), vec![bar("MOON", 9.0, 9.0, 1e6, 9.0)]);
    FakeSource {
        days,
        ..FakeSource::default()
    }
}

fn three_days() -> ScreenParams {
    ScreenParams {
        days: 3,
        min_days: 3,
        ..ScreenParams::default()
    }
}

#[test]
fn stops_after_enough_trading_days() {
    let source = week();
    let rows = run_screen(&source, &three_days(), d(2024, 5, 6), false).unwrap();

    assert_eq!(
        *source.requested.borrow(),
        vec![d(2024, 5, 6), d(2024, 5, 5), d(2024, 5, 4), d(2024, 5, 3), d(2024, 5, 2)]
    );
    // Paced after each day that had data, never after the weekend.
    assert_eq!(source.paces.get(), 3);

    // MEGA fails the ADV ceiling.
    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["MOON", "FLAT"]);

    let moon = &rows[0];
    assert_eq!(moon.observations, 3);
    // Last close and date track the oldest day walked.
    assert_eq!(moon.last_close, 4.4);
    assert_eq!(moon.last_date, d(2024, 5, 2));
    assert!((moon.avg_dollar_volume - 5.9e6).abs() < 1e-3);
    assert!((moon.daily_move - 0.55 / 3.0).abs() < 1e-12);
    assert_eq!(rows[1].annualized_vol, 0.0);
}

#[test]
fn date_budget_is_twice_the_trading_days() {
    let source = FakeSource::default();
    let rows = run_screen(&source, &three_days(), d(2024, 5, 6), false).unwrap();
    assert!(rows.is_empty());
    assert_eq!(source.requested.borrow().len(), 6);
    assert_eq!(source.paces.get(), 0);
}

#[test]
fn fetch_failure_aborts_the_screen() {
    let mut source = week();
    source.failing = Some(d(2024, 5, 3));
    let err = run_screen(&source, &three_days(), d(2024, 5, 6), false).unwrap_err();
    assert!(matches!(err, FetchError::Exhausted { attempts: 3, .. }));
    assert_eq!(source.requested.borrow().len(), 4);
    assert_eq!(source.paces.get(), 1);
}

// ── Through the Polygon client ───────────────────────────────────────

struct ByDate {
    bodies: Vec<(&'static str, &'static str)>,
    seen: Mutex<Vec<String>>,
}

impl HttpTransport for ByDate {
    fn get(&self, url: &str, _bearer: Option<&str>) -> Result<HttpResponse, AttemptError> {
        self.seen.lock().unwrap().push(url.to_string());
        let body = self
            .bodies
            .iter()
            .find(|(date, _)| url.contains(date))
            .map_or(r#"{"resultsCount": 0}"#, |&(_, body)| body);
        Ok(HttpResponse::ok(body))
    }
}

#[derive(Default)]
struct RecordingPause(Mutex<Vec<Duration>>);

impl Pause for RecordingPause {
    fn pause(&self, duration: Duration) {
        self.0.lock().unwrap().push(duration);
    }
}

#[test]
fn polygon_client_feeds_the_screen() {
    let transport = ByDate {
        bodies: vec![
            (
                "2024-05-03",
                r#"{"results": [{"T": "SOUN", "o": 5.0, "c": 5.5, "v": 2000000, "vw": 5.2}, {"T": "", "o": 1, "c": 1, "v": 1, "vw": 1}]}"#,
            ),
            (
                "2024-05-02",
                r#"{"results": [{"T": "SOUN", "o": 5.0, "c": 4.5, "v": 1500000, "vw": 4.8}, {"T": "HALF", "c": 3.0}]}"#,
            ),
        ],
        seen: Mutex::new(Vec::new()),
    };
    let pause = Arc::new(RecordingPause::default());
    let policy = RetryPolicy::new(1, 0.0, 0.25).unwrap();
    let client = PolygonClient::new(
        PagedFetcher::new(&transport, policy).with_pause(pause.clone()),
        "PK",
        AuthStyle::Query,
    )
    .with_base_url("https://poly.test");

    let params = ScreenParams {
        days: 2,
        min_days: 2,
        ..ScreenParams::default()
    };
    // Saturday: walks back over the weekend to Friday and Thursday.
    let rows = run_screen(&client, &params, d(2024, 5, 4), false).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "SOUN");
    assert_eq!(rows[0].last_close, 4.5);
    assert_eq!(rows[0].last_date, d(2024, 5, 2));
    assert!((rows[0].daily_move - 0.1).abs() < 1e-12);

    let seen = transport.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert_eq!(
        seen[1],
        "https://poly.test/v2/aggs/grouped/locale/us/market/stocks/2024-05-03?adjusted=true&apiKey=PK"
    );
    assert_eq!(*pause.0.lock().unwrap(), vec![Duration::from_millis(250); 2]);
}
