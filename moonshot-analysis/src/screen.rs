//! Micro-cap screen over Polygon grouped daily bars.
//!
//! Walks calendar dates backwards from today, one grouped-daily request per
//! date, until enough trading days with data have been collected. Per symbol
//! it tracks dollar volume and the absolute open-to-close move, then keeps
//! liquid-but-small, volatile names.

use chrono::{Duration, NaiveDate};
use moonshot_core::data::{FetchError, HttpTransport, PolygonClient};
use moonshot_core::domain::GroupedBar;
use moonshot_core::stats::{mean, std_dev};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;
use tracing::{debug, info};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// CSV column order for screen output.
pub const SCREEN_CSV_HEADER: [&str; 8] = [
    "symbol",
    "last_close",
    "avg_dollar_volume",
    "daily_move",
    "stdev_move",
    "annualized_vol",
    "observations",
    "last_date",
];

/// Screen thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenParams {
    /// Trading days with data to collect.
    pub days: usize,
    pub adv_min: f64,
    pub adv_max: f64,
    pub price_min: f64,
    pub price_max: f64,
    /// Rows kept after sorting.
    pub limit: usize,
    /// Minimum observations per symbol.
    pub min_days: usize,
}

impl Default for ScreenParams {
    fn default() -> Self {
        Self {
            days: 20,
            adv_min: 5e6,
            adv_max: 1.5e8,
            price_min: 1.0,
            price_max: 20.0,
            limit: 25,
            min_days: 10,
        }
    }
}

/// One passing symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenRow {
    pub symbol: String,
    pub last_close: f64,
    pub avg_dollar_volume: f64,
    pub daily_move: f64,
    pub stdev_move: f64,
    pub annualized_vol: f64,
    pub observations: usize,
    pub last_date: NaiveDate,
}

/// Where the screen gets its daily bars.
pub trait DailyBarSource {
    /// Every symbol's bar for `date`; empty on non-trading days.
    fn grouped_daily(&self, date: NaiveDate) -> Result<Vec<GroupedBar>, FetchError>;

    /// Wait between days.
    fn pace(&self);
}

impl<T: HttpTransport> DailyBarSource for PolygonClient<T> {
    fn grouped_daily(&self, date: NaiveDate) -> Result<Vec<GroupedBar>, FetchError> {
        PolygonClient::grouped_daily(self, date)
    }

    fn pace(&self) {
        self.fetcher().pace();
    }
}

/// `count` consecutive calendar dates ending at `today`, newest first.
pub fn candidate_dates(today: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (0..count)
        .map_while(|i| today.checked_sub_signed(Duration::days(i as i64)))
        .collect()
}

#[derive(Debug)]
struct SymbolHistory {
    dollar_volumes: Vec<f64>,
    moves: Vec<f64>,
    last_close: f64,
    last_date: NaiveDate,
}

/// Accumulates bars day by day, newest day first.
#[derive(Debug, Default)]
pub struct Screener {
    index: HashMap<String, usize>,
    histories: Vec<(String, SymbolHistory)>,
}

impl Screener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one day's bars. Every ingested day overwrites a symbol's last
    /// close and date, so with days arriving newest first they end up at
    /// the oldest fetched day.
    ///
    /// Bars missing ticker, close, volume or VWAP are ignored.
    pub fn ingest_day(&mut self, date: NaiveDate, bars: &[GroupedBar]) {
        for bar in bars {
            let (Some(ticker), Some(close), Some(dollar)) =
                (bar.ticker.as_deref(), bar.close, bar.dollar_volume())
            else {
                continue;
            };
            if ticker.is_empty() {
                continue;
            }
            let slot = match self.index.get(ticker) {
                Some(&i) => i,
                None => {
                    self.index.insert(ticker.to_string(), self.histories.len());
                    self.histories.push((
                        ticker.to_string(),
                        SymbolHistory {
                            dollar_volumes: Vec::new(),
                            moves: Vec::new(),
                            last_close: close,
                            last_date: date,
                        },
                    ));
                    self.histories.len() - 1
                }
            };
            let history = &mut self.histories[slot].1;
            history.last_close = close;
            history.last_date = date;
            history.dollar_volumes.push(dollar);
            if let Some(m) = bar.abs_move() {
                history.moves.push(m);
            }
        }
    }

    /// Symbols tracked so far.
    pub fn symbol_count(&self) -> usize {
        self.histories.len()
    }

    /// Apply the filters, sort by (annualized vol, ADV) descending and keep
    /// `params.limit` rows. Ties keep first-seen order.
    pub fn finish(self, params: &ScreenParams) -> Vec<ScreenRow> {
        let mut rows: Vec<ScreenRow> = self
            .histories
            .into_iter()
            .filter_map(|(symbol, h)| {
                let observations = h.dollar_volumes.len();
                if observations < params.min_days {
                    return None;
                }
                let adv = mean(&h.dollar_volumes);
                if adv < params.adv_min || adv > params.adv_max {
                    return None;
                }
                if h.last_close < params.price_min || h.last_close > params.price_max {
                    return None;
                }
                if h.moves.is_empty() {
                    return None;
                }
                let stdev = std_dev(&h.moves);
                Some(ScreenRow {
                    symbol,
                    last_close: h.last_close,
                    avg_dollar_volume: adv,
                    daily_move: mean(&h.moves),
                    stdev_move: stdev,
                    annualized_vol: stdev * TRADING_DAYS_PER_YEAR.sqrt(),
                    observations,
                    last_date: h.last_date,
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.annualized_vol
                .total_cmp(&a.annualized_vol)
                .then(b.avg_dollar_volume.total_cmp(&a.avg_dollar_volume))
        });
        rows.truncate(params.limit);
        rows
    }
}

/// Run the screen against `source`, starting at `today`.
///
/// Looks at up to `2 × days` calendar dates and stops after `days` dates
/// returned bars. Pacing happens after every date that had data. Any fetch
/// failure aborts the screen.
pub fn run_screen(
    source: &dyn DailyBarSource,
    params: &ScreenParams,
    today: NaiveDate,
    verbose: bool,
) -> Result<Vec<ScreenRow>, FetchError> {
    let mut screener = Screener::new();
    let mut trading_days = 0;

    for date in candidate_dates(today, params.days.saturating_mul(2)) {
        if trading_days >= params.days {
            break;
        }
        let bars = source.grouped_daily(date)?;
        if bars.is_empty() {
            debug!(%date, "no bars, skipping");
            continue;
        }
        trading_days += 1;
        if verbose {
            eprintln!("Fetched {} rows for {date}", bars.len());
        }
        screener.ingest_day(date, &bars);
        source.pace();
    }

    info!(
        trading_days,
        symbols = screener.symbol_count(),
        "screen data collected"
    );
    Ok(screener.finish(params))
}

/// Console table: dollar volume in millions, moves as percentages.
pub fn render_screen_table(rows: &[ScreenRow]) -> String {
    if rows.is_empty() {
        return "No symbols met the filters.\n".to_string();
    }
    let mut out = String::from(
        "symbol last_close avg_dollar_volume daily_move stdev_move annualized_vol obs last_date\n",
    );
    for r in rows {
        let _ = writeln!(
            out,
            "{:6} {:9.2} {:17.2}M {:9.2}% {:9.2}% {:9.2}% {:3} {}",
            r.symbol,
            r.last_close,
            r.avg_dollar_volume / 1e6,
            r.daily_move * 100.0,
            r.stdev_move * 100.0,
            r.annualized_vol * 100.0,
            r.observations,
            r.last_date
        );
    }
    out
}
