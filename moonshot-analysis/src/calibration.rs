//! StockTwits vs Reddit sentiment calibration.
//!
//! Input is one row per StockTwits message, joined with that ticker-day's
//! Reddit aggregates. Rows are grouped into ticker-days, each day is bucketed
//! by whether the two sources agree on polarity, and the per-day StockTwits
//! sentiment is correlated with Reddit's average score.

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use moonshot_core::stats::{corr, mean};
use moonshot_core::validate::require_input;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_CALIBRATION_PATH: &str = "analysis/stocktwits_reddit_calibration.csv";

/// One exported message row. Empty or absent numeric fields read as zero.
#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationRow {
    pub day: String,
    pub symbol: String,
    #[serde(default)]
    pub st_label: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub st_followers: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub reddit_mentions: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub reddit_positive: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub reddit_negative: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub reddit_avg_score: Option<f64>,
}

impl CalibrationRow {
    /// +1 bullish, -1 bearish, 0 otherwise.
    fn sentiment(&self) -> f64 {
        match self.st_label.as_deref() {
            Some("Bullish") => 1.0,
            Some("Bearish") => -1.0,
            _ => 0.0,
        }
    }
}

/// Polarity agreement between the two sources for one ticker-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolarityBucket {
    BothBullish,
    BothBearish,
    BothNeutral,
    StBullishRedditNonPositive,
    StBearishRedditNonNegative,
    Mixed,
}

impl PolarityBucket {
    /// Classify by net bullish-minus-bearish counts. First match wins.
    pub fn classify(st_net: i64, reddit_net: i64) -> Self {
        if st_net > 0 && reddit_net > 0 {
            Self::BothBullish
        } else if st_net < 0 && reddit_net < 0 {
            Self::BothBearish
        } else if st_net == 0 && reddit_net == 0 {
            Self::BothNeutral
        } else if st_net > 0 && reddit_net <= 0 {
            Self::StBullishRedditNonPositive
        } else if st_net < 0 && reddit_net >= 0 {
            Self::StBearishRedditNonNegative
        } else {
            Self::Mixed
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::BothBullish => "Both Bullish",
            Self::BothBearish => "Both Bearish",
            Self::BothNeutral => "Both Neutral",
            Self::StBullishRedditNonPositive => "ST Bullish / Reddit Non-Pos",
            Self::StBearishRedditNonNegative => "ST Bearish / Reddit Non-Neg",
            Self::Mixed => "Mixed",
        }
    }
}

impl fmt::Display for PolarityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregates for one (day, symbol).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerDay {
    pub messages: usize,
    pub bullish: i64,
    pub bearish: i64,
    pub sentiment_sum: f64,
    pub followers: f64,
    pub weighted_sum: f64,
    pub reddit_mentions: f64,
    pub reddit_positive: f64,
    pub reddit_negative: f64,
    pub reddit_avg: f64,
}

impl TickerDay {
    fn from_first(row: &CalibrationRow) -> Self {
        Self {
            reddit_mentions: row.reddit_mentions.unwrap_or(0.0),
            reddit_positive: row.reddit_positive.unwrap_or(0.0),
            reddit_negative: row.reddit_negative.unwrap_or(0.0),
            reddit_avg: row.reddit_avg_score.unwrap_or(0.0),
            ..Self::default()
        }
    }

    fn add(&mut self, row: &CalibrationRow) {
        let sentiment = row.sentiment();
        let followers = row.st_followers.unwrap_or(0.0);
        self.messages += 1;
        self.sentiment_sum += sentiment;
        self.followers += followers;
        self.weighted_sum += sentiment * followers;
        if sentiment > 0.0 {
            self.bullish += 1;
        } else if sentiment < 0.0 {
            self.bearish += 1;
        }
    }

    pub fn bucket(&self) -> PolarityBucket {
        let reddit_net = (self.reddit_positive - self.reddit_negative) as i64;
        PolarityBucket::classify(self.bullish - self.bearish, reddit_net)
    }

    /// Mean message sentiment.
    pub fn simple_avg(&self) -> f64 {
        if self.messages == 0 {
            return 0.0;
        }
        self.sentiment_sum / self.messages as f64
    }

    /// Follower-weighted sentiment; the simple average when nobody has followers.
    pub fn weighted_avg(&self) -> f64 {
        if self.followers > 0.0 {
            self.weighted_sum / self.followers
        } else {
            self.simple_avg()
        }
    }
}

/// Calibration results.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSummary {
    pub message_rows: usize,
    /// Ticker-days in first-seen order.
    pub days: Vec<((String, String), TickerDay)>,
    /// Buckets by descending count; ties keep first-seen order.
    pub buckets: Vec<(PolarityBucket, usize)>,
    pub weighted_corr: Option<f64>,
    pub simple_corr: Option<f64>,
}

impl CalibrationSummary {
    pub fn ticker_days(&self) -> usize {
        self.days.len()
    }

    pub fn weighted_series(&self) -> Vec<f64> {
        self.days.iter().map(|(_, d)| d.weighted_avg()).collect()
    }

    pub fn reddit_series(&self) -> Vec<f64> {
        self.days.iter().map(|(_, d)| d.reddit_avg).collect()
    }

    /// Plain-text report.
    pub fn render(&self) -> String {
        let total = self.ticker_days();
        let mut out = String::new();
        let _ = writeln!(out, "Total StockTwits messages: {}", self.message_rows);
        let _ = writeln!(out, "Total ticker-days:        {total}");
        out.push('\n');
        out.push_str("Polarity overlap:\n");
        for (bucket, count) in &self.buckets {
            let pct = if total > 0 {
                100.0 * *count as f64 / total as f64
            } else {
                0.0
            };
            let _ = writeln!(out, "  {:<28} {count:5} ({pct:5.1}%)", bucket.label());
        }
        out.push('\n');
        let _ = writeln!(out, "Corr(st_weighted, reddit_avg): {}", fmt_corr(self.weighted_corr));
        let _ = writeln!(out, "Corr(st_simple, reddit_avg):   {}", fmt_corr(self.simple_corr));
        out.push('\n');
        out.push_str("Follower-weighted averages (sample):\n");
        if self.days.is_empty() {
            out.push_str("  No overlap values to summarise\n");
        } else {
            let _ = writeln!(out, "  Mean ST weighted: {:.3}", mean(&self.weighted_series()));
            let _ = writeln!(out, "  Mean Reddit avg:  {:.3}", mean(&self.reddit_series()));
        }
        out
    }
}

fn fmt_corr(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |c| format!("{c:.3}"))
}

/// Group message rows into ticker-days and compute the summary.
pub fn summarize_rows(rows: &[CalibrationRow]) -> CalibrationSummary {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut days: Vec<((String, String), TickerDay)> = Vec::new();

    for row in rows {
        let key = (row.day.clone(), row.symbol.to_uppercase());
        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                index.insert(key.clone(), days.len());
                days.push((key, TickerDay::from_first(row)));
                days.len() - 1
            }
        };
        days[slot].1.add(row);
    }

    let mut buckets: Vec<(PolarityBucket, usize)> = Vec::new();
    for (_, day) in &days {
        let bucket = day.bucket();
        match buckets.iter_mut().find(|(b, _)| *b == bucket) {
            Some((_, n)) => *n += 1,
            None => buckets.push((bucket, 1)),
        }
    }
    buckets.sort_by(|a, b| b.1.cmp(&a.1));

    let weighted: Vec<f64> = days.iter().map(|(_, d)| d.weighted_avg()).collect();
    let simple: Vec<f64> = days.iter().map(|(_, d)| d.simple_avg()).collect();
    let reddit: Vec<f64> = days.iter().map(|(_, d)| d.reddit_avg).collect();

    CalibrationSummary {
        message_rows: rows.len(),
        weighted_corr: corr(&weighted, &reddit),
        simple_corr: corr(&simple, &reddit),
        days,
        buckets,
    }
}

/// Parse message rows from CSV text.
pub fn read_calibration<R: Read>(reader: R) -> Result<Vec<CalibrationRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize()
        .enumerate()
        .map(|(i, r)| r.with_context(|| format!("calibration row {}", i + 1)))
        .collect()
}

/// Load and summarize a calibration export; a missing file is a
/// configuration error.
pub fn summarize_file(path: &Path) -> Result<CalibrationSummary> {
    require_input(path)?;
    let file =
        std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let rows = read_calibration(file).with_context(|| format!("failed to parse {}", path.display()))?;
    debug!(rows = rows.len(), path = %path.display(), "calibration rows loaded");
    Ok(summarize_rows(&rows))
}
