//! Calibration report over a small message export.

use std::path::{Path, PathBuf};

use moonshot_analysis::calibration::{summarize_file, PolarityBucket};
use moonshot_core::ConfigError;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/calibration_small.csv")
}

const EXPECTED: &str = "\
Total StockTwits messages: 10
Total ticker-days:        5

Polarity overlap:
  Both Bullish                     2 ( 40.0%)
  Both Bearish                     1 ( 20.0%)
  Both Neutral                     1 ( 20.0%)
  ST Bullish / Reddit Non-Pos      1 ( 20.0%)

Corr(st_weighted, reddit_avg): 0.870
Corr(st_simple, reddit_avg):   0.813

Follower-weighted averages (sample):
  Mean ST weighted: 0.254
  Mean Reddit avg:  0.106
";

#[test]
fn report_matches_reference_output() {
    let summary = summarize_file(&fixture()).unwrap();
    assert_eq!(summary.render(), EXPECTED);
}

#[test]
fn symbols_are_case_folded_into_one_day() {
    let summary = summarize_file(&fixture()).unwrap();
    assert_eq!(summary.message_rows, 10);
    assert_eq!(summary.ticker_days(), 5);

    let ((day, symbol), aapl) = &summary.days[0];
    assert_eq!((day.as_str(), symbol.as_str()), ("2024-05-01", "AAPL"));
    assert_eq!(aapl.messages, 3);
    assert_eq!((aapl.bullish, aapl.bearish), (2, 1));
    // Reddit aggregates come from the first row of the day.
    assert_eq!(aapl.reddit_avg, 0.42);
    assert!((aapl.weighted_avg() - 1450.0 / 1550.0).abs() < 1e-12);
}

#[test]
fn zero_follower_day_falls_back_to_simple_average() {
    let summary = summarize_file(&fixture()).unwrap();
    let (_, gme) = summary
        .days
        .iter()
        .find(|((_, s), _)| s == "GME")
        .unwrap();
    assert_eq!(gme.followers, 0.0);
    assert!((gme.weighted_avg() - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(gme.bucket(), PolarityBucket::StBullishRedditNonPositive);
}

#[test]
fn missing_file_is_a_config_error() {
    let err = summarize_file(Path::new("/nonexistent/calibration.csv")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingInput(_))
    ));
}

#[test]
fn malformed_row_names_the_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(
        &path,
        "day,symbol,st_label,st_followers\n2024-05-01,AAPL,Bullish,10\n2024-05-01\n",
    )
    .unwrap();
    let err = summarize_file(&path).unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("calibration row 2"), "{chain}");
}
