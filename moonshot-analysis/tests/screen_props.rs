//! Screener invariants over random daily bars.

use chrono::{Duration, NaiveDate};
use moonshot_analysis::screen::{ScreenParams, Screener};
use moonshot_core::domain::GroupedBar;
use proptest::prelude::*;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

fn bar(symbol: u8, open: f64, close: f64, volume: f64) -> GroupedBar {
    GroupedBar {
        ticker: Some(format!("T{symbol}")),
        open: Some(open),
        close: Some(close),
        volume: Some(volume),
        vwap: Some((open + close) / 2.0),
    }
}

fn day_strategy() -> impl Strategy<Value = Vec<(u8, f64, f64, f64)>> {
    prop::collection::vec((0u8..12, 0.5f64..30.0, 0.5f64..30.0, 1e4f64..2e7), 0..20)
}

proptest! {
    #[test]
    fn output_is_filtered_sorted_and_limited(
        days in prop::collection::vec(day_strategy(), 1..15),
        limit in 1usize..8,
        min_days in 1usize..5,
    ) {
        let params = ScreenParams {
            days: days.len(),
            limit,
            min_days,
            ..ScreenParams::default()
        };
        let mut screener = Screener::new();
        for (i, bars) in days.iter().enumerate() {
            let bars: Vec<GroupedBar> =
                bars.iter().map(|&(s, o, c, v)| bar(s, o, c, v)).collect();
            screener.ingest_day(today() - Duration::days(i as i64), &bars);
        }
        let rows = screener.finish(&params);

        prop_assert!(rows.len() <= limit);
        for row in &rows {
            prop_assert!(row.observations >= min_days);
            prop_assert!(row.avg_dollar_volume >= params.adv_min);
            prop_assert!(row.avg_dollar_volume <= params.adv_max);
            prop_assert!(row.last_close >= params.price_min && row.last_close <= params.price_max);
            prop_assert!(row.annualized_vol >= 0.0);
            prop_assert!(row.last_date <= today());
        }
        for pair in rows.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(
                a.annualized_vol > b.annualized_vol
                    || (a.annualized_vol == b.annualized_vol
                        && a.avg_dollar_volume >= b.avg_dollar_volume)
            );
        }
    }
}
