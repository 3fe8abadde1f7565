//! Polygon grouped-daily aggregate bar.

use super::lenient;
use serde::{Deserialize, Serialize};

/// One ticker's daily aggregate from
/// `/v2/aggs/grouped/locale/us/market/stocks/{date}`.
///
/// Polygon uses single-letter keys; any of them may be missing for thinly
/// traded or halted symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedBar {
    #[serde(rename = "T", default, deserialize_with = "lenient::opt_string")]
    pub ticker: Option<String>,
    #[serde(rename = "o", default, deserialize_with = "lenient::opt_f64")]
    pub open: Option<f64>,
    #[serde(rename = "c", default, deserialize_with = "lenient::opt_f64")]
    pub close: Option<f64>,
    #[serde(rename = "v", default, deserialize_with = "lenient::opt_f64")]
    pub volume: Option<f64>,
    #[serde(rename = "vw", default, deserialize_with = "lenient::opt_f64")]
    pub vwap: Option<f64>,
}

impl GroupedBar {
    /// Dollar volume (`volume × vwap`), when both are present.
    pub fn dollar_volume(&self) -> Option<f64> {
        Some(self.volume? * self.vwap?)
    }

    /// Absolute open-to-close move as a fraction of the open.
    ///
    /// `None` when either price is missing or the open is not positive.
    pub fn abs_move(&self) -> Option<f64> {
        let open = self.open.filter(|o| *o > 0.0)?;
        Some(((self.close? - open) / open).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_polygon_keys() {
        let bar: GroupedBar =
            serde_json::from_str(r#"{"T":"SOUN","o":5.0,"c":5.5,"v":1000000,"vw":5.2,"n":812}"#)
                .unwrap();
        assert_eq!(bar.ticker.as_deref(), Some("SOUN"));
        assert_eq!(bar.dollar_volume(), Some(5_200_000.0));
        assert!((bar.abs_move().unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn zero_open_has_no_move() {
        let bar: GroupedBar = serde_json::from_str(r#"{"T":"X","o":0,"c":1.0}"#).unwrap();
        assert!(bar.abs_move().is_none());
        assert!(bar.dollar_volume().is_none());
    }
}
