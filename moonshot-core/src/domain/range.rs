//! Inclusive calendar date range for a logical query.

use crate::validate::ConfigError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive `[start, end]` range. Construction rejects `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::StartAfterEnd { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Calendar months touched by the range, counting both end months.
    ///
    /// Jan 15 → Dec 10 of the same year is 12 months.
    pub fn month_span(&self) -> i32 {
        (self.end.year() - self.start.year()) * 12
            + (self.end.month() as i32 - self.start.month() as i32)
            + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rejects_inverted_range() {
        let err = DateRange::new(d(2024, 5, 1), d(2024, 4, 30)).unwrap_err();
        assert!(matches!(err, ConfigError::StartAfterEnd { .. }));
    }

    #[test]
    fn single_day_is_valid() {
        let r = DateRange::new(d(2024, 5, 1), d(2024, 5, 1)).unwrap();
        assert_eq!(r.month_span(), 1);
    }

    #[test]
    fn month_span_counts_both_ends() {
        let r = DateRange::new(d(2024, 1, 15), d(2024, 12, 10)).unwrap();
        assert_eq!(r.month_span(), 12);
        let r = DateRange::new(d(2023, 11, 30), d(2024, 2, 1)).unwrap();
        assert_eq!(r.month_span(), 4);
    }
}
