//! Forgiving field decoders for provider payloads.
//!
//! Providers are inconsistent about scalar types (fiscal years arrive as both
//! `2024` and `"2024"`, EPS figures occasionally as strings). A field that
//! cannot be interpreted decodes to `None` instead of failing the whole page.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

pub(crate) fn opt_i32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// ISO `YYYY-MM-DD`; a timestamp suffix (`2024-01-25T21:30:00Z`) is tolerated.
pub(crate) fn opt_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => {
            let day = s.trim().get(..10).unwrap_or("");
            NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "opt_string")]
        s: Option<String>,
        #[serde(default, deserialize_with = "opt_f64")]
        f: Option<f64>,
        #[serde(default, deserialize_with = "opt_i32")]
        i: Option<i32>,
        #[serde(default, deserialize_with = "opt_date")]
        d: Option<NaiveDate>,
    }

    fn sample(json: &str) -> Sample {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn numbers_and_strings_are_interchangeable() {
        let p = sample(r#"{"s": 3, "f": "1.25", "i": "2024", "d": "2024-02-01"}"#);
        assert_eq!(p.s.as_deref(), Some("3"));
        assert_eq!(p.f, Some(1.25));
        assert_eq!(p.i, Some(2024));
        assert_eq!(p.d, NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn garbage_decodes_to_none() {
        let p = sample(r#"{"s": "  ", "f": "n/a", "i": 1.5, "d": "soon"}"#);
        assert!(p.s.is_none());
        assert!(p.f.is_none());
        assert!(p.i.is_none());
        assert!(p.d.is_none());
    }

    #[test]
    fn missing_and_null_are_none() {
        let p = sample(r#"{"s": null}"#);
        assert!(p.s.is_none() && p.f.is_none() && p.i.is_none() && p.d.is_none());
    }

    #[test]
    fn timestamp_suffix_is_ignored() {
        let p = sample(r#"{"d": "2024-01-25T21:30:00Z"}"#);
        assert_eq!(p.d, NaiveDate::from_ymd_opt(2024, 1, 25));
    }
}
