// Serde helpers for the backend's loosely typed JSON

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a backend timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Monetary amount sent either as a JSON number or a decimal string.
pub mod amount {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        value_to_amount(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("expected a number or decimal string, got {}", value))
        })
    }

    pub(super) fn value_to_amount(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Optional variant of [`amount`]; `null` or a missing field is `None`.
pub mod opt_amount {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(v) => amount::value_to_amount(&v)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid amount {}", v))),
        }
    }
}

/// Timestamp that may lack an offset.
pub mod timestamp {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {:?}", raw)))
    }
}

pub mod opt_timestamp {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {:?}", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Priced {
        #[serde(with = "amount")]
        price: f64,
        #[serde(default, with = "opt_amount")]
        deposit: Option<f64>,
        #[serde(with = "timestamp")]
        at: DateTime<Utc>,
        #[serde(default, with = "opt_timestamp")]
        processed_at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_amount_from_string_and_number() {
        let a: Priced =
            serde_json::from_str(r#"{"price": "149.50", "at": "2025-06-01T12:00:00"}"#).unwrap();
        assert_eq!(a.price, 149.5);
        assert!(a.deposit.is_none());

        let b: Priced = serde_json::from_str(
            r#"{"price": 80, "deposit": "20.00", "at": "2025-06-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(b.price, 80.0);
        assert_eq!(b.deposit, Some(20.0));
    }

    #[test]
    fn test_amount_rejects_garbage() {
        let res: Result<Priced, _> =
            serde_json::from_str(r#"{"price": "abc", "at": "2025-06-01T12:00:00"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_timestamp_naive_is_utc() {
        let naive = parse_timestamp("2025-06-01T12:00:00.123456").unwrap();
        let zoned = parse_timestamp("2025-06-01T14:00:00.123456+02:00").unwrap();
        assert_eq!(naive, zoned);
    }

    #[test]
    fn test_timestamp_date_only() {
        let dt = parse_timestamp("2025-06-01").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-06-01T00:00:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_opt_timestamp_null() {
        let p: Priced = serde_json::from_str(
            r#"{"price": 1, "at": "2025-06-01 08:30:00", "processed_at": null}"#,
        )
        .unwrap();
        assert!(p.processed_at.is_none());
        assert_eq!(p.at.to_rfc3339(), "2025-06-01T08:30:00+00:00");
    }
}
