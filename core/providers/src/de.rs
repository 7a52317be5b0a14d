//! Lenient field decoders shared by the vendor payload types.
//!
//! Vendor payloads disagree on whether numbers are JSON numbers or strings,
//! and leave fields out or set them to null at will. Everything optional is
//! decoded through these helpers so a malformed field degrades to `None`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// String, number or null; blank strings become `None`.
pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::String(s)) => non_empty(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Number or numeric string; anything else becomes `None`.
pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|f| f.is_finite()))
}

/// Integer or integer string; anything else becomes `None`.
pub fn opt_i32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Integer or integer string, defaulting to zero.
pub fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

/// A list that XML-to-JSON bridges collapse to a bare object when it has one element.
pub fn one_or_many<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(d)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}

/// Decode list entries one by one, dropping those that do not fit `T`.
///
/// Pair with `one_or_many` into `Vec<Value>` so one bad element cannot fail a whole page.
pub fn decode_each<T: DeserializeOwned>(vendor: &str, items: Vec<Value>) -> Vec<T> {
    let mut decoded = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value(item) {
            Ok(value) => decoded.push(value),
            Err(e) => warn!(vendor, index, error = %e, "Skipping undecodable list entry"),
        }
    }
    decoded
}

/// Parse the timestamp formats seen across vendors. Naive times are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    // 2024-05-01T12:00:00.000+0000
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(ts.with_timezone(&Utc));
    }

    for format in ["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// Trim and drop empty strings.
pub fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[derive(Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "opt_string")]
        id: Option<String>,
        #[serde(default, deserialize_with = "opt_f64")]
        lat: Option<f64>,
        #[serde(default, deserialize_with = "opt_i32")]
        year: Option<i32>,
        #[serde(default, deserialize_with = "one_or_many")]
        items: Vec<u32>,
    }

    #[test]
    fn test_lenient_fields() {
        let p: Fields =
            serde_json::from_str(r#"{"id": 42, "lat": "33.5", "year": "2019", "items": 7}"#)
                .unwrap();
        assert_eq!(p.id.as_deref(), Some("42"));
        assert_eq!(p.lat, Some(33.5));
        assert_eq!(p.year, Some(2019));
        assert_eq!(p.items, vec![7]);
    }

    #[test]
    fn test_garbage_becomes_none() {
        let p: Fields =
            serde_json::from_str(r#"{"id": "  ", "lat": "north", "year": {"y": 1}, "items": null}"#)
                .unwrap();
        assert_eq!(p.id, None);
        assert_eq!(p.lat, None);
        assert_eq!(p.year, None);
        assert!(p.items.is_empty());

        let empty: Fields = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.id, None);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Entry {
        id: String,
    }

    #[test]
    fn test_decode_each_skips_bad_entries() {
        let items = vec![
            serde_json::json!({"id": "a"}),
            Value::Null,
            serde_json::json!({"name": "no id"}),
            serde_json::json!({"id": "b"}),
        ];
        let entries: Vec<Entry> = decode_each("Test", items);
        assert_eq!(
            entries,
            vec![Entry { id: "a".into() }, Entry { id: "b".into() }]
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2024-05-01T12:30:00Z").unwrap();
        assert_eq!(rfc.hour(), 12);

        let offset = parse_timestamp("2024-05-01T12:30:00.000+0200").unwrap();
        assert_eq!(offset.hour(), 10);

        let slashed = parse_timestamp("2024/05/01 08:15:00").unwrap();
        assert_eq!(slashed.day(), 1);
        assert_eq!(slashed.minute(), 15);

        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
