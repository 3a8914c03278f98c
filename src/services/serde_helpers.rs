//! Request-body deserializers shared by the service DTOs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{de, Deserialize, Deserializer};

/// Keeps "absent" and "explicit null" apart for nullable columns.
///
/// Use with `#[serde(default, deserialize_with = "...")]`: a missing key stays
/// `None`, `null` becomes `Some(None)`.
pub fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses RFC 3339, a naive date-time (read as UTC) or a bare `YYYY-MM-DD`
/// (UTC midnight).
pub fn parse_flexible_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

fn flexible_datetime_from_str<E: de::Error>(raw: &str) -> Result<DateTime<Utc>, E> {
    parse_flexible_datetime(raw).ok_or_else(|| {
        E::custom(format!(
            "invalid date `{}`, expected YYYY-MM-DD or an ISO 8601 date-time",
            raw
        ))
    })
}

pub mod flexible_datetime {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        flexible_datetime_from_str(&raw)
    }
}

pub mod option_flexible_datetime {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| flexible_datetime_from_str(&raw))
            .transpose()
    }
}
