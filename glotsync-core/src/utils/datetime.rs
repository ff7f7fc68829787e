//! Serde helpers for `DateTime<Utc>`.
//!
//! Written as RFC3339; read from RFC3339 or a Unix timestamp in seconds or milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Timestamps above this are treated as milliseconds.
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Number(i64),
}

fn from_raw(raw: RawTimestamp) -> Result<DateTime<Utc>, String> {
    match raw {
        RawTimestamp::Text(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("Invalid RFC3339 timestamp: {e}")),
        RawTimestamp::Number(n) => {
            let parsed = if n.abs() >= MILLIS_THRESHOLD {
                DateTime::from_timestamp_millis(n)
            } else {
                DateTime::from_timestamp(n, 0)
            };
            parsed.ok_or_else(|| format!("Invalid Unix timestamp: {n}"))
        }
    }
}

pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    from_raw(RawTimestamp::deserialize(deserializer)?).map_err(serde::de::Error::custom)
}
