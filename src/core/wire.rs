//! Lenient serde helpers for the JSON shapes the frontend, import files and
//! the AI model actually send.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

use super::task::DEFAULT_USER_ID;

/// Parse an instant written as RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS]`
/// (taken as UTC) or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format an instant the way `Date.toISOString()` does.
pub fn format_instant(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// `Option<DateTime<Utc>>` that tolerates empty strings and unparseable text.
pub mod instant {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&format_instant(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Scalar>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Scalar::Text(s)) => {
                let parsed = parse_instant(&s);
                if parsed.is_none() && !s.trim().is_empty() {
                    log::debug!("Dropping unparseable timestamp {:?}", s);
                }
                parsed
            }
            // Epoch milliseconds, as produced by `Date.now()`
            Some(Scalar::Int(ms)) => DateTime::from_timestamp_millis(ms),
            _ => None,
        })
    }
}

/// User ids arrive as strings or numbers; missing or null means the default user.
pub fn user_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Scalar>::deserialize(deserializer)?;
    Ok(scalar_to_string(raw).unwrap_or_else(|| DEFAULT_USER_ID.to_string()))
}

/// Like [`user_id`] but keeps absence as `None`. Also used for task ids.
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Scalar>::deserialize(deserializer)?;
    Ok(scalar_to_string(raw))
}

fn scalar_to_string(raw: Option<Scalar>) -> Option<String> {
    match raw? {
        Scalar::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Scalar::Text(_) => None,
        Scalar::Int(n) => Some(n.to_string()),
        Scalar::Float(f) if f.fract() == 0.0 => Some(format!("{}", f as i64)),
        Scalar::Float(f) => Some(f.to_string()),
        Scalar::Bool(_) => None,
    }
}

/// Integer field that may be written as a number or a numeric string.
pub(crate) fn loose_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Scalar>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Scalar::Int(n)) => Some(n),
        Some(Scalar::Float(f)) => Some(f.round() as i64),
        Some(Scalar::Text(s)) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    })
}
