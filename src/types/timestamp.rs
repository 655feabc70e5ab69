//! Wire Timestamps
//!
//! Every timestamp that crosses the API or lands in a snapshot serializes
//! as ISO-8601 UTC with exactly millisecond precision. Values are also
//! truncated to milliseconds at creation so serialize/deserialize
//! round-trips compare equal.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Current wall time at wire precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Serialize as RFC 3339 with three fractional digits.
pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Wrapped {
        #[serde(with = "super")]
        at: DateTime<Utc>,
    }

    #[test]
    fn test_always_three_fractional_digits() {
        let whole: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let json = serde_json::to_string(&Wrapped { at: whole }).unwrap();
        assert_eq!(json, r#"{"at":"2024-01-01T00:00:00.000Z"}"#);

        let fractional: DateTime<Utc> = "2024-01-01T00:00:00.123Z".parse().unwrap();
        let json = serde_json::to_string(&Wrapped { at: fractional }).unwrap();
        assert_eq!(json, r#"{"at":"2024-01-01T00:00:00.123Z"}"#);
    }

    #[test]
    fn test_now_round_trips_exactly() {
        let original = Wrapped { at: now() };
        let json = serde_json::to_string(&original).unwrap();
        let reparsed: Wrapped = serde_json::from_str(&json).unwrap();
        assert_eq!(reparsed, original);
    }
}
