use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Reads a [`Duration`] given as whole milliseconds.
pub fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// Reads a [`Duration`] given as whole seconds.
pub fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

/// Writes a [`Duration`] as whole milliseconds.
pub fn serialize_duration_to_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Writes a [`Duration`] as whole seconds.
pub fn serialize_duration_to_seconds<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_secs())
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Timeouts {
        #[serde(deserialize_with = "deserialize_duration_from_ms", serialize_with = "serialize_duration_to_ms")]
        backoff: Duration,
        #[serde(
            deserialize_with = "deserialize_duration_from_seconds",
            serialize_with = "serialize_duration_to_seconds"
        )]
        shutdown: Duration,
    }

    #[test]
    fn test_durations_from_numbers() {
        let timeouts: Timeouts = serde_json::from_str(r#"{ "backoff": 250, "shutdown": 30 }"#).unwrap();
        assert_eq!(timeouts.backoff, Duration::from_millis(250));
        assert_eq!(timeouts.shutdown, Duration::from_secs(30));

        assert_eq!(serde_json::to_string(&timeouts).unwrap(), r#"{"backoff":250,"shutdown":30}"#);
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        assert!(serde_json::from_str::<Timeouts>(r#"{ "backoff": -1, "shutdown": 1 }"#).is_err());
    }
}
