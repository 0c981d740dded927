//! Serde helpers for server payloads.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;

/// Ids that the server may send either as JSON numbers or as numeric strings.
pub mod string_or_u64 {
    use super::{Deserializer, Serializer, Visitor, de, fmt};

    /// Serializes a u64 as a JSON number.
    ///
    /// # Errors
    ///
    /// Returns an error if the serializer fails.
    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(*value)
    }

    /// Deserializes a u64 from a string or number.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a non-negative integer.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StringOrIntVisitor;

        impl Visitor<'_> for StringOrIntVisitor {
            type Value = u64;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer id")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value)
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(value).map_err(de::Error::custom)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value.trim().parse::<u64>().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(StringOrIntVisitor)
    }
}

/// Ids kept as strings even when the server sends numbers.
pub mod string_or_number {
    use super::{Deserializer, Visitor, de, fmt};

    /// Deserializes a string from a string or number.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is neither a string nor a number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AnyIdVisitor;

        impl Visitor<'_> for AnyIdVisitor {
            type Value = String;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer id")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value.to_string())
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value.to_string())
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value.to_string())
            }
        }

        deserializer.deserialize_any(AnyIdVisitor)
    }
}

/// Timestamps in RFC 3339 or zone-less ISO-8601 (read as UTC).
pub mod flexible_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    /// Parses a server timestamp string.
    #[must_use]
    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Deserializes a required timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a recognised timestamp.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    /// Optional variant; `null` and missing fields map to `None`.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer};

        /// Deserializes an optional timestamp.
        ///
        /// # Errors
        ///
        /// Returns an error if a present string is not a recognised timestamp.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.is_empty() => Ok(None),
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp: {raw}"))
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Ids {
        #[serde(with = "string_or_u64")]
        room: u64,
        #[serde(deserialize_with = "string_or_number::deserialize")]
        message: String,
    }

    #[test]
    fn test_ids_accept_numbers_and_strings() {
        let ids: Ids = serde_json::from_str(r#"{"room":"42","message":7}"#).unwrap();
        assert_eq!(ids.room, 42);
        assert_eq!(ids.message, "7");

        let ids: Ids = serde_json::from_str(r#"{"room":42,"message":"m1"}"#).unwrap();
        assert_eq!(ids.room, 42);
        assert_eq!(ids.message, "m1");
    }

    #[test]
    fn test_negative_room_id_rejected() {
        assert!(serde_json::from_str::<Ids>(r#"{"room":-1,"message":"m"}"#).is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        let zoned = flexible_timestamp::parse("2024-03-01T10:15:30+02:00").unwrap();
        assert_eq!(zoned.hour(), 8);

        let naive = flexible_timestamp::parse("2024-03-01T10:15:30.123").unwrap();
        assert_eq!(naive.day(), 1);
        assert_eq!(naive.hour(), 10);

        assert!(flexible_timestamp::parse("yesterday").is_none());
    }
}
