//! Timestamp type tolerant of the formats the API emits.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Naive layouts tried after RFC 3339, most precise first.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

/// Date-only layout, interpreted as midnight UTC.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// An instant that decodes from several timestamp layouts.
///
/// Accepted inputs, in order:
///
/// 1. RFC 3339 with or without fractional seconds
/// 2. `YYYY-MM-DDTHH:MM:SS.fffffffff` without offset (read as UTC)
/// 3. `YYYY-MM-DDTHH:MM:SS` without offset (read as UTC)
/// 4. `YYYY-MM-DD`
///
/// JSON `null` and `""` decode to the zero value, which encodes back to `null`.
/// Non-zero values encode as RFC 3339 in UTC with up to nanosecond precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlexibleTime(Option<DateTime<Utc>>);

impl FlexibleTime {
    /// The zero value.
    pub const fn zero() -> Self {
        Self(None)
    }

    /// Wraps an instant.
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(Some(instant))
    }

    /// Returns true for the zero value.
    pub fn is_zero(&self) -> bool {
        self.0.is_none()
    }

    /// The wrapped instant, if any.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// Parses one of the accepted layouts. Empty input yields the zero value.
    ///
    /// # Errors
    ///
    /// Returns a description of the input when no layout matches.
    pub fn parse(input: &str) -> Result<Self, String> {
        if input.is_empty() {
            return Ok(Self::zero());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self::new(dt.with_timezone(&Utc)));
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(Self::new(naive.and_utc()));
            }
        }

        if let Some(naive) = NaiveDate::parse_from_str(input, DATE_FORMAT)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(Self::new(naive.and_utc()));
        }

        Err(format!("unrecognized timestamp: {input:?}"))
    }
}

impl From<DateTime<Utc>> for FlexibleTime {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::new(instant)
    }
}

impl fmt::Display for FlexibleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(instant) => f.write_str(&instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => Ok(()),
        }
    }
}

impl Serialize for FlexibleTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(instant) => {
                serializer.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            None => serializer.serialize_none(),
        }
    }
}

struct FlexibleTimeVisitor;

impl<'de> Visitor<'de> for FlexibleTimeVisitor {
    type Value = FlexibleTime;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a timestamp string or null")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        FlexibleTime::parse(value).map_err(E::custom)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(FlexibleTime::zero())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_str(self)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(FlexibleTime::zero())
    }
}

impl<'de> Deserialize<'de> for FlexibleTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_option(FlexibleTimeVisitor)
    }
}
