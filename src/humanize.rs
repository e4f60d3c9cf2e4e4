//! Human-readable duration parsing and formatting utilities

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    #[error("Duration out of range: {0}")]
    Overflow(String),
}

/// Duration wrapper accepting `"500ms"`, `"3s"`, `"2m"`, `"1h"` or plain milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn from_millis(ms: u64) -> Self {
        HumanDuration(Duration::from_millis(ms))
    }

    pub fn from_secs(secs: u64) -> Self {
        HumanDuration(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_human_readable(&self) -> String {
        const UNITS: &[(&str, u128)] = &[
            ("h", 60 * 60 * 1000),
            ("m", 60 * 1000),
            ("s", 1000),
        ];

        let ms = self.0.as_millis();
        for &(unit, divisor) in UNITS {
            if ms >= divisor && ms % divisor == 0 {
                return format!("{}{}", ms / divisor, unit);
            }
        }
        format!("{}ms", ms)
    }
}

impl From<HumanDuration> for Duration {
    fn from(value: HumanDuration) -> Self {
        value.0
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct HumanDurationVisitor;

        impl<'de> serde::de::Visitor<'de> for HumanDurationVisitor {
            type Value = HumanDuration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration as string (e.g., \"500ms\", \"3s\") or integer milliseconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(HumanDuration::from_millis(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(HumanDuration::from_millis)
                    .map_err(|_| E::custom("duration must not be negative"))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<HumanDuration>().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(HumanDurationVisitor)
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_human_readable())
    }
}

impl FromStr for HumanDuration {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        // Plain number means milliseconds
        if let Ok(ms) = s.parse::<u64>() {
            return Ok(HumanDuration::from_millis(ms));
        }

        let (num_str, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
            Some(0) | None => return Err(ParseError::InvalidFormat(s.to_string())),
            Some(pos) => (&s[..pos], &s[pos..]),
        };

        let num: u64 = num_str.parse()?;

        let multiplier_ms = match unit.trim() {
            "ms" => 1,
            "s" | "sec" | "secs" => 1000,
            "m" | "min" | "mins" => 60 * 1000,
            "h" | "hr" | "hrs" => 60 * 60 * 1000,
            _ => return Err(ParseError::InvalidUnit(unit.to_string())),
        };

        let ms = num
            .checked_mul(multiplier_ms)
            .ok_or_else(|| ParseError::Overflow(s.to_string()))?;
        Ok(HumanDuration::from_millis(ms))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}
