// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Largest value representable by a 48-bit hardware address.
pub const MAX_BSSID: u64 = 0xFFFF_FFFF_FFFF;

/// A 48-bit hardware address in its canonical integer form.
///
/// Datasets use this value as the storage and comparison key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bssid(u64);

/// Errors produced when building a [`Bssid`] from a raw value or text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseBssidError {
    #[error("value {0} does not fit in 48 bits")]
    OutOfRange(u64),

    #[error("negative value {0} is not a hardware address")]
    Negative(i64),

    #[error("'{0}' is not a hardware address")]
    Unrecognized(String),
}

impl Bssid {
    /// Wrap a raw value, rejecting anything above [`MAX_BSSID`].
    pub const fn new(value: u64) -> Option<Self> {
        if value <= MAX_BSSID {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The value as SQLite stores it. Always non-negative.
    pub const fn as_i64(self) -> i64 {
        self.0 as i64
    }

    /// Twelve upper-case hex digits without separators.
    pub fn to_hex(self) -> String {
        format!("{:012X}", self.0)
    }

    /// Upper-case hex octets joined by `:`; the display form.
    pub fn to_colon(self) -> String {
        self.separated(':')
    }

    /// Upper-case hex octets joined by `-`.
    pub fn to_dash(self) -> String {
        self.separated('-')
    }

    fn separated(self, separator: char) -> String {
        let mut out = String::with_capacity(17);
        for (i, c) in self.to_hex().chars().enumerate() {
            if i > 0 && i % 2 == 0 {
                out.push(separator);
            }
            out.push(c);
        }
        out
    }
}

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_colon())
    }
}

impl FromStr for Bssid {
    type Err = ParseBssidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::decimal_of(s).ok_or_else(|| ParseBssidError::Unrecognized(s.to_owned()))
    }
}

impl TryFrom<u64> for Bssid {
    type Error = ParseBssidError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ParseBssidError::OutOfRange(value))
    }
}

impl TryFrom<i64> for Bssid {
    type Error = ParseBssidError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let unsigned = u64::try_from(value).map_err(|_| ParseBssidError::Negative(value))?;
        Self::try_from(unsigned)
    }
}

impl From<Bssid> for u64 {
    fn from(value: Bssid) -> Self {
        value.0
    }
}

impl Serialize for Bssid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_colon())
    }
}

impl<'de> Deserialize<'de> for Bssid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Integer(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Integer(value) => Bssid::try_from(value).map_err(serde::de::Error::custom),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}
