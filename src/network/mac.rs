use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 48-bit hardware address.
///
/// Every MAC that enters the crate goes through [`MacAddress::from_str`], so two
/// addresses that differ only in case or delimiter style compare equal. The
/// canonical text form is uppercase and colon-delimited (`00:11:22:AA:BB:CC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacParseError {
    #[error("empty MAC address")]
    Empty,
    #[error("malformed MAC address '{0}'")]
    Malformed(String),
}

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Parse an optional device-reported value. Empty strings and values that are not a MAC
    /// (e.g. an LLDP chassis id of another subtype) yield `None`.
    pub fn parse_optional(raw: Option<&str>) -> Option<Self> {
        raw.map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    /// Accepts `00:11:22:33:44:55`, `00-11-22-33-44-55`, `0011.2233.4455` and
    /// `001122334455`, in any letter case. Colon/dash groups may drop a leading zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(MacParseError::Empty);
        }
        let malformed = || MacParseError::Malformed(trimmed.to_string());

        let digits: String = if trimmed.contains([':', '-']) {
            let groups: Vec<&str> = trimmed.split([':', '-']).collect();
            if groups.len() != 6 || groups.iter().any(|g| g.is_empty() || g.len() > 2) {
                return Err(malformed());
            }
            groups.iter().map(|g| format!("{:0>2}", g)).collect()
        } else if trimmed.contains('.') {
            let groups: Vec<&str> = trimmed.split('.').collect();
            if groups.len() != 3 || groups.iter().any(|g| g.len() != 4) {
                return Err(malformed());
            }
            groups.concat()
        } else {
            trimmed.to_string()
        };

        if digits.len() != 12 {
            return Err(malformed());
        }
        let bytes = hex::decode(&digits).map_err(|_| malformed())?;
        let octets: [u8; 6] = bytes.try_into().map_err(|_| malformed())?;
        Ok(MacAddress(octets))
    }
}

impl Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

// Serialized as the canonical string so it can be used as a JSON map key.

impl Serialize for MacAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
