// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Switch port identifiers.

use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

/// Identifier of a physical port (uplink or LAN facing) of a gateway device.
///
/// Ordering is *lexicographic over the decimal representation*, not numeric: `10 < 2`.
/// Weighted egress selection walks uplinks in this order, so it is part of the observable
/// behavior and must stay as is.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PortId(u32);

impl PortId {
    /// Create a [`PortId`] from its number
    #[must_use]
    pub const fn new(port: u32) -> PortId {
        PortId(port)
    }

    /// The port number
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    fn decimal(self, buf: &mut [u8; 10]) -> &[u8] {
        let mut value = self.0;
        let mut start = buf.len();
        loop {
            start -= 1;
            #[allow(clippy::cast_possible_truncation)] // a single decimal digit
            {
                buf[start] = b'0' + (value % 10) as u8;
            }
            value /= 10;
            if value == 0 {
                break;
            }
        }
        &buf[start..]
    }
}

impl Ord for PortId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (mut a, mut b) = ([0u8; 10], [0u8; 10]);
        self.decimal(&mut a).cmp(other.decimal(&mut b))
    }
}

impl PartialOrd for PortId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<u32> for PortId {
    fn from(value: u32) -> Self {
        PortId(value)
    }
}

impl Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string is not a port number
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid port number: '{0}'")]
pub struct PortIdParseError(pub String);

impl FromStr for PortId {
    type Err = PortIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(PortId)
            .map_err(|_| PortIdParseError(s.to_string()))
    }
}
