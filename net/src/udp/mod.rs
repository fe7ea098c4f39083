// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! UDP header type and logic.

use crate::checksum::Checksum;
use crate::parse::{DeParse, DeParseError, LengthError, Parse, ParseError, deparse_bytes};
use crate::tcp::L4ChecksumPayload;
use etherparse::UdpHeader;
use std::num::NonZero;

/// A UDP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Udp(UdpHeader);

/// Errors which may occur when parsing a UDP header
#[derive(Debug, thiserror::Error)]
pub enum UdpParseError {
    /// Zero is not a legal udp port
    #[error("zero source port")]
    ZeroSourcePort,
    /// Zero is not a legal udp port
    #[error("zero destination port")]
    ZeroDestinationPort,
}

impl Udp {
    /// The length of a UDP header.
    #[allow(clippy::unwrap_used)] // safe due to const-eval
    pub const MIN_LENGTH: NonZero<usize> = NonZero::new(8).unwrap();

    /// Get the header's source port
    #[must_use]
    pub fn source(&self) -> u16 {
        self.0.source_port
    }

    /// Get the header's dest port
    #[must_use]
    pub fn destination(&self) -> u16 {
        self.0.destination_port
    }

    /// Set the source port.
    pub fn set_source(&mut self, port: u16) -> &mut Self {
        self.0.source_port = port;
        self
    }

    /// Set the destination port.
    pub fn set_destination(&mut self, port: u16) -> &mut Self {
        self.0.destination_port = port;
        self
    }
}

impl Checksum for Udp {
    type Payload<'a>
        = L4ChecksumPayload<'a>
    where
        Self: 'a;

    fn checksum(&self) -> u16 {
        self.0.checksum
    }

    fn compute_checksum(&self, payload: &Self::Payload<'_>) -> u16 {
        self.0
            .calc_checksum_ipv4(&payload.ip.0, payload.contents)
            .unwrap_or_else(|_| unreachable!())
    }

    fn set_checksum(&mut self, checksum: u16) -> &mut Self {
        self.0.checksum = checksum;
        self
    }
}

impl Parse for Udp {
    type Error = UdpParseError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>> {
        let (inner, _) = UdpHeader::from_slice(buf).map_err(|e| {
            ParseError::Length(LengthError {
                expected: NonZero::new(e.required_len).unwrap_or(Udp::MIN_LENGTH),
                actual: buf.len(),
            })
        })?;
        if inner.source_port == 0 {
            return Err(ParseError::Invalid(UdpParseError::ZeroSourcePort));
        }
        if inner.destination_port == 0 {
            return Err(ParseError::Invalid(UdpParseError::ZeroDestinationPort));
        }
        Ok((Self(inner), Udp::MIN_LENGTH))
    }
}

impl DeParse for Udp {
    type Error = ();

    fn size(&self) -> NonZero<usize> {
        Udp::MIN_LENGTH
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        deparse_bytes(&self.0.to_bytes(), buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ports() {
        let header = UdpHeader {
            source_port: 5353,
            destination_port: 53,
            length: 8,
            checksum: 0,
        };
        let (udp, len) = Udp::parse(&header.to_bytes()).unwrap();
        assert_eq!(len, Udp::MIN_LENGTH);
        assert_eq!(udp.source(), 5353);
        assert_eq!(udp.destination(), 53);
        assert!(matches!(
            Udp::parse(&[0u8; 4]),
            Err(ParseError::Length(_))
        ));
    }
}
