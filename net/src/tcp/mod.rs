// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! TCP header type and logic.

use crate::checksum::Checksum;
use crate::ipv4::Ipv4;
use crate::parse::{DeParse, DeParseError, LengthError, Parse, ParseError, deparse_bytes};
use etherparse::TcpHeader;
use etherparse::err::tcp::{HeaderError, HeaderSliceError};
use std::num::NonZero;

/// A TCP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tcp(TcpHeader);

/// Errors which can occur when parsing a [`Tcp`] header
#[derive(Debug, thiserror::Error)]
pub enum TcpError {
    /// Zero source port is not legal
    #[error("zero source port")]
    ZeroSourcePort,
    /// Zero dest port is not legal
    #[error("zero destination port")]
    ZeroDestPort,
    /// Data offset smaller than a minimal header
    #[error("data offset too small: {0}")]
    DataOffsetTooSmall(u8),
}

impl Tcp {
    /// The minimum length of a [`Tcp`] header (no options)
    #[allow(clippy::unwrap_used)] // const-eval and trivially safe
    pub const MIN_LEN: NonZero<usize> = NonZero::new(20).unwrap();

    /// Get the source port
    #[must_use]
    pub fn source(&self) -> u16 {
        self.0.source_port
    }

    /// Get the destination port
    #[must_use]
    pub fn destination(&self) -> u16 {
        self.0.destination_port
    }

    /// True if the SYN flag is set
    #[must_use]
    pub fn syn(&self) -> bool {
        self.0.syn
    }

    /// Set the source port
    pub fn set_source(&mut self, port: u16) -> &mut Self {
        self.0.source_port = port;
        self
    }

    /// Set the destination port
    pub fn set_destination(&mut self, port: u16) -> &mut Self {
        self.0.destination_port = port;
        self
    }
}

/// The data a transport checksum is computed over, besides the header itself.
pub struct L4ChecksumPayload<'a> {
    pub(crate) ip: &'a Ipv4,
    pub(crate) contents: &'a [u8],
}

impl<'a> L4ChecksumPayload<'a> {
    /// Assemble a new [`L4ChecksumPayload`] from the enclosing header and the segment payload
    #[must_use]
    pub const fn new(ip: &'a Ipv4, contents: &'a [u8]) -> Self {
        Self { ip, contents }
    }
}

impl Checksum for Tcp {
    type Payload<'a>
        = L4ChecksumPayload<'a>
    where
        Self: 'a;

    fn checksum(&self) -> u16 {
        self.0.checksum
    }

    /// The payload length is bounded by the IPv4 total length, so etherparse can not fail here.
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

impl Parse for Tcp {
    type Error = TcpError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>> {
        let (inner, rest) = TcpHeader::from_slice(buf).map_err(|e| match e {
            HeaderSliceError::Len(len) => ParseError::Length(LengthError {
                expected: NonZero::new(len.required_len).unwrap_or(Tcp::MIN_LEN),
                actual: buf.len(),
            }),
            HeaderSliceError::Content(HeaderError::DataOffsetTooSmall { data_offset }) => {
                ParseError::Invalid(TcpError::DataOffsetTooSmall(data_offset))
            }
        })?;
        if inner.source_port == 0 {
            return Err(ParseError::Invalid(TcpError::ZeroSourcePort));
        }
        if inner.destination_port == 0 {
            return Err(ParseError::Invalid(TcpError::ZeroDestPort));
        }
        let consumed = NonZero::new(buf.len() - rest.len()).unwrap_or(Tcp::MIN_LEN);
        Ok((Self(inner), consumed))
    }
}

impl DeParse for Tcp {
    type Error = ();

    fn size(&self) -> NonZero<usize> {
        NonZero::new(self.0.header_len()).unwrap_or(Tcp::MIN_LEN)
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        deparse_bytes(&self.0.to_bytes(), buf)
    }
}
