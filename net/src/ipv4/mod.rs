// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv4 header type and logic.

use crate::checksum::Checksum;
use crate::parse::{DeParse, DeParseError, LengthError, Parse, ParseError, deparse_bytes};
use etherparse::err::ipv4::{HeaderError, HeaderSliceError};
use etherparse::{IpNumber, Ipv4Header};
use std::net::Ipv4Addr;
use std::num::NonZero;

/// An IPv4 header
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ipv4(pub(crate) Ipv4Header);

/// Error which is triggered during parsing of an [`Ipv4`] header.
#[derive(thiserror::Error, Debug)]
pub enum Ipv4Error {
    /// Error triggered when etherparse rejects the header contents.
    #[error(transparent)]
    Invalid(HeaderError),
    /// The total length field is smaller than the header itself.
    #[error("total length {total_len} is shorter than header length {header_len}")]
    TotalLenTooSmall {
        /// Value of the total length field
        total_len: u16,
        /// Length of the header including options
        header_len: usize,
    },
}

impl Ipv4 {
    /// The minimum length of an IPv4 header (i.e., a header with no options)
    #[allow(clippy::unwrap_used)] // const-eval and trivially safe
    pub const MIN_LEN: NonZero<usize> = NonZero::new(20).unwrap();

    /// Get the source ip address of the header
    #[must_use]
    pub fn source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0.source)
    }

    /// Get the destination ip address of the header
    #[must_use]
    pub fn destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0.destination)
    }

    /// Get the next layer protocol which follows this header.
    #[must_use]
    pub fn protocol(&self) -> IpNumber {
        self.0.protocol
    }

    /// Length of the header (includes options) in bytes.
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.0.header_len()
    }

    /// Value of total length ip header field
    #[must_use]
    pub fn total_len(&self) -> u16 {
        self.0.total_len
    }

    /// Number of bytes carried after this header, according to the total length field.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        usize::from(self.0.total_len).saturating_sub(self.header_len())
    }

    /// The number of routing hops the packet is allowed to take.
    #[must_use]
    pub fn ttl(&self) -> u8 {
        self.0.time_to_live
    }

    /// True for every fragment but the first one: no transport header follows.
    #[must_use]
    pub fn is_trailing_fragment(&self) -> bool {
        self.0.fragment_offset.value() != 0
    }

    /// Set the source ip of the header.
    pub fn set_source(&mut self, source: Ipv4Addr) -> &mut Self {
        self.0.source = source.octets();
        self
    }

    /// Set the destination ip address for this header.
    pub fn set_destination(&mut self, dest: Ipv4Addr) -> &mut Self {
        self.0.destination = dest.octets();
        self
    }

    /// Set the header's time to live
    pub fn set_ttl(&mut self, ttl: u8) -> &mut Self {
        self.0.time_to_live = ttl;
        self
    }
}

impl Checksum for Ipv4 {
    type Payload<'a>
        = ()
    where
        Self: 'a;

    fn checksum(&self) -> u16 {
        self.0.header_checksum
    }

    fn compute_checksum(&self, _payload: &Self::Payload<'_>) -> u16 {
        self.0.calc_header_checksum()
    }

    fn set_checksum(&mut self, checksum: u16) -> &mut Self {
        self.0.header_checksum = checksum;
        self
    }
}

impl Parse for Ipv4 {
    type Error = Ipv4Error;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>> {
        let (inner, rest) = Ipv4Header::from_slice(buf).map_err(|e| match e {
            HeaderSliceError::Len(len) => ParseError::Length(LengthError {
                expected: NonZero::new(len.required_len).unwrap_or(Ipv4::MIN_LEN),
                actual: buf.len(),
            }),
            HeaderSliceError::Content(content) => ParseError::Invalid(Ipv4Error::Invalid(content)),
        })?;
        if usize::from(inner.total_len) < inner.header_len() {
            return Err(ParseError::Invalid(Ipv4Error::TotalLenTooSmall {
                total_len: inner.total_len,
                header_len: inner.header_len(),
            }));
        }
        let consumed = NonZero::new(buf.len() - rest.len()).unwrap_or(Ipv4::MIN_LEN);
        Ok((Self(inner), consumed))
    }
}

impl DeParse for Ipv4 {
    type Error = ();

    fn size(&self) -> NonZero<usize> {
        NonZero::new(self.0.header_len()).unwrap_or(Ipv4::MIN_LEN)
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        deparse_bytes(&self.0.to_bytes(), buf)
    }
}
