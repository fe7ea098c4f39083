// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ethernet types

pub mod mac;

use crate::eth::mac::Mac;
use crate::parse::{DeParse, DeParseError, LengthError, Parse, ParseError, deparse_bytes};
use etherparse::{EtherType, Ethernet2Header};
use std::fmt::Display;
use std::num::NonZero;

/// An [`EtherType`] wrapper restricted to what the gateway cares about.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EthType(pub(crate) EtherType);

impl EthType {
    /// Ethernet type for IPv4
    pub const IPV4: EthType = EthType(EtherType::IPV4);
    /// Ethernet type for ARP
    pub const ARP: EthType = EthType(EtherType::ARP);

    /// Create a new [`EthType`] from its wire value
    #[must_use]
    pub const fn new(raw: u16) -> EthType {
        EthType(EtherType(raw))
    }

    /// The raw (host byte order) value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0.0
    }
}

impl Display for EthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}", self.as_u16())
    }
}

/// An ethernet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eth(Ethernet2Header);

impl Eth {
    /// The length (in bytes) of an [`Eth`] header
    #[allow(clippy::unwrap_used)] // const-eval and trivially safe
    pub const HEADER_LEN: NonZero<usize> = NonZero::new(14).unwrap();

    /// Create a new [Eth] header.
    #[must_use]
    pub fn new(source: Mac, destination: Mac, ether_type: EthType) -> Eth {
        Eth(Ethernet2Header {
            source: source.0,
            destination: destination.0,
            ether_type: ether_type.0,
        })
    }

    /// Get the source [Mac] of the header.
    #[must_use]
    pub fn source(&self) -> Mac {
        Mac(self.0.source)
    }

    /// Get the destination [Mac] of the header.
    #[must_use]
    pub fn destination(&self) -> Mac {
        Mac(self.0.destination)
    }

    /// Get the ethertype of the header.
    #[must_use]
    pub fn ether_type(&self) -> EthType {
        EthType(self.0.ether_type)
    }

    /// Set the source [Mac] of the ethernet header.
    ///
    /// No check is made here: NAT only ever writes interface owned macs, which are validated on
    /// interface creation.
    pub fn set_source(&mut self, source: Mac) -> &mut Eth {
        self.0.source = source.0;
        self
    }

    /// Set the destination [Mac] of the ethernet header.
    pub fn set_destination(&mut self, destination: Mac) -> &mut Eth {
        self.0.destination = destination.0;
        self
    }
}

impl Parse for Eth {
    type Error = LengthError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>> {
        let (inner, _) = Ethernet2Header::from_slice(buf).map_err(|e| {
            ParseError::Length(LengthError {
                expected: NonZero::new(e.required_len).unwrap_or(Eth::HEADER_LEN),
                actual: buf.len(),
            })
        })?;
        Ok((Self(inner), Eth::HEADER_LEN))
    }
}

impl DeParse for Eth {
    type Error = ();

    fn size(&self) -> NonZero<usize> {
        Eth::HEADER_LEN
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        deparse_bytes(&self.0.to_bytes(), buf)
    }
}
