// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `ICMPv4` header type and logic.

use crate::checksum::Checksum;
use crate::parse::{DeParse, DeParseError, LengthError, Parse, ParseError, deparse_bytes};
use etherparse::{IcmpEchoHeader, Icmpv4Header, Icmpv4Type};
use std::num::NonZero;

/// An `ICMPv4` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icmp4(Icmpv4Header);

/// The two echo messages the gateway translates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoKind {
    /// type 8, code 0
    Request,
    /// type 0, code 0
    Reply,
}

impl Icmp4 {
    /// Minimal length of an `ICMPv4` header
    #[allow(clippy::unwrap_used)] // const-eval and trivially safe
    pub const MIN_LEN: NonZero<usize> = NonZero::new(8).unwrap();

    /// ICMP type
    #[must_use]
    pub fn icmp_type(&self) -> u8 {
        self.0.to_bytes()[0]
    }

    /// ICMP code
    #[must_use]
    pub fn icmp_code(&self) -> u8 {
        self.0.to_bytes()[1]
    }

    /// If this is an echo request or reply, its kind and identifier.
    #[must_use]
    pub fn echo(&self) -> Option<(EchoKind, u16)> {
        match &self.0.icmp_type {
            Icmpv4Type::EchoRequest(echo) => Some((EchoKind::Request, echo.id)),
            Icmpv4Type::EchoReply(echo) => Some((EchoKind::Reply, echo.id)),
            _ => None,
        }
    }

    /// Echo sequence number, for echo messages.
    #[must_use]
    pub fn echo_seq(&self) -> Option<u16> {
        match &self.0.icmp_type {
            Icmpv4Type::EchoRequest(echo) | Icmpv4Type::EchoReply(echo) => Some(echo.seq),
            _ => None,
        }
    }

    /// Rewrite the identifier of an echo message.
    ///
    /// Returns false (and leaves the header untouched) if this is not an echo message.
    pub fn set_echo_id(&mut self, id: u16) -> bool {
        match &mut self.0.icmp_type {
            Icmpv4Type::EchoRequest(IcmpEchoHeader { id: current, .. })
            | Icmpv4Type::EchoReply(IcmpEchoHeader { id: current, .. }) => {
                *current = id;
                true
            }
            _ => false,
        }
    }
}

impl Checksum for Icmp4 {
    type Payload<'a>
        = [u8]
    where
        Self: 'a;

    fn checksum(&self) -> u16 {
        self.0.checksum
    }

    fn compute_checksum(&self, payload: &Self::Payload<'_>) -> u16 {
        self.0.icmp_type.calc_checksum(payload)
    }

    fn set_checksum(&mut self, checksum: u16) -> &mut Self {
        self.0.checksum = checksum;
        self
    }
}

impl Parse for Icmp4 {
    type Error = LengthError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>> {
        let (inner, rest) = Icmpv4Header::from_slice(buf).map_err(|e| {
            ParseError::Length(LengthError {
                expected: NonZero::new(e.required_len).unwrap_or(Icmp4::MIN_LEN),
                actual: buf.len(),
            })
        })?;
        let consumed = NonZero::new(buf.len() - rest.len()).unwrap_or(Icmp4::MIN_LEN);
        Ok((Self(inner), consumed))
    }
}

impl DeParse for Icmp4 {
    type Error = ();

    fn size(&self) -> NonZero<usize> {
        NonZero::new(self.0.header_len()).unwrap_or(Icmp4::MIN_LEN)
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        deparse_bytes(&self.0.to_bytes(), buf)
    }
}
