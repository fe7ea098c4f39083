// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! ARP (Ethernet / IPv4 only) header type and logic.

use crate::eth::mac::Mac;
use crate::parse::{DeParse, DeParseError, LengthError, Parse, ParseError, deparse_bytes};
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::num::NonZero;

/// ARP operation code.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArpOp(pub u16);

impl ArpOp {
    /// who-has
    pub const REQUEST: ArpOp = ArpOp(1);
    /// is-at
    pub const REPLY: ArpOp = ArpOp(2);
}

impl Display for ArpOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            ArpOp::REQUEST => write!(f, "request"),
            ArpOp::REPLY => write!(f, "reply"),
            ArpOp(other) => write!(f, "op({other})"),
        }
    }
}

/// An ARP message mapping IPv4 addresses to ethernet addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arp {
    op: ArpOp,
    sender_mac: Mac,
    sender_ip: Ipv4Addr,
    target_mac: Mac,
    target_ip: Ipv4Addr,
}

/// Errors which may occur when parsing an [`Arp`] message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArpError {
    /// Only ethernet hardware addresses are supported
    #[error("unsupported hardware type {0}")]
    UnsupportedHardware(u16),
    /// Only IPv4 protocol addresses are supported
    #[error("unsupported protocol type {0:#06x}")]
    UnsupportedProtocol(u16),
    /// Address lengths are inconsistent with ethernet / IPv4
    #[error("bad address lengths: hardware {hlen}, protocol {plen}")]
    BadAddressLength {
        /// Advertised hardware address length
        hlen: u8,
        /// Advertised protocol address length
        plen: u8,
    },
}

const HTYPE_ETHERNET: u16 = 1;
const PTYPE_IPV4: u16 = 0x0800;

impl Arp {
    /// Length of an ethernet / IPv4 ARP message
    #[allow(clippy::unwrap_used)] // const-eval and trivially safe
    pub const LEN: NonZero<usize> = NonZero::new(28).unwrap();

    /// Build a who-has request
    #[must_use]
    pub fn request(sender_mac: Mac, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Arp {
        Arp {
            op: ArpOp::REQUEST,
            sender_mac,
            sender_ip,
            target_mac: Mac::ZERO,
            target_ip,
        }
    }

    /// Build the is-at answer to this message on behalf of `owner`, who owns the target address.
    #[must_use]
    pub fn reply(&self, owner: Mac) -> Arp {
        Arp {
            op: ArpOp::REPLY,
            sender_mac: owner,
            sender_ip: self.target_ip,
            target_mac: self.sender_mac,
            target_ip: self.sender_ip,
        }
    }

    /// Operation code
    #[must_use]
    pub fn op(&self) -> ArpOp {
        self.op
    }

    /// Sender hardware address
    #[must_use]
    pub fn sender_mac(&self) -> Mac {
        self.sender_mac
    }

    /// Sender protocol address
    #[must_use]
    pub fn sender_ip(&self) -> Ipv4Addr {
        self.sender_ip
    }

    /// Target hardware address
    #[must_use]
    pub fn target_mac(&self) -> Mac {
        self.target_mac
    }

    /// Target protocol address
    #[must_use]
    pub fn target_ip(&self) -> Ipv4Addr {
        self.target_ip
    }

    fn to_bytes(&self) -> [u8; 28] {
        let mut out = [0u8; 28];
        out[0..2].copy_from_slice(&HTYPE_ETHERNET.to_be_bytes());
        out[2..4].copy_from_slice(&PTYPE_IPV4.to_be_bytes());
        out[4] = 6;
        out[5] = 4;
        out[6..8].copy_from_slice(&self.op.0.to_be_bytes());
        out[8..14].copy_from_slice(&self.sender_mac.0);
        out[14..18].copy_from_slice(&self.sender_ip.octets());
        out[18..24].copy_from_slice(&self.target_mac.0);
        out[24..28].copy_from_slice(&self.target_ip.octets());
        out
    }
}

fn mac_at(buf: &[u8], at: usize) -> Mac {
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&buf[at..at + 6]);
    Mac(mac)
}

fn ip_at(buf: &[u8], at: usize) -> Ipv4Addr {
    Ipv4Addr::new(buf[at], buf[at + 1], buf[at + 2], buf[at + 3])
}

impl Parse for Arp {
    type Error = ArpError;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>> {
        LengthError::check(Arp::LEN, buf).map_err(ParseError::Length)?;
        let htype = u16::from_be_bytes([buf[0], buf[1]]);
        if htype != HTYPE_ETHERNET {
            return Err(ParseError::Invalid(ArpError::UnsupportedHardware(htype)));
        }
        let ptype = u16::from_be_bytes([buf[2], buf[3]]);
        if ptype != PTYPE_IPV4 {
            return Err(ParseError::Invalid(ArpError::UnsupportedProtocol(ptype)));
        }
        let (hlen, plen) = (buf[4], buf[5]);
        if hlen != 6 || plen != 4 {
            return Err(ParseError::Invalid(ArpError::BadAddressLength { hlen, plen }));
        }
        let arp = Arp {
            op: ArpOp(u16::from_be_bytes([buf[6], buf[7]])),
            sender_mac: mac_at(buf, 8),
            sender_ip: ip_at(buf, 14),
            target_mac: mac_at(buf, 18),
            target_ip: ip_at(buf, 24),
        };
        Ok((arp, Arp::LEN))
    }
}

impl DeParse for Arp {
    type Error = ();

    fn size(&self) -> NonZero<usize> {
        Arp::LEN
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        deparse_bytes(&self.to_bytes(), buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_reply() {
        let host = Mac([0x02, 0, 0, 0, 0, 5]);
        let owner = Mac([0x02, 0, 0, 0, 0xaa, 1]);
        let req = Arp::request(
            host,
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(192, 0, 2, 1),
        );
        let mut buf = [0u8; 28];
        req.deparse(&mut buf).unwrap();
        let (parsed, len) = Arp::parse(&buf).unwrap();
        assert_eq!(len, Arp::LEN);
        assert_eq!(parsed, req);
        assert_eq!(parsed.op(), ArpOp::REQUEST);

        let reply = parsed.reply(owner);
        assert_eq!(reply.op(), ArpOp::REPLY);
        assert_eq!(reply.sender_mac(), owner);
        assert_eq!(reply.sender_ip(), Ipv4Addr::new(192, 0, 2, 1));
        assert_eq!(reply.target_mac(), host);
        assert_eq!(reply.target_ip(), Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn reject_non_ipv4() {
        let mut buf = Arp::request(Mac::ZERO, Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED)
            .to_bytes();
        buf[2..4].copy_from_slice(&0x86ddu16.to_be_bytes());
        assert!(matches!(
            Arp::parse(&buf),
            Err(ParseError::Invalid(ArpError::UnsupportedProtocol(0x86dd)))
        ));
        assert!(matches!(
            Arp::parse(&buf[..20]),
            Err(ParseError::Length(_))
        ));
    }
}
