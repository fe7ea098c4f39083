// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Definition of [`Headers`] and related methods and types.

use crate::arp::{Arp, ArpError};
use crate::eth::{Eth, EthType};
use crate::icmp4::Icmp4;
use crate::ipv4::{Ipv4, Ipv4Error};
use crate::parse::{DeParse, DeParseError, LengthError, ParseError, Reader, Writer};
use crate::tcp::Tcp;
use crate::udp::Udp;
use etherparse::IpNumber;
use std::num::NonZero;
use tracing::debug;

/// The network layer of a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Net {
    /// An IPv4 header
    Ipv4(Ipv4),
    /// An ARP message (which takes the place of the network header)
    Arp(Arp),
}

/// The transport layer of an IPv4 packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// TCP header
    Tcp(Tcp),
    /// UDP header
    Udp(Udp),
    /// `ICMPv4` header
    Icmp4(Icmp4),
}

/// The stack of parsed headers of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    /// ethernet header
    pub eth: Eth,
    /// network header, if any we understand
    pub net: Option<Net>,
    /// transport header, if any we understand
    pub transport: Option<Transport>,
}

/// Errors which make a frame unusable.
///
/// A transport header which fails to parse is not an error: the frame is kept with no
/// [`Transport`] and the bytes stay in the payload.
#[derive(Debug, thiserror::Error)]
pub enum HeadersError {
    /// Frame shorter than an ethernet header
    #[error("bad ethernet header: {0}")]
    Eth(ParseError<LengthError>),
    /// Ethertype says ARP, contents disagree
    #[error("bad arp message: {0}")]
    Arp(ParseError<ArpError>),
    /// Ethertype says IPv4, contents disagree
    #[error("bad ipv4 header: {0}")]
    Ipv4(ParseError<Ipv4Error>),
    /// The frame ends before the IPv4 total length
    #[error("ipv4 packet truncated: {0}")]
    Truncated(LengthError),
}

impl Headers {
    /// A header stack with only an ethernet header
    #[must_use]
    pub fn new(eth: Eth) -> Headers {
        Headers {
            eth,
            net: None,
            transport: None,
        }
    }

    /// Parse the headers at the start of the reader.
    ///
    /// On success the reader is left at the first payload byte, and restricted to the IPv4
    /// total length so that link layer padding is not mistaken for payload.
    pub(crate) fn parse_from(reader: &mut Reader<'_>) -> Result<Headers, HeadersError> {
        let eth = reader.parse::<Eth>().map_err(HeadersError::Eth)?;
        let mut headers = Headers::new(eth);
        match headers.eth.ether_type() {
            EthType::ARP => {
                let arp = reader.parse::<Arp>().map_err(HeadersError::Arp)?;
                headers.net = Some(Net::Arp(arp));
            }
            EthType::IPV4 => {
                let ipv4 = reader.parse::<Ipv4>().map_err(HeadersError::Ipv4)?;
                let payload_len = ipv4.payload_len();
                if let Some(expected) = NonZero::new(payload_len) {
                    LengthError::check(expected, reader.remaining())
                        .map_err(HeadersError::Truncated)?;
                }
                reader.truncate(payload_len);
                if !ipv4.is_trailing_fragment() {
                    headers.transport = Self::parse_transport(ipv4.protocol(), reader);
                }
                headers.net = Some(Net::Ipv4(ipv4));
            }
            other => debug!("Not parsing past ethertype {other}"),
        }
        Ok(headers)
    }

    fn parse_transport(protocol: IpNumber, reader: &mut Reader<'_>) -> Option<Transport> {
        let parsed = match protocol {
            IpNumber::TCP => reader
                .parse::<Tcp>()
                .map(Transport::Tcp)
                .map_err(|e| e.to_string()),
            IpNumber::UDP => reader
                .parse::<Udp>()
                .map(Transport::Udp)
                .map_err(|e| e.to_string()),
            IpNumber::ICMP => reader
                .parse::<Icmp4>()
                .map(Transport::Icmp4)
                .map_err(|e| e.to_string()),
            _ => return None,
        };
        parsed
            .inspect_err(|e| debug!("Failed to parse transport ({}): {e}", protocol.0))
            .ok()
    }

    /// The IPv4 header, if any
    #[must_use]
    pub fn ipv4(&self) -> Option<&Ipv4> {
        match &self.net {
            Some(Net::Ipv4(ip)) => Some(ip),
            _ => None,
        }
    }

    /// The IPv4 header, if any
    pub fn ipv4_mut(&mut self) -> Option<&mut Ipv4> {
        match &mut self.net {
            Some(Net::Ipv4(ip)) => Some(ip),
            _ => None,
        }
    }

    /// The ARP message, if any
    #[must_use]
    pub fn arp(&self) -> Option<&Arp> {
        match &self.net {
            Some(Net::Arp(arp)) => Some(arp),
            _ => None,
        }
    }
}

impl DeParse for Net {
    type Error = ();

    fn size(&self) -> NonZero<usize> {
        match self {
            Net::Ipv4(ip) => ip.size(),
            Net::Arp(arp) => arp.size(),
        }
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        match self {
            Net::Ipv4(ip) => ip.deparse(buf),
            Net::Arp(arp) => arp.deparse(buf),
        }
    }
}

impl DeParse for Transport {
    type Error = ();

    fn size(&self) -> NonZero<usize> {
        match self {
            Transport::Tcp(tcp) => tcp.size(),
            Transport::Udp(udp) => udp.size(),
            Transport::Icmp4(icmp) => icmp.size(),
        }
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        match self {
            Transport::Tcp(tcp) => tcp.deparse(buf),
            Transport::Udp(udp) => udp.deparse(buf),
            Transport::Icmp4(icmp) => icmp.deparse(buf),
        }
    }
}

impl DeParse for Headers {
    type Error = ();

    fn size(&self) -> NonZero<usize> {
        let net = self.net.as_ref().map_or(0, |n| n.size().get());
        let transport = self.transport.as_ref().map_or(0, |t| t.size().get());
        self.eth.size().saturating_add(net + transport)
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        let size = self.size();
        LengthError::check(size, buf).map_err(DeParseError::Length)?;
        let mut writer = Writer::new(buf);
        writer.write(&self.eth)?;
        if let Some(net) = &self.net {
            writer.write(net)?;
        }
        if let Some(transport) = &self.transport {
            writer.write(transport)?;
        }
        Ok(size)
    }
}
