// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet definition

pub mod meta;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

use crate::arp::Arp;
use crate::checksum::Checksum;
use crate::eth::Eth;
use crate::headers::{Headers, HeadersError, Transport};
use crate::icmp4::Icmp4;
use crate::ipv4::Ipv4;
use crate::parse::{DeParse, DeParseError, Reader, Writer};
use crate::tcp::{L4ChecksumPayload, Tcp};
use crate::udp::Udp;

pub use meta::{DoneReason, PacketDropStats};

/// A fully parsed frame which owns its bytes.
///
/// Headers are mutated in place (NAT rewrites) and the frame is rebuilt with
/// [`Packet::serialize`], which recomputes every checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    headers: Headers,
    payload: Vec<u8>,
}

/// A frame that could not be parsed
#[derive(Debug, thiserror::Error)]
#[error("invalid frame: {error}")]
pub struct InvalidPacket {
    #[source]
    error: HeadersError,
}

impl InvalidPacket {
    /// What was wrong with the frame
    #[must_use]
    pub fn error(&self) -> &HeadersError {
        &self.error
    }
}

impl Packet {
    /// Parse a frame as received on a port.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPacket`] if the ethernet, ARP or IPv4 headers are malformed.
    pub fn parse(frame: &[u8]) -> Result<Packet, InvalidPacket> {
        let mut reader = Reader::new(frame);
        let headers = Headers::parse_from(&mut reader).map_err(|error| InvalidPacket { error })?;
        Ok(Packet {
            headers,
            payload: reader.remaining().to_vec(),
        })
    }

    /// Build a packet from headers and a payload.
    #[must_use]
    pub fn from_parts(headers: Headers, payload: Vec<u8>) -> Packet {
        Packet { headers, payload }
    }

    /// The stack of headers
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Bytes after the last parsed header
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The ethernet header
    #[must_use]
    pub fn eth(&self) -> &Eth {
        &self.headers.eth
    }

    /// The ethernet header
    pub fn eth_mut(&mut self) -> &mut Eth {
        &mut self.headers.eth
    }

    /// The ARP message, if this is an ARP frame
    #[must_use]
    pub fn arp(&self) -> Option<&Arp> {
        self.headers.arp()
    }

    /// The IPv4 header, if any
    #[must_use]
    pub fn ipv4(&self) -> Option<&Ipv4> {
        self.headers.ipv4()
    }

    /// The IPv4 header, if any
    pub fn ipv4_mut(&mut self) -> Option<&mut Ipv4> {
        self.headers.ipv4_mut()
    }

    /// The transport header, if any
    #[must_use]
    pub fn transport(&self) -> Option<&Transport> {
        self.headers.transport.as_ref()
    }

    /// The TCP header, if any
    pub fn tcp_mut(&mut self) -> Option<&mut Tcp> {
        match &mut self.headers.transport {
            Some(Transport::Tcp(tcp)) => Some(tcp),
            _ => None,
        }
    }

    /// The UDP header, if any
    pub fn udp_mut(&mut self) -> Option<&mut Udp> {
        match &mut self.headers.transport {
            Some(Transport::Udp(udp)) => Some(udp),
            _ => None,
        }
    }

    /// The `ICMPv4` header, if any
    #[must_use]
    pub fn icmp4(&self) -> Option<&Icmp4> {
        match &self.headers.transport {
            Some(Transport::Icmp4(icmp)) => Some(icmp),
            _ => None,
        }
    }

    /// The `ICMPv4` header, if any
    pub fn icmp4_mut(&mut self) -> Option<&mut Icmp4> {
        match &mut self.headers.transport {
            Some(Transport::Icmp4(icmp)) => Some(icmp),
            _ => None,
        }
    }

    /// Recompute the IPv4 and transport checksums after the headers were modified.
    pub fn update_checksums(&mut self) {
        let Some(ip) = self.headers.ipv4() else {
            return;
        };
        let ip = ip.clone();
        match &mut self.headers.transport {
            Some(Transport::Tcp(tcp)) => {
                tcp.update_checksum(&L4ChecksumPayload::new(&ip, &self.payload));
            }
            Some(Transport::Udp(udp)) => {
                udp.update_checksum(&L4ChecksumPayload::new(&ip, &self.payload));
            }
            Some(Transport::Icmp4(icmp)) => {
                icmp.update_checksum(&self.payload);
            }
            None => {}
        }
        if let Some(ip) = self.headers.ipv4_mut() {
            ip.update_checksum(&());
        }
    }

    /// Rebuild the frame, with fresh checksums.
    ///
    /// # Errors
    ///
    /// Only fails if a header can not be written back, which a parsed packet never triggers.
    pub fn serialize(&mut self) -> Result<Vec<u8>, DeParseError<()>> {
        self.update_checksums();
        let mut buf = vec![0u8; self.headers.size().get() + self.payload.len()];
        let mut writer = Writer::new(&mut buf);
        writer.write(&self.headers)?;
        writer
            .write_bytes(&self.payload)
            .map_err(DeParseError::Length)?;
        Ok(buf)
    }
}
