// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors of the NAT engine

use crate::protocol::Protocol;
use net::interface::PortId;
use std::net::Ipv4Addr;

/// Errors which may occur while translating a packet
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NatError {
    #[error("unsupported protocol {0}")]
    UnsupportedProtocol(u8),
    #[error("packet has no {0} header")]
    MissingHeader(&'static str),
    #[error("no free {protocol} port or identifier on uplink {uplink}")]
    PortExhaustion { uplink: PortId, protocol: Protocol },
    #[error("uplink {0} is unknown")]
    UnknownUplink(PortId),
    #[error("no {protocol} session for peer {peer} and identifier {id}")]
    NoSession {
        peer: Ipv4Addr,
        id: u16,
        protocol: Protocol,
    },
    #[error("ICMP type {icmp_type} code {icmp_code} is not an echo message")]
    NotEcho { icmp_type: u8, icmp_code: u8 },
}
