// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! NAT sessions

use crate::protocol::Protocol;
use std::fmt::Display;
use std::net::Ipv4Addr;

/// The state of one translated flow.
///
/// For TCP and UDP the identifiers are transport ports, for ICMP they are echo identifiers.
/// The peer identifier of an ICMP session is meaningless and left as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NatSession {
    pub host_ip: Ipv4Addr,
    pub host_id: u16,
    pub translated_ip: Ipv4Addr,
    pub translated_id: u16,
    pub peer_ip: Ipv4Addr,
    pub peer_id: Option<u16>,
    pub protocol: Protocol,
}

impl Display for NatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}:{} as {}:{} -> {}",
            self.protocol,
            self.host_ip,
            self.host_id,
            self.translated_ip,
            self.translated_id,
            self.peer_ip,
        )?;
        if let Some(peer_id) = self.peer_id {
            write!(f, ":{peer_id}")?;
        }
        Ok(())
    }
}
