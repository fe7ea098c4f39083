// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-uplink NAT state

use crate::allocator::IdSpace;
use crate::errors::NatError;
use crate::protocol::Protocol;
use crate::rule::RuleId;
use crate::session::NatSession;
use net::interface::PortId;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use tracing::debug;

/// The NAT sessions of one uplink, and the allocators of its translated ports and identifiers.
///
/// TCP and UDP draw ports from one shared space, each with its own cursor, so that a translated
/// port is never bound twice on the uplink whatever the protocol. ICMP identifiers live in a
/// separate space.
///
/// TCP/UDP sessions are keyed by the id of their outbound rule and live until
/// [`SessionTable::remove_session`]. Echo sessions are never removed.
#[derive(Debug, Clone)]
pub struct SessionTable {
    uplink: PortId,
    ports: IdSpace,
    icmp_ids: IdSpace,
    tcp_cursor: u16,
    udp_cursor: u16,
    icmp_cursor: u16,
    flows: BTreeMap<RuleId, NatSession>,
    echoes: Vec<NatSession>,
}

impl SessionTable {
    /// An empty table for `uplink`, allocating within `range`
    #[must_use]
    pub fn new(uplink: PortId, range: RangeInclusive<u16>) -> SessionTable {
        let ports = IdSpace::new(range.clone());
        let first = ports.first();
        SessionTable {
            uplink,
            ports,
            icmp_ids: IdSpace::new(range),
            tcp_cursor: first,
            udp_cursor: first,
            icmp_cursor: first,
            flows: BTreeMap::new(),
            echoes: Vec::new(),
        }
    }

    /// The uplink this table belongs to
    #[must_use]
    pub fn uplink(&self) -> PortId {
        self.uplink
    }

    /// Allocate a translated TCP port.
    ///
    /// # Errors
    ///
    /// Fails with [`NatError::PortExhaustion`] when no port is free.
    pub fn allocate_tcp_port(&mut self) -> Result<u16, NatError> {
        self.ports
            .allocate(&mut self.tcp_cursor)
            .ok_or(NatError::PortExhaustion {
                uplink: self.uplink,
                protocol: Protocol::Tcp,
            })
    }

    /// Allocate a translated UDP port.
    ///
    /// # Errors
    ///
    /// Fails with [`NatError::PortExhaustion`] when no port is free.
    pub fn allocate_udp_port(&mut self) -> Result<u16, NatError> {
        self.ports
            .allocate(&mut self.udp_cursor)
            .ok_or(NatError::PortExhaustion {
                uplink: self.uplink,
                protocol: Protocol::Udp,
            })
    }

    /// Allocate a translated ICMP echo identifier.
    ///
    /// # Errors
    ///
    /// Fails with [`NatError::PortExhaustion`] when no identifier is free.
    pub fn allocate_icmp_id(&mut self) -> Result<u16, NatError> {
        self.icmp_ids
            .allocate(&mut self.icmp_cursor)
            .ok_or(NatError::PortExhaustion {
                uplink: self.uplink,
                protocol: Protocol::Icmp,
            })
    }

    /// Allocate with the allocator of `protocol`
    ///
    /// # Errors
    ///
    /// Fails with [`NatError::PortExhaustion`] when nothing is free.
    pub fn allocate(&mut self, protocol: Protocol) -> Result<u16, NatError> {
        match protocol {
            Protocol::Tcp => self.allocate_tcp_port(),
            Protocol::Udp => self.allocate_udp_port(),
            Protocol::Icmp => self.allocate_icmp_id(),
        }
    }

    /// Take a reference on a port which an existing session already translates to, so that a
    /// second flow can share it.
    pub(crate) fn share_port(&mut self, port: u16) {
        self.ports.reserve(port);
    }

    /// True if a TCP/UDP session holds `port`
    #[must_use]
    pub fn port_in_use(&self, port: u16) -> bool {
        self.ports.is_assigned(port)
    }

    /// Find the session of a host source, whatever the protocol.
    #[must_use]
    pub fn find_by_host_source(&self, ip: Ipv4Addr, port: u16) -> Option<&NatSession> {
        self.flows
            .values()
            .find(|s| s.host_ip == ip && s.host_id == port)
    }

    /// Find the host behind a translated identifier, as seen from `peer_ip`.
    ///
    /// Returns the host ip and its original port or identifier.
    #[must_use]
    pub fn find_reverse(
        &self,
        peer_ip: Ipv4Addr,
        translated_id: u16,
        protocol: Protocol,
    ) -> Option<(Ipv4Addr, u16)> {
        let matches = |s: &&NatSession| {
            s.protocol == protocol && s.peer_ip == peer_ip && s.translated_id == translated_id
        };
        let found = match protocol {
            Protocol::Icmp => self.echoes.iter().find(matches),
            Protocol::Tcp | Protocol::Udp => self.flows.values().find(matches),
        };
        found.map(|s| (s.host_ip, s.host_id))
    }

    /// Record the session bound by the outbound rule `rule`.
    ///
    /// The translated port must have been obtained from this table.
    pub fn add_session(&mut self, rule: RuleId, session: NatSession) {
        debug!("uplink {}: new session {session} (rule {rule})", self.uplink);
        if let Some(old) = self.flows.insert(rule, session) {
            self.ports.release(old.translated_id);
        }
    }

    /// Record an ICMP echo session.
    pub fn add_echo_session(&mut self, session: NatSession) {
        debug!("uplink {}: new echo session {session}", self.uplink);
        self.echoes.push(session);
    }

    /// Forget the session bound by `rule` and free its translated port.
    pub fn remove_session(&mut self, rule: RuleId) -> Option<NatSession> {
        let session = self.flows.remove(&rule)?;
        if self.ports.release(session.translated_id) {
            debug!(
                "uplink {}: port {} is free again",
                self.uplink, session.translated_id
            );
        }
        Some(session)
    }

    /// The TCP/UDP sessions, with the id of their outbound rule
    pub fn sessions(&self) -> impl Iterator<Item = (&RuleId, &NatSession)> {
        self.flows.iter()
    }

    /// The ICMP echo sessions
    pub fn echo_sessions(&self) -> impl Iterator<Item = &NatSession> {
        self.echoes.iter()
    }

    /// Number of TCP/UDP sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// True if there are neither TCP/UDP nor echo sessions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty() && self.echoes.is_empty()
    }
}
