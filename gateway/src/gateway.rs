// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A gateway and the arena of its uplinks

use crate::errors::GatewayError;
use crate::interface::Interface;
use crate::stats::{InterfaceStats, StatsSample};
use nat::{NatSession, RuleId, SessionTable, UplinkArena, UplinkView};
use net::interface::PortId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::debug;

/// Identity of a gateway device
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayId(String);

impl GatewayId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GatewayId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Display for GatewayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An uplink: an interface and everything the gateway tracks for it
#[derive(Debug, Clone)]
pub struct Uplink {
    pub interface: Interface,
    pub sessions: SessionTable,
    pub stats: InterfaceStats,
    /// unused capacity, in bits per second
    pub weight: u64,
}

impl Uplink {
    fn compute_weight(&self) -> u64 {
        if self.interface.enabled {
            self.interface
                .committed_bps()
                .saturating_sub(self.stats.bits_per_second)
        } else {
            0
        }
    }
}

/// A gateway device. Uplinks are ordered by the string form of their port.
#[derive(Debug, Clone)]
pub struct Gateway {
    id: GatewayId,
    uplinks: BTreeMap<PortId, Uplink>,
    total_unused_capacity: u64,
}

impl Gateway {
    #[must_use]
    pub fn new(id: GatewayId) -> Self {
        Self {
            id,
            uplinks: BTreeMap::new(),
            total_unused_capacity: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> &GatewayId {
        &self.id
    }

    /// Register an interface with zero stats and weight, and the given session table. The uplink
    /// takes no new flow until its first statistics sample or change of state.
    ///
    /// # Errors
    ///
    /// Fails if the port already has an interface.
    pub fn add_uplink(
        &mut self,
        interface: Interface,
        sessions: SessionTable,
    ) -> Result<(), GatewayError> {
        let port = interface.port;
        if self.uplinks.contains_key(&port) {
            return Err(GatewayError::InterfaceExists {
                gateway: self.id.clone(),
                port,
            });
        }
        let uplink = Uplink {
            interface,
            sessions,
            stats: InterfaceStats::default(),
            weight: 0,
        };
        self.uplinks.insert(port, uplink);
        Ok(())
    }

    /// Remove an uplink, its sessions and its weight
    pub fn remove_uplink(&mut self, port: PortId) -> Option<Uplink> {
        let uplink = self.uplinks.remove(&port)?;
        self.total_unused_capacity -= uplink.weight;
        Some(uplink)
    }

    #[must_use]
    pub fn uplink(&self, port: PortId) -> Option<&Uplink> {
        self.uplinks.get(&port)
    }

    /// Uplinks, in port order
    pub fn uplinks(&self) -> impl Iterator<Item = &Uplink> {
        self.uplinks.values()
    }

    #[must_use]
    pub fn interface(&self, port: PortId) -> Option<&Interface> {
        self.uplinks.get(&port).map(|u| &u.interface)
    }

    /// The uplink owning `ip`, if any
    #[must_use]
    pub fn uplink_by_ip(&self, ip: std::net::Ipv4Addr) -> Option<&Uplink> {
        self.uplinks.values().find(|u| u.interface.ip == ip)
    }

    /// (port, weight) pairs, in port order
    pub fn weights(&self) -> impl Iterator<Item = (PortId, u64)> + '_ {
        self.uplinks.iter().map(|(port, u)| (*port, u.weight))
    }

    #[must_use]
    pub fn total_unused_capacity(&self) -> u64 {
        self.total_unused_capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.uplinks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uplinks.is_empty()
    }

    fn reweigh(&mut self, port: PortId) {
        if let Some(uplink) = self.uplinks.get_mut(&port) {
            let weight = uplink.compute_weight();
            self.total_unused_capacity = self.total_unused_capacity - uplink.weight + weight;
            uplink.weight = weight;
        }
    }

    /// Store fresh statistics of an uplink and recompute its weight.
    ///
    /// # Errors
    ///
    /// Fails if the port has no interface.
    pub fn update_statistics(
        &mut self,
        port: PortId,
        sample: &StatsSample,
    ) -> Result<&InterfaceStats, GatewayError> {
        let uplink = self
            .uplinks
            .get_mut(&port)
            .ok_or_else(|| not_found(&self.id, port))?;
        uplink.stats = InterfaceStats::from_sample(sample, uplink.interface.enabled);
        self.reweigh(port);
        let uplink = self.uplinks.get(&port).ok_or_else(|| not_found(&self.id, port))?;
        debug!(
            "gateway {} port {port}: {} weight {}",
            self.id, uplink.stats, uplink.weight
        );
        Ok(&uplink.stats)
    }

    /// Enable or disable an uplink. A disabled uplink weighs nothing.
    ///
    /// # Errors
    ///
    /// Fails if the port has no interface.
    pub fn set_enabled(&mut self, port: PortId, enabled: bool) -> Result<(), GatewayError> {
        let uplink = self
            .uplinks
            .get_mut(&port)
            .ok_or_else(|| not_found(&self.id, port))?;
        uplink.interface.enabled = enabled;
        if !enabled {
            uplink.stats = InterfaceStats::default();
        }
        self.reweigh(port);
        Ok(())
    }

    /// Forget the session bound by a withdrawn rule, on whichever uplink holds it.
    ///
    /// # Errors
    ///
    /// Fails if no uplink knows the rule.
    pub fn remove_rule(&mut self, rule: RuleId) -> Result<(PortId, NatSession), GatewayError> {
        self.uplinks
            .iter_mut()
            .find_map(|(port, uplink)| uplink.sessions.remove_session(rule).map(|s| (*port, s)))
            .ok_or(GatewayError::UnknownRule(rule))
    }
}

fn not_found(gateway: &GatewayId, port: PortId) -> GatewayError {
    GatewayError::InterfaceNotFound {
        gateway: gateway.clone(),
        port,
    }
}

impl UplinkArena for Gateway {
    fn session_tables(&self) -> impl Iterator<Item = (PortId, &SessionTable)> {
        self.uplinks.iter().map(|(port, u)| (*port, &u.sessions))
    }

    fn uplink_mut(&mut self, id: PortId) -> Option<UplinkView<'_>> {
        self.uplinks.get_mut(&id).map(|u| UplinkView {
            id,
            ip: u.interface.ip,
            mac: u.interface.mac,
            sessions: &mut u.sessions,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::interface::InterfaceDescriptor;
    use nat::{NatEngine, Protocol};
    use net::packet::Packet;
    use net::packet::test_utils::tcp_syn_frame;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    pub(crate) fn interface(port: u32, last: u8, bandwidth: u32, enabled: bool) -> Interface {
        let mut intf = InterfaceDescriptor {
            name: format!("wan{port}"),
            port: port.to_string(),
            mac: format!("02:00:00:00:aa:{last:02x}"),
            ip: format!("203.0.113.{last}"),
            bandwidth: bandwidth.to_string(),
        }
        .validate()
        .unwrap();
        intf.enabled = enabled;
        intf
    }

    fn unsampled(uplinks: &[(u32, u32, bool)]) -> Gateway {
        let mut gw = Gateway::new(GatewayId::from("of:0000000000000001"));
        for (i, (port, bandwidth, enabled)) in uplinks.iter().enumerate() {
            let last = u8::try_from(i + 1).unwrap();
            let intf = interface(*port, last, *bandwidth, *enabled);
            let table = SessionTable::new(intf.port, 1..=u16::MAX);
            gw.add_uplink(intf, table).unwrap();
        }
        gw
    }

    /// A gateway whose uplinks got a first, idle, statistics sample
    pub(crate) fn gateway(uplinks: &[(u32, u32, bool)]) -> Gateway {
        let mut gw = unsampled(uplinks);
        for (port, _, _) in uplinks {
            gw.update_statistics(PortId::new(*port), &StatsSample::new(0, 0))
                .unwrap();
        }
        gw
    }

    fn sample_mbps(mbps: u64) -> StatsSample {
        StatsSample {
            total_bytes: 0,
            delta_bytes: mbps * 1_000_000 / 8 * 5,
            period: Duration::from_secs(5),
            dropped: 0,
            errors: 0,
        }
    }

    fn check_total(gw: &Gateway) {
        assert_eq!(
            gw.weights().map(|(_, w)| w).sum::<u64>(),
            gw.total_unused_capacity()
        );
    }

    #[test]
    fn new_uplinks_wait_for_a_sample() {
        let mut gw = unsampled(&[(1, 10, true), (2, 10, false)]);
        assert_eq!(gw.total_unused_capacity(), 0);
        assert!(gw.weights().all(|(_, w)| w == 0));

        gw.update_statistics(PortId::new(1), &StatsSample::new(0, 0))
            .unwrap();
        assert_eq!(gw.uplink(PortId::new(1)).unwrap().weight, 10_000_000);
        gw.set_enabled(PortId::new(2), true).unwrap();
        assert_eq!(gw.total_unused_capacity(), 20_000_000);
        check_total(&gw);
    }

    #[test]
    fn weights_follow_statistics() {
        let mut gw = gateway(&[(1, 10, true), (2, 10, true)]);
        // idle: the full commitment is unused
        assert_eq!(gw.total_unused_capacity(), 20_000_000);

        gw.update_statistics(PortId::new(1), &sample_mbps(2)).unwrap();
        gw.update_statistics(PortId::new(2), &sample_mbps(8)).unwrap();
        assert_eq!(
            gw.weights().collect::<Vec<_>>(),
            vec![(PortId::new(1), 8_000_000), (PortId::new(2), 2_000_000)]
        );
        assert_eq!(gw.total_unused_capacity(), 10_000_000);
        check_total(&gw);

        // over commitment: no capacity left, but never negative
        gw.update_statistics(PortId::new(2), &sample_mbps(12)).unwrap();
        assert_eq!(gw.uplink(PortId::new(2)).unwrap().weight, 0);
        check_total(&gw);
    }

    #[test]
    fn disabled_uplinks_weigh_nothing() {
        let mut gw = gateway(&[(1, 10, true), (2, 10, false)]);
        gw.update_statistics(PortId::new(2), &sample_mbps(3)).unwrap();
        let uplink = gw.uplink(PortId::new(2)).unwrap();
        assert_eq!(uplink.stats, InterfaceStats::default());
        assert_eq!(uplink.weight, 0);
        check_total(&gw);

        gw.set_enabled(PortId::new(2), true).unwrap();
        assert_eq!(gw.uplink(PortId::new(2)).unwrap().weight, 10_000_000);
        gw.set_enabled(PortId::new(1), false).unwrap();
        assert_eq!(gw.total_unused_capacity(), 10_000_000);
        check_total(&gw);

        assert_eq!(
            gw.set_enabled(PortId::new(7), true),
            Err(GatewayError::InterfaceNotFound {
                gateway: GatewayId::from("of:0000000000000001"),
                port: PortId::new(7)
            })
        );
    }

    #[test]
    fn uplinks_in_string_order() {
        let gw = gateway(&[(2, 10, true), (10, 10, true), (1, 10, true)]);
        let ports: Vec<u32> = gw.uplinks().map(|u| u.interface.port.as_u32()).collect();
        assert_eq!(ports, vec![1, 10, 2]);
    }

    #[test]
    fn duplicate_port_is_rejected() {
        let mut gw = gateway(&[(1, 10, true)]);
        let intf = interface(1, 9, 10, true);
        let table = SessionTable::new(intf.port, 1..=u16::MAX);
        assert!(matches!(
            gw.add_uplink(intf, table),
            Err(GatewayError::InterfaceExists { .. })
        ));
        assert_eq!(gw.len(), 1);
    }

    #[test]
    fn removal_drops_weight_and_sessions() {
        let mut gw = gateway(&[(1, 10, true), (2, 10, true)]);
        let engine = NatEngine::default();
        let frame = tcp_syn_frame(
            [2, 0, 0, 0, 0, 5],
            [2, 0, 0, 0, 0, 0xfe],
            "10.0.0.5",
            "93.184.216.34",
            4444,
            80,
        );
        let mut packet = Packet::parse(&frame).unwrap();
        let t = engine
            .translate(&mut gw, &mut packet, PortId::new(5), PortId::new(1))
            .unwrap();
        assert_eq!(t.session.protocol, Protocol::Tcp);

        let removed = gw.remove_uplink(PortId::new(1)).unwrap();
        assert_eq!(removed.sessions.len(), 1);
        assert_eq!(gw.total_unused_capacity(), 10_000_000);
        check_total(&gw);
        assert!(gw.session_tables().all(|(_, t)| t.is_empty()));
        assert_eq!(
            gw.remove_rule(t.outbound.id),
            Err(GatewayError::UnknownRule(t.outbound.id))
        );
    }

    #[test]
    fn rule_removal_frees_the_port() {
        let mut gw = gateway(&[(1, 10, true)]);
        let engine = NatEngine::default();
        let frame = tcp_syn_frame(
            [2, 0, 0, 0, 0, 5],
            [2, 0, 0, 0, 0, 0xfe],
            "10.0.0.5",
            "93.184.216.34",
            4444,
            80,
        );
        let mut packet = Packet::parse(&frame).unwrap();
        let t = engine
            .translate(&mut gw, &mut packet, PortId::new(5), PortId::new(1))
            .unwrap();
        let (port, session) = gw.remove_rule(t.outbound.id).unwrap();
        assert_eq!(port, PortId::new(1));
        assert_eq!(session, t.session);
        let uplink = gw.uplink(PortId::new(1)).unwrap();
        assert!(!uplink.sessions.port_in_use(session.translated_id));
    }
}
