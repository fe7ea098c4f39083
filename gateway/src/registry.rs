// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The registry of gateways and of the proxy-ARP table they share.
//!
//! Locks are always taken in the order: gateway map, then a gateway, then the ARP table.

use crate::arp::ArpTable;
use crate::errors::GatewayError;
use crate::gateway::{Gateway, GatewayId};
use crate::interface::{Interface, InterfaceDescriptor};
use crate::report::{GatewayReport, InterfaceReport, StatisticsReport};
use crate::stats::{InterfaceStats, StatsSample};
use crate::topology::Topology;
use nat::{NatEngine, NatSession, RuleId};
use net::eth::mac::Mac;
use net::interface::PortId;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A gateway, shared between the registry and whoever processes its packets
pub type GatewayHandle = Arc<Mutex<Gateway>>;

#[derive(Debug, Default)]
pub struct GatewayRegistry {
    nat: NatEngine,
    gateways: RwLock<BTreeMap<GatewayId, GatewayHandle>>,
    arp: RwLock<ArpTable>,
}

impl GatewayRegistry {
    /// An empty registry. Session tables of new interfaces are configured after `nat`.
    #[must_use]
    pub fn new(nat: NatEngine) -> Self {
        Self {
            nat,
            gateways: RwLock::new(BTreeMap::new()),
            arp: RwLock::new(ArpTable::new()),
        }
    }

    #[must_use]
    pub fn nat(&self) -> &NatEngine {
        &self.nat
    }

    /// Register an empty gateway. A gateway with the same id is replaced, and the ARP entries of
    /// its interfaces are purged.
    pub fn add_gateway(&self, id: GatewayId) {
        let mut gateways = self.gateways.write();
        let new = Arc::new(Mutex::new(Gateway::new(id.clone())));
        if let Some(old) = gateways.insert(id.clone(), new) {
            warn!("Replacing gateway {id}: its interfaces and sessions are dropped");
            let old = old.lock();
            let mut arp = self.arp.write();
            for uplink in old.uplinks() {
                arp.remove(uplink.interface.ip);
            }
        } else {
            info!("New gateway added: {id}");
        }
    }

    /// The gateway `id`, to lock for processing or inspection
    #[must_use]
    pub fn gateway(&self, id: &GatewayId) -> Option<GatewayHandle> {
        self.gateways.read().get(id).cloned()
    }

    /// Run `f` on a locked gateway.
    ///
    /// # Errors
    ///
    /// [`GatewayError::GatewayNotFound`] if there is no such gateway.
    pub fn with_gateway<R>(
        &self,
        id: &GatewayId,
        f: impl FnOnce(&mut Gateway) -> R,
    ) -> Result<R, GatewayError> {
        let gateways = self.gateways.read();
        let gateway = gateways
            .get(id)
            .ok_or_else(|| GatewayError::GatewayNotFound(id.clone()))?;
        let mut gateway = gateway.lock();
        Ok(f(&mut gateway))
    }

    /// Validate and register an uplink interface of a gateway. The interface is enabled if the
    /// topology says its port is.
    ///
    /// Nothing changes unless the interface is registered.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed field of the descriptor, if the gateway is unknown, if the
    /// topology does not know the port, or if the port already has an interface.
    pub fn add_interface(
        &self,
        gateway: &GatewayId,
        descriptor: &InterfaceDescriptor,
        topology: &dyn Topology,
    ) -> Result<PortId, GatewayError> {
        let mut interface = descriptor.validate().inspect_err(|e| {
            warn!(
                "Unable to add interface {} to gateway {gateway}: {e}",
                descriptor.name
            );
        })?;
        let port = interface.port;
        let gateways = self.gateways.read();
        let handle = gateways
            .get(gateway)
            .ok_or_else(|| GatewayError::GatewayNotFound(gateway.clone()))?;
        if !topology.uplink_exists(gateway, port) {
            warn!(
                "Unable to add interface {} to gateway {gateway}: no port {port}",
                interface.name
            );
            return Err(GatewayError::UplinkNotInTopology {
                gateway: gateway.clone(),
                port,
            });
        }
        interface.enabled = topology.uplink_enabled(gateway, port);
        let (ip, mac) = (interface.ip, interface.mac);
        let name = interface.name.clone();

        let mut gw = handle.lock();
        gw.add_uplink(interface, self.nat.session_table(port))?;
        if let Some(previous) = self.arp.write().insert(ip, mac) {
            warn!("ARP entry of {ip} moved from {previous} to {mac}");
        }
        info!("Added interface {name} (port {port}) to gateway {gateway}");
        Ok(port)
    }

    /// Remove an interface, its sessions and its ARP entry.
    ///
    /// # Errors
    ///
    /// Fails if the gateway or the interface is unknown.
    pub fn remove_interface(
        &self,
        gateway: &GatewayId,
        port: PortId,
    ) -> Result<Interface, GatewayError> {
        let uplink = self.with_gateway(gateway, |gw| {
            let uplink = gw.remove_uplink(port).ok_or(GatewayError::InterfaceNotFound {
                gateway: gateway.clone(),
                port,
            })?;
            let mut arp = self.arp.write();
            if arp.lookup(uplink.interface.ip) == Some(uplink.interface.mac) {
                arp.remove(uplink.interface.ip);
            }
            Ok::<_, GatewayError>(uplink)
        })??;
        info!(
            "Removed interface {} (port {port}) from gateway {gateway}, {} sessions dropped",
            uplink.interface.name,
            uplink.sessions.len()
        );
        Ok(uplink.interface)
    }

    /// Feed a telemetry sample for a port, and recompute its weight.
    ///
    /// # Errors
    ///
    /// Fails if the gateway or the interface is unknown.
    pub fn update_statistics(
        &self,
        gateway: &GatewayId,
        port: PortId,
        sample: &StatsSample,
    ) -> Result<InterfaceStats, GatewayError> {
        self.with_gateway(gateway, |gw| gw.update_statistics(port, sample).copied())?
    }

    /// Track a change of state of a port.
    ///
    /// # Errors
    ///
    /// Fails if the gateway or the interface is unknown.
    pub fn set_interface_state(
        &self,
        gateway: &GatewayId,
        port: PortId,
        enabled: bool,
    ) -> Result<(), GatewayError> {
        self.with_gateway(gateway, |gw| gw.set_enabled(port, enabled))??;
        info!(
            "Interface on port {port} of gateway {gateway} is {}",
            if enabled { "up" } else { "down" }
        );
        Ok(())
    }

    /// Called by the rule layer when a rule it was given expires or is withdrawn. Frees the
    /// translated port of the session the rule was installed for.
    ///
    /// # Errors
    ///
    /// Fails if the gateway is unknown, or if no session is bound to the rule (which is the case
    /// of inbound rules).
    pub fn on_rule_removed(
        &self,
        gateway: &GatewayId,
        rule: RuleId,
    ) -> Result<NatSession, GatewayError> {
        let (port, session) = self.with_gateway(gateway, |gw| gw.remove_rule(rule))??;
        debug!("Rule {rule} removed: session {session} on port {port} is gone");
        Ok(session)
    }

    /// The MAC of a gateway-owned address
    #[must_use]
    pub fn arp_lookup(&self, ip: Ipv4Addr) -> Option<Mac> {
        self.arp.read().lookup(ip)
    }

    /// A copy of the proxy-ARP table
    #[must_use]
    pub fn arp_table(&self) -> ArpTable {
        self.arp.read().clone()
    }

    /// All gateways, in id order
    #[must_use]
    pub fn gateways(&self) -> Vec<GatewayReport> {
        self.gateways
            .read()
            .iter()
            .map(|(id, gw)| GatewayReport {
                id: id.clone(),
                interfaces: gw.lock().len(),
            })
            .collect()
    }

    /// The interfaces of a gateway, in port order
    ///
    /// # Errors
    ///
    /// Fails if the gateway is unknown.
    pub fn interfaces(&self, gateway: &GatewayId) -> Result<Vec<InterfaceReport>, GatewayError> {
        self.with_gateway(gateway, |gw| {
            gw.uplinks().map(InterfaceReport::from).collect()
        })
    }

    /// The statistics of the interfaces of a gateway, in port order
    ///
    /// # Errors
    ///
    /// Fails if the gateway is unknown.
    pub fn statistics(&self, gateway: &GatewayId) -> Result<Vec<StatisticsReport>, GatewayError> {
        self.with_gateway(gateway, |gw| {
            gw.uplinks().map(StatisticsReport::from).collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::InterfaceField;
    use crate::topology::StaticTopology;
    use nat::UplinkArena;
    use net::packet::Packet;
    use net::packet::test_utils::tcp_syn_frame;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tracing_test::traced_test;

    fn gw_id() -> GatewayId {
        GatewayId::from("of:0000000000000001")
    }

    fn descriptor(port: u32, last: u8) -> InterfaceDescriptor {
        InterfaceDescriptor {
            name: format!("wan{port}"),
            port: port.to_string(),
            mac: format!("02:00:00:00:aa:{last:02x}"),
            ip: format!("203.0.113.{last}"),
            bandwidth: "10".to_string(),
        }
    }

    fn setup() -> (GatewayRegistry, StaticTopology) {
        let registry = GatewayRegistry::default();
        registry.add_gateway(gw_id());
        let mut topology = StaticTopology::new();
        topology.set_uplink(gw_id(), PortId::new(1), true);
        topology.set_uplink(gw_id(), PortId::new(2), false);
        (registry, topology)
    }

    #[test]
    fn add_interface_registers_everything() {
        let (registry, topology) = setup();
        let port = registry
            .add_interface(&gw_id(), &descriptor(1, 1), &topology)
            .unwrap();
        registry
            .add_interface(&gw_id(), &descriptor(2, 2), &topology)
            .unwrap();
        assert_eq!(port, PortId::new(1));

        assert_eq!(
            registry.arp_lookup("203.0.113.1".parse().unwrap()),
            Some(Mac([2, 0, 0, 0, 0xaa, 1]))
        );
        let interfaces = registry.interfaces(&gw_id()).unwrap();
        assert_eq!(interfaces.len(), 2);
        // state comes from the topology
        assert!(interfaces[0].enabled);
        assert!(!interfaces[1].enabled);

        registry
            .with_gateway(&gw_id(), |gw| {
                assert_eq!(gw.session_tables().count(), 2);
                // no flow until the first sample
                assert_eq!(gw.uplink(PortId::new(1)).unwrap().weight, 0);
                assert_eq!(gw.total_unused_capacity(), 0);
            })
            .unwrap();
    }

    #[test]
    #[traced_test]
    fn invalid_interface_changes_nothing() {
        let (registry, topology) = setup();
        let mut bad = descriptor(1, 1);
        bad.mac = "not-a-mac".to_string();
        let err = registry.add_interface(&gw_id(), &bad, &topology);
        assert!(matches!(
            err,
            Err(GatewayError::Validation(ref e)) if e.field == InterfaceField::MacAddress
        ));
        assert!(logs_contain("invalid MacAddress"));
        assert!(registry.interfaces(&gw_id()).unwrap().is_empty());
        assert!(registry.arp_table().is_empty());

        // unknown port
        assert_eq!(
            registry.add_interface(&gw_id(), &descriptor(9, 9), &topology),
            Err(GatewayError::UplinkNotInTopology {
                gateway: gw_id(),
                port: PortId::new(9)
            })
        );
        // unknown gateway
        assert_eq!(
            registry.add_interface(&GatewayId::from("of:2"), &descriptor(1, 1), &topology),
            Err(GatewayError::GatewayNotFound(GatewayId::from("of:2")))
        );
        // duplicate port
        registry
            .add_interface(&gw_id(), &descriptor(1, 1), &topology)
            .unwrap();
        assert!(matches!(
            registry.add_interface(&gw_id(), &descriptor(1, 5), &topology),
            Err(GatewayError::InterfaceExists { .. })
        ));
        assert_eq!(registry.arp_table().len(), 1);
    }

    #[test]
    fn remove_interface_cleans_up() {
        let (registry, topology) = setup();
        registry
            .add_interface(&gw_id(), &descriptor(1, 1), &topology)
            .unwrap();
        registry
            .add_interface(&gw_id(), &descriptor(2, 2), &topology)
            .unwrap();

        let removed = registry.remove_interface(&gw_id(), PortId::new(1)).unwrap();
        assert_eq!(removed.name, "wan1");
        assert_eq!(registry.arp_lookup(removed.ip), None);
        assert_eq!(registry.arp_table().len(), 1);
        registry
            .with_gateway(&gw_id(), |gw| {
                assert!(gw.uplink(PortId::new(1)).is_none());
                assert_eq!(gw.session_tables().count(), 1);
                assert_eq!(gw.total_unused_capacity(), 0);
            })
            .unwrap();

        assert_eq!(
            registry.remove_interface(&gw_id(), PortId::new(1)),
            Err(GatewayError::InterfaceNotFound {
                gateway: gw_id(),
                port: PortId::new(1)
            })
        );
    }

    #[test]
    #[traced_test]
    fn replacing_a_gateway_purges_its_arp_entries() {
        let (registry, topology) = setup();
        registry
            .add_interface(&gw_id(), &descriptor(1, 1), &topology)
            .unwrap();
        registry.add_gateway(gw_id());
        assert!(logs_contain("Replacing gateway of:0000000000000001"));
        assert!(registry.arp_table().is_empty());
        assert_eq!(
            registry.gateways(),
            vec![GatewayReport {
                id: gw_id(),
                interfaces: 0
            }]
        );
    }

    #[test]
    fn statistics_and_state() {
        let (registry, topology) = setup();
        registry
            .add_interface(&gw_id(), &descriptor(1, 1), &topology)
            .unwrap();
        let sample = StatsSample {
            total_bytes: 42_000,
            delta_bytes: 2_500_000,
            period: Duration::from_secs(5),
            dropped: 1,
            errors: 2,
        };
        let stats = registry
            .update_statistics(&gw_id(), PortId::new(1), &sample)
            .unwrap();
        assert_eq!(stats.bits_per_second, 4_000_000);
        let weight = registry
            .with_gateway(&gw_id(), |gw| gw.uplink(PortId::new(1)).map(|u| u.weight))
            .unwrap();
        assert_eq!(weight, Some(6_000_000));

        let report = registry.statistics(&gw_id()).unwrap();
        assert_eq!(report[0].total_bytes, 42_000);
        assert!((report[0].mbps - 4.0).abs() < f64::EPSILON);
        assert_eq!((report[0].errors, report[0].dropped), (2, 1));

        registry
            .set_interface_state(&gw_id(), PortId::new(1), false)
            .unwrap();
        let report = registry.statistics(&gw_id()).unwrap();
        assert!(!report[0].enabled);
        assert_eq!(report[0].total_bytes, 0);

        assert!(
            registry
                .update_statistics(&gw_id(), PortId::new(3), &sample)
                .is_err()
        );
    }

    #[test]
    fn reports_serialize() {
        let (registry, topology) = setup();
        registry
            .add_interface(&gw_id(), &descriptor(1, 1), &topology)
            .unwrap();
        let yaml = serde_yaml_ng::to_string(&registry.interfaces(&gw_id()).unwrap()).unwrap();
        assert!(yaml.contains("02:00:00:00:aa:01"));
        assert!(yaml.contains("203.0.113.1"));
        assert!(yaml.contains("bandwidth: 10"));
        let yaml = serde_yaml_ng::to_string(&registry.gateways()).unwrap();
        assert!(yaml.contains("of:0000000000000001"));
        assert!(yaml.contains("interfaces: 1"));
    }

    #[test]
    fn rule_removal_through_the_registry() {
        let (registry, topology) = setup();
        registry
            .add_interface(&gw_id(), &descriptor(1, 1), &topology)
            .unwrap();
        let frame = tcp_syn_frame(
            [2, 0, 0, 0, 0, 5],
            [2, 0, 0, 0, 0, 0xfe],
            "10.0.0.5",
            "93.184.216.34",
            4444,
            80,
        );
        let mut packet = Packet::parse(&frame).unwrap();
        let translation = registry
            .with_gateway(&gw_id(), |gw| {
                registry
                    .nat()
                    .translate(gw, &mut packet, PortId::new(5), PortId::new(1))
            })
            .unwrap()
            .unwrap();

        // inbound rules carry no session
        assert_eq!(
            registry.on_rule_removed(&gw_id(), translation.inbound.id),
            Err(GatewayError::UnknownRule(translation.inbound.id))
        );
        let session = registry
            .on_rule_removed(&gw_id(), translation.outbound.id)
            .unwrap();
        assert_eq!(session.host_id, 4444);
        assert!(
            registry
                .on_rule_removed(&gw_id(), translation.outbound.id)
                .is_err()
        );
    }
}
