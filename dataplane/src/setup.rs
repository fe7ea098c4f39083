// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Building the dataplane out of its configuration

use crate::dispatcher::PacketDispatcher;
use crate::hosts::HostTable;
use crate::sink::FlowRuleSink;
use config::{ConfigResult, DataplaneConfig};
use gateway::GatewayRegistry;
use nat::NatEngine;
use std::sync::Arc;
use tracing::{error, info};

/// Create the registry of the configured gateways and provision their interfaces.
///
/// An interface the registry refuses is logged and skipped.
pub fn build_registry(config: &DataplaneConfig) -> ConfigResult<Arc<GatewayRegistry>> {
    let params = config.nat.params()?;
    info!("NAT: {params}");
    let registry = Arc::new(GatewayRegistry::new(NatEngine::new(params)));
    let topology = config.topology();
    for gw in &config.gateways {
        registry.add_gateway(gw.id.clone());
        for descriptor in &gw.interfaces {
            if let Err(e) = registry.add_interface(&gw.id, descriptor, &topology) {
                error!("Failed to provision interface {}: {e}", descriptor.name);
            }
        }
    }
    Ok(registry)
}

/// A dispatcher for the configured hosts, feeding rules to `sink`
#[must_use]
pub fn build_dispatcher<S: FlowRuleSink>(
    config: &DataplaneConfig,
    registry: Arc<GatewayRegistry>,
    sink: S,
) -> PacketDispatcher<HostTable, S> {
    let hosts = HostTable::from(config.hosts.as_slice());
    info!(
        "Local prefix {}, {} known hosts",
        config.local_prefix,
        hosts.len()
    );
    PacketDispatcher::new(registry, config.local_prefix, hosts, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{Ingress, Output};
    use crate::sink::CollectingSink;
    use gateway::{GatewayId, StatsSample};
    use net::eth::mac::Mac;
    use net::interface::PortId;
    use net::packet::test_utils::{addr_v4, echo_reply_frame, echo_request_frame};
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    const YAML: &str = r"
local_prefix: 192.168.10.0/24
nat:
  port_min: 20000
  port_max: 20010
gateways:
  - id: of:1
    uplinks:
      - port: 1
      - port: 2
        enabled: false
    interfaces:
      - name: wan1
        port: '1'
        mac: 02:00:00:00:aa:01
        ip: 198.51.100.1
        bandwidth: '100'
      - name: wan2
        port: '2'
        mac: 02:00:00:00:aa:02
        ip: 198.51.100.2
        bandwidth: '50'
hosts:
  - ip: 192.168.10.20
    mac: 02:00:00:00:00:20
    port: 7
";

    #[test]
    fn provisioning() {
        let config = DataplaneConfig::from_yaml(YAML).unwrap();
        let registry = build_registry(&config).unwrap();
        let gw = GatewayId::from("of:1");
        let interfaces = registry.interfaces(&gw).unwrap();
        assert_eq!(interfaces.len(), 2);
        assert!(interfaces[0].enabled);
        assert!(!interfaces[1].enabled);
        assert_eq!(
            registry.arp_lookup(addr_v4("198.51.100.2")),
            Some(Mac([0x02, 0, 0, 0, 0xaa, 0x02]))
        );
        assert_eq!(registry.nat().params().port_range, 20000..=20010);
    }

    #[test]
    #[traced_test]
    fn duplicate_interfaces_are_skipped() {
        let mut config = DataplaneConfig::from_yaml(YAML).unwrap();
        let mut again = config.gateways[0].interfaces[0].clone();
        again.name = "wan1-again".to_string();
        config.gateways[0].interfaces.push(again);
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.interfaces(&GatewayId::from("of:1")).unwrap().len(), 2);
        assert!(logs_contain("Failed to provision interface wan1-again"));
    }

    #[test]
    fn configured_hosts_receive_echo_replies() {
        let config = DataplaneConfig::from_yaml(YAML).unwrap();
        let registry = build_registry(&config).unwrap();
        let gw = GatewayId::from("of:1");
        // no flow is sent over an uplink before its first sample
        registry
            .update_statistics(&gw, PortId::new(1), &StatsSample::new(0, 0))
            .unwrap();
        let dispatcher = build_dispatcher(&config, registry, CollectingSink::default());
        let host_mac = [0x02, 0, 0, 0, 0, 0x20];
        let lan = Ingress {
            gateway: GatewayId::from("of:1"),
            port: PortId::new(7),
        };
        let gw_mac = [0x02, 0, 0, 0, 0, 0x01];
        let request = echo_request_frame(host_mac, gw_mac, "192.168.10.20", "1.1.1.1", 9, 1);
        let out = dispatcher.process(&lan, &request).frame.unwrap();
        assert_eq!(out.output, Output::Port(PortId::new(1)));
        let sent = net::packet::Packet::parse(&out.frame).unwrap();
        let (_, id) = sent.icmp4().unwrap().echo().unwrap();
        assert_eq!(id, 20000);

        let wan = Ingress {
            gateway: GatewayId::from("of:1"),
            port: PortId::new(1),
        };
        let (peer_mac, wan1_mac) = ([0x02, 0, 0, 0, 0, 0xee], [0x02, 0, 0, 0, 0xaa, 0x01]);
        let reply = echo_reply_frame(peer_mac, wan1_mac, "1.1.1.1", "198.51.100.1", id, 1);
        let out = dispatcher.process(&wan, &reply).frame.unwrap();
        assert_eq!(out.output, Output::Port(PortId::new(7)));
    }
}
