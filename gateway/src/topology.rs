// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! What the gateway devices physically have

use crate::gateway::GatewayId;
use net::interface::PortId;
use std::collections::BTreeMap;

/// Knowledge of the ports of gateway devices
pub trait Topology {
    /// True if the gateway has a port `port`
    fn uplink_exists(&self, gateway: &GatewayId, port: PortId) -> bool;
    /// True if the port is up
    fn uplink_enabled(&self, gateway: &GatewayId, port: PortId) -> bool;
}

/// A topology which does not change unless told to
#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    ports: BTreeMap<(GatewayId, PortId), bool>,
}

impl StaticTopology {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a port of a gateway, or change its state
    pub fn set_uplink(&mut self, gateway: GatewayId, port: PortId, enabled: bool) {
        self.ports.insert((gateway, port), enabled);
    }

    pub fn remove_uplink(&mut self, gateway: &GatewayId, port: PortId) -> bool {
        self.ports.remove(&(gateway.clone(), port)).is_some()
    }
}

impl Topology for StaticTopology {
    fn uplink_exists(&self, gateway: &GatewayId, port: PortId) -> bool {
        self.ports.contains_key(&(gateway.clone(), port))
    }
    fn uplink_enabled(&self, gateway: &GatewayId, port: PortId) -> bool {
        self.ports
            .get(&(gateway.clone(), port))
            .copied()
            .unwrap_or(false)
    }
}
