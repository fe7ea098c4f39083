// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Turns the byte counters of the uplinks into statistics samples

use gateway::{GatewayError, GatewayId, GatewayRegistry, InterfaceStats, StatsSample};
use net::interface::PortId;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Remembers the last counter of each port, one reading per sampling period
#[derive(Debug)]
pub struct CounterFeed {
    period: Duration,
    last: BTreeMap<(GatewayId, PortId), u64>,
}

impl CounterFeed {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last: BTreeMap::new(),
        }
    }

    /// The sample for a new reading of a counter. The first reading of a port, and a counter
    /// that went backwards (port reset), count as no traffic.
    pub fn sample(&mut self, gateway: &GatewayId, port: PortId, total_bytes: u64) -> StatsSample {
        let previous = self.last.insert((gateway.clone(), port), total_bytes);
        let delta_bytes = match previous {
            Some(previous) if previous <= total_bytes => total_bytes - previous,
            _ => 0,
        };
        StatsSample {
            period: self.period,
            ..StatsSample::new(total_bytes, delta_bytes)
        }
    }

    /// Feed a counter reading to the registry
    ///
    /// # Errors
    ///
    /// Fails if the gateway or the port is unknown to the registry.
    pub fn feed(
        &mut self,
        registry: &GatewayRegistry,
        gateway: &GatewayId,
        port: PortId,
        total_bytes: u64,
    ) -> Result<InterfaceStats, GatewayError> {
        let sample = self.sample(gateway, port, total_bytes);
        let stats = registry.update_statistics(gateway, port, &sample)?;
        debug!("gateway {gateway} port {port}: {stats}");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::{InterfaceDescriptor, StaticTopology};
    use pretty_assertions::assert_eq;

    #[test]
    fn deltas_between_readings() {
        let gw = GatewayId::from("of:1");
        let mut feed = CounterFeed::new(Duration::from_secs(10));
        let port = PortId::new(1);
        assert_eq!(feed.sample(&gw, port, 1000).delta_bytes, 0);
        let sample = feed.sample(&gw, port, 126_000);
        assert_eq!(sample.delta_bytes, 125_000);
        assert_eq!(sample.total_bytes, 126_000);
        assert_eq!(sample.period, Duration::from_secs(10));
        // counter reset
        assert_eq!(feed.sample(&gw, port, 10).delta_bytes, 0);
        // other ports are independent
        assert_eq!(feed.sample(&gw, PortId::new(2), 50).delta_bytes, 0);
    }

    #[test]
    fn feeding_the_registry_reweighs_uplinks() {
        let registry = GatewayRegistry::default();
        let gw = GatewayId::from("of:1");
        registry.add_gateway(gw.clone());
        let mut topology = StaticTopology::new();
        topology.set_uplink(gw.clone(), PortId::new(1), true);
        let descriptor = InterfaceDescriptor {
            name: "wan1".to_string(),
            port: "1".to_string(),
            mac: "02:00:00:00:aa:01".to_string(),
            ip: "203.0.113.1".to_string(),
            bandwidth: "10".to_string(),
        };
        registry.add_interface(&gw, &descriptor, &topology).unwrap();

        let mut feed = CounterFeed::new(Duration::from_secs(5));
        feed.feed(&registry, &gw, PortId::new(1), 0).unwrap();
        // 5 MB in 5 s: 8 Mbps
        let stats = feed.feed(&registry, &gw, PortId::new(1), 5_000_000).unwrap();
        assert_eq!(stats.bits_per_second, 8_000_000);
        let weight = registry
            .with_gateway(&gw, |g| g.uplink(PortId::new(1)).map(|u| u.weight))
            .unwrap();
        assert_eq!(weight, Some(2_000_000));

        assert!(feed.feed(&registry, &gw, PortId::new(9), 0).is_err());
    }
}
