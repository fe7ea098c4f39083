// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The dataplane configuration, as loaded from YAML

use crate::errors::{ConfigError, ConfigResult};
use gateway::{GatewayId, InterfaceDescriptor, StaticTopology};
use ipnet::Ipv4Net;
use nat::{DEFAULT_IDLE_TIMEOUT, DEFAULT_PRIORITY, NatParams, NatParamsBuilder};
use net::eth::mac::Mac;
use net::interface::PortId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

fn default_local_prefix() -> Ipv4Net {
    Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 24)
}

fn default_true() -> bool {
    true
}

/// NAT tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NatConfig {
    pub idle_timeout_secs: u64,
    pub priority: u16,
    pub port_min: u16,
    pub port_max: u16,
}

impl Default for NatConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT.as_secs(),
            priority: DEFAULT_PRIORITY,
            port_min: 1,
            port_max: u16::MAX,
        }
    }
}

impl NatConfig {
    /// Build the parameters of the NAT engine
    pub fn params(&self) -> ConfigResult<NatParams> {
        NatParamsBuilder::default()
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .priority(self.priority)
            .port_range(self.port_min..=self.port_max)
            .build()
            .map_err(|e| ConfigError::BadNatParams(e.to_string()))
    }
}

/// Telemetry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    pub sampling_period_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sampling_period_secs: gateway::DEFAULT_SAMPLING_PERIOD.as_secs(),
        }
    }
}

impl TelemetryConfig {
    #[must_use]
    pub fn sampling_period(&self) -> Duration {
        Duration::from_secs(self.sampling_period_secs)
    }
}

/// A port of a gateway device, as the topology knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UplinkConfig {
    pub port: PortId,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A gateway device: its ports, and the interfaces to provision on them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub id: GatewayId,
    #[serde(default)]
    pub uplinks: Vec<UplinkConfig>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceDescriptor>,
}

/// Where a LAN host is attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub ip: Ipv4Addr,
    pub mac: Mac,
    pub port: PortId,
}

/// The whole configuration of the dataplane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataplaneConfig {
    /// The prefix of the hosts behind the gateways
    pub local_prefix: Ipv4Net,
    pub nat: NatConfig,
    pub telemetry: TelemetryConfig,
    pub gateways: Vec<GatewayConfig>,
    pub hosts: Vec<HostConfig>,
}

impl Default for DataplaneConfig {
    fn default() -> Self {
        Self {
            local_prefix: default_local_prefix(),
            nat: NatConfig::default(),
            telemetry: TelemetryConfig::default(),
            gateways: Vec::new(),
            hosts: Vec::new(),
        }
    }
}

impl DataplaneConfig {
    /// Parse and validate a YAML configuration
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml_ng::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        debug!("Loading configuration from {}", path.display());
        let yaml = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&yaml)
    }

    /// Check the configuration for consistency
    pub fn validate(&self) -> ConfigResult<()> {
        self.nat.params()?;
        if self.telemetry.sampling_period_secs == 0 {
            return Err(ConfigError::BadSamplingPeriod);
        }
        let mut ids = BTreeSet::new();
        for gw in &self.gateways {
            if !ids.insert(&gw.id) {
                return Err(ConfigError::DuplicateGateway(gw.id.clone()));
            }
            let mut ports = BTreeSet::new();
            for uplink in &gw.uplinks {
                if !ports.insert(uplink.port) {
                    return Err(ConfigError::DuplicateUplink(gw.id.clone(), uplink.port));
                }
            }
            for descriptor in &gw.interfaces {
                let interface =
                    descriptor
                        .validate()
                        .map_err(|error| ConfigError::InvalidInterface {
                            gateway: gw.id.clone(),
                            error,
                        })?;
                if !ports.contains(&interface.port) {
                    return Err(ConfigError::InterfaceWithoutUplink {
                        gateway: gw.id.clone(),
                        port: interface.port,
                    });
                }
            }
        }
        let mut hosts = BTreeSet::new();
        for host in &self.hosts {
            if !hosts.insert(host.ip) {
                return Err(ConfigError::DuplicateHost(host.ip));
            }
            if !self.local_prefix.contains(&host.ip) {
                return Err(ConfigError::HostNotLocal(host.ip, self.local_prefix));
            }
        }
        Ok(())
    }

    /// The topology the declared uplinks make up
    #[must_use]
    pub fn topology(&self) -> StaticTopology {
        let mut topology = StaticTopology::new();
        for gw in &self.gateways {
            for uplink in &gw.uplinks {
                topology.set_uplink(gw.id.clone(), uplink.port, uplink.enabled);
            }
        }
        topology
    }
}
