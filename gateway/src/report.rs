// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Serializable views of the registry, for management front-ends

use crate::gateway::{GatewayId, Uplink};
use net::eth::mac::Mac;
use net::interface::PortId;
use serde::Serialize;
use std::net::Ipv4Addr;

/// A configured uplink interface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceReport {
    pub name: String,
    pub port: PortId,
    pub mac: Mac,
    pub ip: Ipv4Addr,
    /// committed bandwidth, in Mbps
    pub bandwidth: u32,
    pub enabled: bool,
}

/// The last statistics of an uplink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub name: String,
    pub port: PortId,
    pub total_bytes: u64,
    pub mbps: f64,
    pub errors: u64,
    pub dropped: u64,
    pub enabled: bool,
}

/// A gateway and its number of uplinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayReport {
    pub id: GatewayId,
    pub interfaces: usize,
}

impl From<&Uplink> for InterfaceReport {
    fn from(uplink: &Uplink) -> Self {
        let intf = &uplink.interface;
        Self {
            name: intf.name.clone(),
            port: intf.port,
            mac: intf.mac,
            ip: intf.ip,
            bandwidth: intf.bandwidth,
            enabled: intf.enabled,
        }
    }
}

impl From<&Uplink> for StatisticsReport {
    fn from(uplink: &Uplink) -> Self {
        Self {
            name: uplink.interface.name.clone(),
            port: uplink.interface.port,
            total_bytes: uplink.stats.total_bytes,
            mbps: uplink.stats.mbps(),
            errors: uplink.stats.errors,
            dropped: uplink.stats.dropped,
            enabled: uplink.interface.enabled,
        }
    }
}
