// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Where LAN hosts are attached

use config::HostConfig;
use net::eth::mac::Mac;
use net::interface::PortId;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// The attachment point of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostLocation {
    pub mac: Mac,
    pub port: PortId,
}

/// Knowledge of the hosts of the local network
pub trait HostLocator {
    fn locate(&self, ip: Ipv4Addr) -> Option<HostLocation>;
}

/// A static host table
#[derive(Debug, Clone, Default)]
pub struct HostTable(BTreeMap<Ipv4Addr, HostLocation>);

impl HostTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ip: Ipv4Addr, location: HostLocation) -> Option<HostLocation> {
        self.0.insert(ip, location)
    }

    pub fn remove(&mut self, ip: Ipv4Addr) -> Option<HostLocation> {
        self.0.remove(&ip)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl HostLocator for HostTable {
    fn locate(&self, ip: Ipv4Addr) -> Option<HostLocation> {
        self.0.get(&ip).copied()
    }
}

impl From<&[HostConfig]> for HostTable {
    fn from(hosts: &[HostConfig]) -> Self {
        let mut table = HostTable::new();
        for host in hosts {
            table.add(
                host.ip,
                HostLocation {
                    mac: host.mac,
                    port: host.port,
                },
            );
        }
        table
    }
}
