// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Proxy-ARP table: the addresses of every uplink interface of every gateway

use net::eth::mac::Mac;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArpTable(BTreeMap<Ipv4Addr, Mac>);

impl ArpTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, ip: Ipv4Addr, mac: Mac) -> Option<Mac> {
        self.0.insert(ip, mac)
    }
    pub fn remove(&mut self, ip: Ipv4Addr) -> Option<Mac> {
        self.0.remove(&ip)
    }
    #[must_use]
    pub fn lookup(&self, ip: Ipv4Addr) -> Option<Mac> {
        self.0.get(&ip).copied()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&Ipv4Addr, &Mac)> {
        self.0.iter()
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

impl Display for ArpTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, " ─────── proxy ARP ({} entries) ───────", self.len())?;
        for (ip, mac) in self.iter() {
            writeln!(f, " {ip:<16} {mac}")?;
        }
        Ok(())
    }
}
