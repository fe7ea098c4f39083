// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Uplink interface model

use net::eth::mac::Mac;
use net::interface::PortId;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::Ipv4Addr;

/// Bits per second in one Mbps
pub const BITS_PER_MBPS: u64 = 1_000_000;

/// An uplink interface of a gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub port: PortId,
    pub mac: Mac,
    pub ip: Ipv4Addr,
    /// Committed bandwidth, in Mbps
    pub bandwidth: u32,
    pub enabled: bool,
}

impl Interface {
    /// The committed bandwidth in bits per second
    #[must_use]
    pub fn committed_bps(&self) -> u64 {
        u64::from(self.bandwidth) * BITS_PER_MBPS
    }
}

impl Display for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} port {} {} {} {}Mbps ({})",
            self.name,
            self.port,
            self.ip,
            self.mac,
            self.bandwidth,
            if self.enabled { "enabled" } else { "disabled" }
        )
    }
}

/// The fields of an interface descriptor, in validation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceField {
    MacAddress,
    PortNumber,
    IpAddress,
    Name,
    Bandwidth,
}

impl Display for InterfaceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InterfaceField::MacAddress => "MacAddress",
            InterfaceField::PortNumber => "Port Number",
            InterfaceField::IpAddress => "IP Address",
            InterfaceField::Name => "Interface Name",
            InterfaceField::Bandwidth => "Bandwidth",
        };
        f.write_str(name)
    }
}

/// A malformed field of an [`InterfaceDescriptor`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: '{value}'")]
pub struct ValidationError {
    pub field: InterfaceField,
    pub value: String,
}

impl ValidationError {
    fn new(field: InterfaceField, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// An interface as requested by an operator: every field is text, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub port: String,
    pub mac: String,
    pub ip: String,
    /// Committed bandwidth, in Mbps
    pub bandwidth: String,
}

impl InterfaceDescriptor {
    /// Check every field, in the order of [`InterfaceField`], and build a disabled interface.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first malformed field.
    pub fn validate(&self) -> Result<Interface, ValidationError> {
        let mac = self
            .mac
            .trim()
            .parse::<Mac>()
            .ok()
            .filter(Mac::is_valid_src)
            .ok_or_else(|| ValidationError::new(InterfaceField::MacAddress, &self.mac))?;
        let port = self
            .port
            .parse::<PortId>()
            .ok()
            .filter(|p| p.as_u32() != 0)
            .ok_or_else(|| ValidationError::new(InterfaceField::PortNumber, &self.port))?;
        let ip = self
            .ip
            .trim()
            .parse::<Ipv4Addr>()
            .ok()
            .filter(|ip| !ip.is_unspecified() && !ip.is_broadcast() && !ip.is_multicast())
            .ok_or_else(|| ValidationError::new(InterfaceField::IpAddress, &self.ip))?;
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::new(InterfaceField::Name, &self.name));
        }
        let bandwidth = self
            .bandwidth
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|b| *b > 0)
            .ok_or_else(|| ValidationError::new(InterfaceField::Bandwidth, &self.bandwidth))?;
        Ok(Interface {
            name: name.to_string(),
            port,
            mac,
            ip,
            bandwidth,
            enabled: false,
        })
    }
}
