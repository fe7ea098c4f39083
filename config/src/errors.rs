// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Type for configuration / validation failures

use gateway::{GatewayId, ValidationError};
use ipnet::Ipv4Net;
use net::interface::PortId;
use std::net::Ipv4Addr;
use thiserror::Error;

/// The reasons why we may reject a configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {reason}")]
    Read { path: String, reason: String },
    #[error("Malformed configuration: {0}")]
    Parse(String),
    #[error("Invalid NAT parameters: {0}")]
    BadNatParams(String),
    #[error("Sampling period must be at least one second")]
    BadSamplingPeriod,
    #[error("Gateway {0} is declared more than once")]
    DuplicateGateway(GatewayId),
    #[error("Port {1} of gateway {0} is declared more than once")]
    DuplicateUplink(GatewayId, PortId),
    #[error("Invalid interface for gateway {gateway}: {error}")]
    InvalidInterface {
        gateway: GatewayId,
        error: ValidationError,
    },
    #[error("Interface on port {port} of gateway {gateway} has no declared uplink")]
    InterfaceWithoutUplink { gateway: GatewayId, port: PortId },
    #[error("Host {0} is declared more than once")]
    DuplicateHost(Ipv4Addr),
    #[error("Host {0} is not within the local prefix {1}")]
    HostNotLocal(Ipv4Addr, Ipv4Net),
}

/// Result-like type for configurations
pub type ConfigResult<T> = Result<T, ConfigError>;
