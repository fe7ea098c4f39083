// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The error results used by this library.

use crate::gateway::GatewayId;
use crate::interface::ValidationError;
use nat::RuleId;
use net::interface::PortId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("No gateway with id {0}")]
    GatewayNotFound(GatewayId),

    #[error("No interface on port {port} of gateway {gateway}")]
    InterfaceNotFound { gateway: GatewayId, port: PortId },

    #[error("Port {port} of gateway {gateway} already has an interface")]
    InterfaceExists { gateway: GatewayId, port: PortId },

    #[error("Gateway {gateway} has no uplink on port {port}")]
    UplinkNotInTopology { gateway: GatewayId, port: PortId },

    #[error("Invalid interface: {0}")]
    Validation(#[from] ValidationError),

    #[error("No egress uplink available on gateway {0}")]
    NoEgressAvailable(GatewayId),

    #[error("No session is bound to rule {0}")]
    UnknownRule(RuleId),
}
