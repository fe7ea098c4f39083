// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration of the dataplane: the local prefix, NAT and telemetry settings, the gateways
//! with the interfaces to provision on them, and the static table of LAN hosts.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

pub mod dpconfig;
pub mod errors;

pub use dpconfig::{
    DataplaneConfig, GatewayConfig, HostConfig, NatConfig, TelemetryConfig, UplinkConfig,
}; // re-export
pub use errors::{ConfigError, ConfigResult}; // re-export

use tracectl::trace_target;
trace_target!("config", LevelFilter::INFO, &["management"]);
