// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

//! Gateways, their uplinks, and how new flows are spread over them.
//!
//! A [`Gateway`] owns its uplinks: the [`Interface`], the NAT [`nat::SessionTable`], the last
//! [`InterfaceStats`] and the weight of each. The weight of an uplink is the capacity it has
//! left: its committed bandwidth minus its measured throughput, or nothing if it is down. The
//! [`LoadBalancer`] draws the uplink of each new flow in proportion to these weights.
//!
//! The [`GatewayRegistry`] holds every gateway and the proxy-ARP table of their interfaces.

mod arp;
mod balancer;
mod errors;
mod gateway;
mod interface;
mod registry;
mod report;
mod stats;
mod topology;

pub use arp::ArpTable;
pub use balancer::LoadBalancer;
pub use errors::GatewayError;
pub use gateway::{Gateway, GatewayId, Uplink};
pub use interface::{BITS_PER_MBPS, Interface, InterfaceDescriptor, InterfaceField, ValidationError};
pub use registry::{GatewayHandle, GatewayRegistry};
pub use report::{GatewayReport, InterfaceReport, StatisticsReport};
pub use stats::{DEFAULT_SAMPLING_PERIOD, InterfaceStats, StatsSample};
pub use topology::{StaticTopology, Topology};

use tracectl::trace_target;
trace_target!("gateway", LevelFilter::INFO, &["gateway"]);
