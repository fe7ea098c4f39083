// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]
#![allow(clippy::missing_errors_doc)]

//! The packet path of the SD-WAN gateway.
//!
//! Gateways punt to the [`PacketDispatcher`] the frames that no installed rule matched: ARP
//! requests, ICMP echo messages and the first packet of every TCP or UDP flow. The dispatcher
//! answers ARP for the uplink addresses, translates echo messages itself and, for new flows,
//! picks an uplink, translates the packet and hands a pair of rules to a [`FlowRuleSink`] so
//! that the rest of the flow never comes back.

pub mod arp_proxy;
pub mod dispatcher;
pub mod hosts;
pub mod replay;
pub mod setup;
pub mod sink;
pub mod statistics;
pub mod telemetry;

pub use arp_proxy::ArpProxy;
pub use dispatcher::{Dispatch, Ingress, OutboundFrame, Output, PacketDispatcher};
pub use hosts::{HostLocation, HostLocator, HostTable};
pub use sink::{CollectingSink, FlowRuleSink, LoggingSink};
pub use telemetry::CounterFeed;

use tracectl::trace_target;
trace_target!("dataplane", LevelFilter::INFO, &["pipeline"]);
