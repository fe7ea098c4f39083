// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]

//! Source NAT for the hosts behind an SD-WAN gateway
//!
//! Hosts of the local prefix reach the outside through one of the gateway's uplinks. The first
//! packet of a TCP or UDP flow is translated by the [`NatEngine`], which binds the flow to an
//! uplink and a translated port, and describes the translation as a pair of [`FlowRule`]s for the
//! rule layer to install. ICMP echo messages are translated packet by packet.
//!
//! Mapping is endpoint-independent: a host source (ip, port) which already has a session keeps
//! its uplink and translated port for every new flow, whatever the peer.
//!
//! # Example
//!
//! ```
//! use net::interface::PortId;
//! use sdwan_nat::{Protocol, SessionTable};
//!
//! let mut table = SessionTable::new(PortId::new(1), 1..=u16::MAX);
//! // TCP and UDP draw from the same ports
//! assert_eq!(table.allocate(Protocol::Tcp).unwrap(), 1);
//! assert_eq!(table.allocate(Protocol::Udp).unwrap(), 2);
//! // ICMP identifiers are independent
//! assert_eq!(table.allocate(Protocol::Icmp).unwrap(), 1);
//! ```
//!
//! # Limitations
//!
//! - Only NAT44 is supported
//! - ICMP messages other than echo request and echo reply are not translated
//! - Echo sessions are never expired

mod allocator;
mod engine;
mod errors;
mod params;
mod protocol;
mod rule;
mod session;
mod table;

pub use engine::{
    Binding, EchoTranslation, FlowDescriptor, NatEngine, Translation, UplinkArena, UplinkView,
    apply_actions,
};
pub use errors::NatError;
pub use params::{
    DEFAULT_IDLE_TIMEOUT, DEFAULT_PORT_RANGE, DEFAULT_PRIORITY, NatParams, NatParamsBuilder,
    NatParamsBuilderError,
};
pub use protocol::Protocol;
pub use rule::{ETH_TYPE_IPV4, FlowAction, FlowDirection, FlowMatch, FlowRule, RuleId};
pub use session::NatSession;
pub use table::SessionTable;

use tracectl::trace_target;
trace_target!("nat", LevelFilter::INFO, &["nat", "pipeline"]);
