// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Flow rule descriptors.
//!
//! A [`FlowRule`] is what the NAT engine hands to the external rule layer: a match on the
//! 5-tuple, a list of header rewrites and an output port. The rule layer owns the idle timeout
//! and reports removal back by [`RuleId`].

use crate::protocol::Protocol;
use ipnet::Ipv4Net;
use net::eth::mac::Mac;
use net::interface::PortId;
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::time::Duration;
use uuid::Uuid;

/// Ethertype of IPv4, as matched by outbound rules
pub const ETH_TYPE_IPV4: u16 = 0x0800;

/// Unique identifier of a flow rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(Uuid);

impl RuleId {
    /// A fresh, random identifier
    #[must_use]
    pub fn new() -> RuleId {
        RuleId(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RuleId {
    fn from(value: Uuid) -> Self {
        RuleId(value)
    }
}

impl Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which way a rule translates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowDirection {
    /// host to peer: source NAT
    Outbound,
    /// peer to host: the reverse translation
    Inbound,
}

/// What a rule matches on. Addresses are /32 prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowMatch {
    pub eth_type: Option<u16>,
    pub protocol: Protocol,
    pub src_ip: Ipv4Net,
    pub src_port: u16,
    pub dst_ip: Ipv4Net,
    pub dst_port: u16,
}

/// A header rewrite or forwarding decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowAction {
    SetIpSrc(Ipv4Addr),
    SetEthSrc(Mac),
    SetTpSrc(u16),
    SetIpDst(Ipv4Addr),
    SetEthDst(Mac),
    SetTpDst(u16),
    Output(PortId),
}

/// One direction of a translated flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRule {
    pub id: RuleId,
    pub direction: FlowDirection,
    pub matches: FlowMatch,
    pub actions: Vec<FlowAction>,
    pub idle_timeout: Duration,
    pub priority: u16,
}

impl FlowRule {
    /// The port the rule forwards to, if any
    #[must_use]
    pub fn output(&self) -> Option<PortId> {
        self.actions.iter().find_map(|a| match a {
            FlowAction::Output(port) => Some(*port),
            _ => None,
        })
    }
}

impl Display for FlowMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(eth_type) = self.eth_type {
            write!(f, "eth_type={eth_type:#06x} ")?;
        }
        write!(
            f,
            "{} {}:{} -> {}:{}",
            self.protocol, self.src_ip, self.src_port, self.dst_ip, self.dst_port
        )
    }
}

impl Display for FlowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowAction::SetIpSrc(ip) => write!(f, "set_ip_src:{ip}"),
            FlowAction::SetEthSrc(mac) => write!(f, "set_eth_src:{mac}"),
            FlowAction::SetTpSrc(port) => write!(f, "set_tp_src:{port}"),
            FlowAction::SetIpDst(ip) => write!(f, "set_ip_dst:{ip}"),
            FlowAction::SetEthDst(mac) => write!(f, "set_eth_dst:{mac}"),
            FlowAction::SetTpDst(port) => write!(f, "set_tp_dst:{port}"),
            FlowAction::Output(port) => write!(f, "output:{port}"),
        }
    }
}

impl Display for FlowRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rule {} ({:?}, prio {}, idle {}s) match [{}] actions [",
            self.id,
            self.direction,
            self.priority,
            self.idle_timeout.as_secs(),
            self.matches
        )?;
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{action}")?;
        }
        write!(f, "]")
    }
}
