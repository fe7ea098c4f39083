// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Proxy ARP for the addresses of the uplink interfaces

use crate::dispatcher::{OutboundFrame, Output};
use gateway::GatewayRegistry;
use net::arp::{Arp, ArpOp};
use net::eth::{Eth, EthType};
use net::headers::{Headers, Net};
use net::packet::{DoneReason, Packet};
use tracing::{debug, error, trace};

/// Answers ARP requests for any address owned by an interface of any gateway
#[derive(Debug, Default, Clone, Copy)]
pub struct ArpProxy;

impl ArpProxy {
    /// Build the reply to an ARP request, or tell why there is none.
    pub fn handle(
        &self,
        registry: &GatewayRegistry,
        arp: &Arp,
    ) -> Result<OutboundFrame, DoneReason> {
        if arp.op() != ArpOp::REQUEST {
            trace!("Ignoring ARP {}", arp.op());
            return Err(DoneReason::ArpNotRequest);
        }
        let target = arp.target_ip();
        let Some(owner) = registry.arp_lookup(target) else {
            trace!("Not answering who-has {target}");
            return Err(DoneReason::ArpNotOwned);
        };
        debug!(
            "{target} is-at {owner}, answering {} ({})",
            arp.sender_ip(),
            arp.sender_mac()
        );
        let eth = Eth::new(owner, arp.sender_mac(), EthType::ARP);
        let mut headers = Headers::new(eth);
        headers.net = Some(Net::Arp(arp.reply(owner)));
        let mut reply = Packet::from_parts(headers, Vec::new());
        let frame = reply.serialize().map_err(|e| {
            error!("Failed to serialize ARP reply: {e}");
            DoneReason::Malformed
        })?;
        Ok(OutboundFrame {
            output: Output::Flood,
            frame,
        })
    }
}
