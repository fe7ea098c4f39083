// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Verdicts on processed frames and per-verdict counters.

use std::collections::HashMap;
use std::fmt::Display;

/// The reason why processing of a frame ended.
///
/// Everything but [`DoneReason::Delivered`] means that the frame was not forwarded.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum DoneReason {
    /// the frame could not be parsed
    Malformed,
    /// neither ARP nor IPv4
    Unhandled,
    /// the ingress gateway is not registered
    GatewayUnknown,
    /// the ingress port is not an interface of the gateway
    InterfaceUnknown,
    /// an ARP message other than a request
    ArpNotRequest,
    /// an ARP request for an address no gateway owns
    ArpNotOwned,
    /// IPv4 but not TCP, UDP or ICMP
    UnsupportedProtocol,
    /// an ICMP message other than echo request or reply
    UnsupportedIcmp,
    /// both ends are on the local network
    LocalTraffic,
    /// non ICMP traffic which does not originate from the local network
    NotLocalSource,
    /// no uplink can take a new flow
    NoEgress,
    /// no free port or identifier on the uplink
    NatOutOfResources,
    /// an echo reply which matches no session
    NatSessionMissing,
    /// the frame was emitted
    Delivered,
}

impl DoneReason {
    /// Short name, usable as a metric label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DoneReason::Malformed => "malformed",
            DoneReason::Unhandled => "unhandled",
            DoneReason::GatewayUnknown => "gateway-unknown",
            DoneReason::InterfaceUnknown => "interface-unknown",
            DoneReason::ArpNotRequest => "arp-not-request",
            DoneReason::ArpNotOwned => "arp-not-owned",
            DoneReason::UnsupportedProtocol => "unsupported-protocol",
            DoneReason::UnsupportedIcmp => "unsupported-icmp",
            DoneReason::LocalTraffic => "local-traffic",
            DoneReason::NotLocalSource => "not-local-source",
            DoneReason::NoEgress => "no-egress",
            DoneReason::NatOutOfResources => "nat-out-of-resources",
            DoneReason::NatSessionMissing => "nat-session-missing",
            DoneReason::Delivered => "delivered",
        }
    }
}

impl Display for DoneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts of frames per [`DoneReason`]
#[derive(Default, Debug)]
pub struct PacketDropStats {
    /// Name of the stage that owns these stats
    pub name: String,
    reasons: HashMap<DoneReason, u64>,
}

impl PacketDropStats {
    /// Create empty stats
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            reasons: HashMap::default(),
        }
    }
    /// Add `value` to the counter of `reason`
    pub fn incr(&mut self, reason: DoneReason, value: u64) {
        self.reasons
            .entry(reason)
            .and_modify(|counter| *counter += value)
            .or_insert(value);
    }
    /// The counter of `reason`, if it was ever incremented
    #[must_use]
    pub fn get_stat(&self, reason: DoneReason) -> Option<u64> {
        self.reasons.get(&reason).copied()
    }
    /// All the counters
    #[must_use]
    pub fn get_stats(&self) -> &HashMap<DoneReason, u64> {
        &self.reasons
    }
}

impl Display for PacketDropStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}:", self.name)?;
        let mut reasons: Vec<_> = self.reasons.iter().collect();
        reasons.sort();
        for (reason, count) in reasons {
            writeln!(f, "  {reason:<24} {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::DoneReason;
    use super::PacketDropStats;

    #[test]
    fn test_packet_drop_stats() {
        let mut stats = PacketDropStats::new("dispatcher:gw-1");
        stats.incr(DoneReason::NoEgress, 10);
        stats.incr(DoneReason::NoEgress, 1);
        stats.incr(DoneReason::Delivered, 9);

        assert_eq!(stats.get_stat(DoneReason::NoEgress), Some(11));
        assert_eq!(stats.get_stat(DoneReason::Delivered), Some(9));
        assert_eq!(stats.get_stat(DoneReason::ArpNotOwned), None);
        assert_eq!(stats.get_stats().len(), 2);

        let dump = stats.to_string();
        assert!(dump.starts_with("dispatcher:gw-1:"));
        assert!(dump.contains("no-egress"));
    }
}
