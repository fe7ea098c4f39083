// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use gateway::GatewayId;
use metrics::{counter, describe_counter};
use nat::Protocol;
use net::packet::DoneReason;

/// Metric name constants
pub const NO_EGRESS: &str = "sdwan_no_egress_total";
pub const DROPPED_PKTS: &str = "sdwan_dropped_pkts_total";
pub const NAT_SESSIONS: &str = "sdwan_nat_sessions_total";

/// Initialize metrics descriptions
pub fn init_metrics() {
    describe_counter!(
        NO_EGRESS,
        "New flows dropped because no uplink had capacity left"
    );
    describe_counter!(DROPPED_PKTS, "Frames dropped, per reason");
    describe_counter!(NAT_SESSIONS, "NAT sessions created, per protocol");
}

pub(crate) fn count_drop(reason: DoneReason) {
    counter!(DROPPED_PKTS, "reason" => reason.as_str()).increment(1);
}

pub(crate) fn count_no_egress(gateway: &GatewayId) {
    counter!(NO_EGRESS, "gateway" => gateway.to_string()).increment(1);
}

pub(crate) fn count_session(gateway: &GatewayId, protocol: Protocol) {
    counter!(NAT_SESSIONS, "gateway" => gateway.to_string(), "protocol" => protocol.as_str())
        .increment(1);
}
