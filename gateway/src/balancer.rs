// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Weighted-random egress selection

use crate::errors::GatewayError;
use crate::gateway::Gateway;
use net::interface::PortId;
use rand::Rng;
use tracing::{debug, trace};

/// Picks the uplink of new flows, in proportion to the capacity each uplink has left.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadBalancer;

impl LoadBalancer {
    /// Draw an enabled uplink of `gateway`.
    ///
    /// The draw is uniform in `[0, total unused capacity)` and walks the uplinks in port order,
    /// so each enabled uplink is picked with a probability proportional to its weight.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NoEgressAvailable`] if no uplink has capacity left.
    pub fn select_egress<R: Rng>(
        &self,
        gateway: &Gateway,
        rng: &mut R,
    ) -> Result<PortId, GatewayError> {
        let total = gateway.total_unused_capacity();
        if total == 0 {
            debug!("gateway {}: no unused capacity", gateway.id());
        }
        let mut draw = rng.random_range(0..total.max(1));
        trace!("gateway {}: draw {draw} of {total}", gateway.id());
        for uplink in gateway.uplinks() {
            if uplink.weight > draw && uplink.interface.enabled {
                return Ok(uplink.interface.port);
            }
            draw = draw.saturating_sub(uplink.weight);
        }
        Err(GatewayError::NoEgressAvailable(gateway.id().clone()))
    }
}
