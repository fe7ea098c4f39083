// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The rule layer, as seen from the dispatcher

use gateway::GatewayId;
use nat::FlowRule;
use parking_lot::Mutex;
use tracing::info;

/// Whatever installs flow rules on the gateway devices.
///
/// The rule layer expires rules after their idle timeout and must then report it with
/// [`gateway::GatewayRegistry::on_rule_removed`].
pub trait FlowRuleSink {
    fn install(&self, gateway: &GatewayId, rule: FlowRule);
}

/// A sink which only logs the rules it is given
#[derive(Debug, Default)]
pub struct LoggingSink;

impl FlowRuleSink for LoggingSink {
    fn install(&self, gateway: &GatewayId, rule: FlowRule) {
        info!("gateway {gateway}: install {rule}");
    }
}

/// A sink which keeps the rules it is given
#[derive(Debug, Default)]
pub struct CollectingSink(Mutex<Vec<(GatewayId, FlowRule)>>);

impl CollectingSink {
    /// The rules installed so far, and forget them
    #[must_use]
    pub fn take(&self) -> Vec<(GatewayId, FlowRule)> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl FlowRuleSink for CollectingSink {
    fn install(&self, gateway: &GatewayId, rule: FlowRule) {
        self.0.lock().push((gateway.clone(), rule));
    }
}
