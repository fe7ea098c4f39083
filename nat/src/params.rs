// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tunables of the NAT engine

use derive_builder::Builder;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Idle timeout the rule layer applies to TCP/UDP rules
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(20);
/// Priority of the rules installed for translated flows
pub const DEFAULT_PRIORITY: u16 = 50000;
/// Range of translated ports and ICMP identifiers
pub const DEFAULT_PORT_RANGE: RangeInclusive<u16> = 1..=u16::MAX;

/// Struct to configure the NAT engine. N.B we derive a builder type `NatParamsBuilder`
/// and provide defaults for each field.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct NatParams {
    #[builder(setter(into), default = DEFAULT_IDLE_TIMEOUT)]
    pub idle_timeout: Duration,

    #[builder(default = DEFAULT_PRIORITY)]
    pub priority: u16,

    /// Translated ports and ICMP identifiers are taken from this range
    #[builder(default = DEFAULT_PORT_RANGE)]
    pub port_range: RangeInclusive<u16>,
}

impl NatParamsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(range) = &self.port_range
            && (range.is_empty() || *range.start() == 0)
        {
            return Err(format!(
                "invalid port range {}-{}",
                range.start(),
                range.end()
            ));
        }
        Ok(())
    }
}

impl Default for NatParams {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            priority: DEFAULT_PRIORITY,
            port_range: DEFAULT_PORT_RANGE,
        }
    }
}

impl Display for NatParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        writeln!(f, "NAT config")?;
        writeln!(f, "  idle timeout: {}s", self.idle_timeout.as_secs())?;
        writeln!(f, "  priority    : {}", self.priority)?;
        writeln!(
            f,
            "  ports       : {}-{}",
            self.port_range.start(),
            self.port_range.end()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let params = NatParamsBuilder::default().build().unwrap();
        assert_eq!(params, NatParams::default());
        assert_eq!(params.idle_timeout, Duration::from_secs(20));
        assert_eq!(params.priority, 50000);
        assert_eq!(params.port_range, 1..=65535);
    }

    #[test]
    fn builder_rejects_bad_range() {
        assert!(
            NatParamsBuilder::default()
                .port_range(0..=10)
                .build()
                .is_err()
        );
        #[allow(clippy::reversed_empty_ranges)]
        let empty = 10..=1;
        assert!(NatParamsBuilder::default().port_range(empty).build().is_err());
        let ok = NatParamsBuilder::default()
            .port_range(1024..=2047)
            .priority(10u16)
            .build()
            .unwrap();
        assert_eq!(ok.port_range, 1024..=2047);
        assert!(ok.to_string().contains("1024-2047"));
    }
}
