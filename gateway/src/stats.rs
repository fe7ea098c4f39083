// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Interface statistics

use std::fmt::Display;
use std::time::Duration;

/// Default telemetry sampling period
pub const DEFAULT_SAMPLING_PERIOD: Duration = Duration::from_secs(5);

/// What telemetry reports for a port, once per sampling period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSample {
    /// bytes received and sent since the port came up
    pub total_bytes: u64,
    /// bytes received and sent during the period
    pub delta_bytes: u64,
    pub period: Duration,
    pub dropped: u64,
    pub errors: u64,
}

impl StatsSample {
    /// A sample over the default sampling period
    #[must_use]
    pub fn new(total_bytes: u64, delta_bytes: u64) -> Self {
        Self {
            total_bytes,
            delta_bytes,
            period: DEFAULT_SAMPLING_PERIOD,
            dropped: 0,
            errors: 0,
        }
    }
}

/// The last measured state of an interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceStats {
    pub total_bytes: u64,
    pub bits_per_second: u64,
    pub dropped: u64,
    pub errors: u64,
}

impl InterfaceStats {
    /// Build the statistics of an interface from a telemetry sample. Disabled interfaces report
    /// nothing.
    #[must_use]
    pub fn from_sample(sample: &StatsSample, enabled: bool) -> Self {
        if !enabled {
            return Self::default();
        }
        let secs = sample.period.as_secs().max(1);
        Self {
            total_bytes: sample.total_bytes,
            bits_per_second: (sample.delta_bytes / secs).saturating_mul(8),
            dropped: sample.dropped,
            errors: sample.errors,
        }
    }

    /// The measured throughput in Mbps
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // reporting only
    pub fn mbps(&self) -> f64 {
        self.bits_per_second as f64 / 1_000_000.0
    }
}

impl Display for InterfaceStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bytes: {}, bits/sec: {}, dropped: {}, errors: {}",
            self.total_bytes, self.bits_per_second, self.dropped, self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_from_delta() {
        let sample = StatsSample {
            total_bytes: 10_000_000,
            delta_bytes: 1_250_000,
            period: Duration::from_secs(5),
            dropped: 3,
            errors: 1,
        };
        let stats = InterfaceStats::from_sample(&sample, true);
        assert_eq!(stats.bits_per_second, 2_000_000);
        assert_eq!(stats.total_bytes, 10_000_000);
        assert_eq!((stats.dropped, stats.errors), (3, 1));
        assert!((stats.mbps() - 2.0).abs() < f64::EPSILON);

        assert_eq!(
            InterfaceStats::from_sample(&sample, false),
            InterfaceStats::default()
        );
    }
}
