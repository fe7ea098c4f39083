// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

pub use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "SD-WAN gateway dataplane")]
#[command(version = "0.1")]
#[command(about = "Load-balancing NAT for the hosts behind SD-WAN gateways", long_about = None)]
pub struct CmdArgs {
    #[arg(long, value_name = "YAML file with the gateways, hosts and NAT settings")]
    config: Option<PathBuf>,
    #[arg(long, value_name = "file of recorded frames and counters to process")]
    replay: Option<PathBuf>,
    #[arg(long, value_name = "tracing configuration, as 'tag=level,...'")]
    tracing: Option<String>,
    #[arg(long, help = "list the tracing targets by tag and exit")]
    show_tracing_tags: bool,
}

impl CmdArgs {
    #[must_use]
    pub fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }
    #[must_use]
    pub fn replay(&self) -> Option<&Path> {
        self.replay.as_deref()
    }
    #[must_use]
    pub fn tracing(&self) -> Option<&str> {
        self.tracing.as_deref()
    }
    #[must_use]
    pub fn show_tracing_tags(&self) -> bool {
        self.show_tracing_tags
    }
}
