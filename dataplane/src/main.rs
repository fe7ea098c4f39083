// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]
#![allow(rustdoc::missing_crate_level_docs)]

mod args;

use crate::args::{CmdArgs, Parser};

use config::DataplaneConfig;
use dataplane::replay::{self, Event};
use dataplane::setup::{build_dispatcher, build_registry};
use dataplane::statistics::init_metrics;
use dataplane::{CounterFeed, LoggingSink};

use tracectl::{TraceCtlError, TracingControl, get_trace_ctl};
use tracing::{error, info, warn};

/// Install the tracing subscriber, then apply the levels asked for on the command line
fn init_logging(args: &CmdArgs) -> Result<&'static TracingControl, TraceCtlError> {
    let tctl = get_trace_ctl();
    if let Some(tracing) = args.tracing() {
        tctl.setup_from_string(tracing)?;
    }
    Ok(tctl)
}

fn main() {
    /* parse cmd line args */
    let args = CmdArgs::parse();

    /* initialize logging */
    let tctl = match init_logging(&args) {
        Ok(tctl) => tctl,
        Err(e) => {
            error!("Invalid tracing configuration: {e}");
            std::process::exit(1);
        }
    };
    if args.show_tracing_tags() {
        println!("{}", tctl.targets_by_tag_string());
        std::process::exit(0);
    }
    init_metrics();
    info!("Starting SD-WAN dataplane...");

    /* configuration */
    let config = match args.config() {
        Some(path) => match DataplaneConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Bad configuration: {e}");
                std::process::exit(1);
            }
        },
        None => {
            warn!("No configuration given: no gateways will be known");
            DataplaneConfig::default()
        }
    };

    let registry = match build_registry(&config) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to set up gateways: {e}");
            std::process::exit(1);
        }
    };
    for gw in registry.gateways() {
        info!("Gateway {} with {} interfaces", gw.id, gw.interfaces);
    }
    let dispatcher = build_dispatcher(&config, registry.clone(), LoggingSink);

    /* replay */
    let Some(path) = args.replay() else {
        info!("Nothing to replay");
        return;
    };
    let records = match replay::load(path) {
        Ok(records) => records,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };
    let mut feed = CounterFeed::new(config.telemetry.sampling_period());
    for record in records {
        match record.event {
            Event::Frame { ingress, frame } => {
                let dispatch = dispatcher.process(&ingress, &frame);
                info!("line {}: {ingress}: {dispatch}", record.line);
            }
            Event::Counters {
                gateway,
                port,
                total_bytes,
            } => {
                if let Err(e) = feed.feed(&registry, &gateway, port, total_bytes) {
                    warn!("line {}: {e}", record.line);
                }
            }
        }
    }

    for gw in registry.gateways() {
        match registry.statistics(&gw.id) {
            Ok(stats) => {
                for s in stats {
                    info!(
                        "Gateway {} port {} ({}): {:.3} Mbps, {} bytes",
                        gw.id, s.port, s.name, s.mbps, s.total_bytes
                    );
                }
            }
            Err(e) => warn!("{e}"),
        }
    }
    info!("Frames processed:\n{}", dispatcher.stats_dump());
}
