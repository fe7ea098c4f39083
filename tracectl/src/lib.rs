// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Crate to control tracing dynamically at runtime.
//!
//! Every crate of the gateway declares the tracing targets of its modules with
//! [`trace_target!`]. The targets are collected at link time, so the binary can list them
//! (`--show-tracing-tags`) and change their levels by tag (`--tracing "nat=debug"`).

#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::missing_errors_doc)]

pub mod control;
pub mod display;
pub mod targets;

// re-exports
pub use control::TraceCtlError;
pub use control::TracingControl;
pub use control::get_trace_ctl;
pub use targets::TargetKind;
pub use tracing_subscriber::filter::LevelFilter;
