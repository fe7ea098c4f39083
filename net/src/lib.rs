// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)] // Validation logic should always be strictly safe
#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! A library for working with and strictly validating the frames seen by an SD-WAN gateway.
//!
//! Header types are thin wrappers over [`etherparse`] headers. A [`packet::Packet`] is an owned,
//! fully parsed frame which can be mutated and serialized back (with checksums recomputed).

pub mod arp;
pub mod checksum;
pub mod eth;
pub mod headers;
pub mod icmp4;
pub mod interface;
pub mod ipv4;
pub mod packet;
pub mod parse;
pub mod tcp;
pub mod udp;

use tracectl::trace_target;
trace_target!("net", LevelFilter::INFO, &["packet"]);
