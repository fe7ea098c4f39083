// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Frame builders for tests

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::too_many_arguments
)]

use crate::arp::Arp;
use crate::eth::mac::Mac;
use crate::eth::{Eth, EthType};
use crate::parse::DeParse;
use etherparse::PacketBuilder;
use std::net::Ipv4Addr;
use std::str::FromStr;

#[must_use]
/// Build an Ipv4 address from a &str
pub fn addr_v4(a: &str) -> Ipv4Addr {
    Ipv4Addr::from_str(a).expect("Bad IPv4 address")
}

fn ipv4_builder(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    src_ip: &str,
    dst_ip: &str,
) -> etherparse::PacketBuilderStep<etherparse::IpHeaders> {
    PacketBuilder::ethernet2(src_mac, dst_mac).ipv4(
        addr_v4(src_ip).octets(),
        addr_v4(dst_ip).octets(),
        64,
    )
}

fn finish<B>(size: usize, write: impl FnOnce(&mut Vec<u8>) -> B) -> Vec<u8> {
    let mut out = Vec::with_capacity(size);
    write(&mut out);
    out
}

#[must_use]
/// Builds a TCP/IPv4/Eth frame with no flags set
pub fn tcp_frame(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    src_ip: &str,
    dst_ip: &str,
    sport: u16,
    dport: u16,
    payload: &[u8],
) -> Vec<u8> {
    let builder = ipv4_builder(src_mac, dst_mac, src_ip, dst_ip).tcp(sport, dport, 1000, 4096);
    finish(builder.size(payload.len()), |out| {
        builder.write(out, payload).unwrap();
    })
}

#[must_use]
/// Builds a TCP SYN/IPv4/Eth frame with no payload
pub fn tcp_syn_frame(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    src_ip: &str,
    dst_ip: &str,
    sport: u16,
    dport: u16,
) -> Vec<u8> {
    let builder = ipv4_builder(src_mac, dst_mac, src_ip, dst_ip)
        .tcp(sport, dport, 1000, 4096)
        .syn();
    finish(builder.size(0), |out| builder.write(out, &[]).unwrap())
}

#[must_use]
/// Builds a UDP/IPv4/Eth frame
pub fn udp_frame(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    src_ip: &str,
    dst_ip: &str,
    sport: u16,
    dport: u16,
    payload: &[u8],
) -> Vec<u8> {
    let builder = ipv4_builder(src_mac, dst_mac, src_ip, dst_ip).udp(sport, dport);
    finish(builder.size(payload.len()), |out| {
        builder.write(out, payload).unwrap();
    })
}

#[must_use]
/// Builds an ICMP echo request/IPv4/Eth frame
pub fn echo_request_frame(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    src_ip: &str,
    dst_ip: &str,
    id: u16,
    seq: u16,
) -> Vec<u8> {
    let payload = b"abcdefgh";
    let builder = ipv4_builder(src_mac, dst_mac, src_ip, dst_ip).icmpv4_echo_request(id, seq);
    finish(builder.size(payload.len()), |out| {
        builder.write(out, payload).unwrap();
    })
}

#[must_use]
/// Builds an ICMP echo reply/IPv4/Eth frame
pub fn echo_reply_frame(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    src_ip: &str,
    dst_ip: &str,
    id: u16,
    seq: u16,
) -> Vec<u8> {
    let payload = b"abcdefgh";
    let builder = ipv4_builder(src_mac, dst_mac, src_ip, dst_ip).icmpv4_echo_reply(id, seq);
    finish(builder.size(payload.len()), |out| {
        builder.write(out, payload).unwrap();
    })
}

#[must_use]
/// Builds an ICMP message of arbitrary type and code (no identifier fields)
pub fn icmp_frame(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    src_ip: &str,
    dst_ip: &str,
    icmp_type: u8,
    icmp_code: u8,
) -> Vec<u8> {
    let builder = ipv4_builder(src_mac, dst_mac, src_ip, dst_ip).icmpv4_raw(
        icmp_type,
        icmp_code,
        [0; 4],
    );
    finish(builder.size(0), |out| builder.write(out, &[]).unwrap())
}

#[must_use]
/// Builds a broadcast ARP request asking who has `target_ip`
pub fn arp_request_frame(sender_mac: Mac, sender_ip: &str, target_ip: &str) -> Vec<u8> {
    let eth = Eth::new(sender_mac, Mac::BROADCAST, EthType::ARP);
    let arp = Arp::request(sender_mac, addr_v4(sender_ip), addr_v4(target_ip));
    let mut buf = vec![0u8; eth.size().get() + arp.size().get()];
    let written = eth.deparse(&mut buf).unwrap();
    arp.deparse(&mut buf[written.get()..]).unwrap();
    buf
}
