// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The NAT engine: flow binding, rule descriptors and packet rewriting.

use crate::errors::NatError;
use crate::params::NatParams;
use crate::protocol::Protocol;
use crate::rule::{ETH_TYPE_IPV4, FlowAction, FlowDirection, FlowMatch, FlowRule, RuleId};
use crate::session::NatSession;
use crate::table::SessionTable;
use ipnet::Ipv4Net;
use net::eth::mac::Mac;
use net::headers::Transport;
use net::icmp4::EchoKind;
use net::interface::PortId;
use net::packet::Packet;
use std::net::Ipv4Addr;
use tracing::{debug, trace};

/// Mutable access to an uplink of the arena: its addresses and its sessions
#[derive(Debug)]
pub struct UplinkView<'a> {
    pub id: PortId,
    pub ip: Ipv4Addr,
    pub mac: Mac,
    pub sessions: &'a mut SessionTable,
}

/// Whatever owns the uplinks of a gateway.
pub trait UplinkArena {
    /// The session table of every uplink, in uplink order
    fn session_tables(&self) -> impl Iterator<Item = (PortId, &SessionTable)>;
    /// A single uplink
    fn uplink_mut(&mut self, id: PortId) -> Option<UplinkView<'_>>;
}

/// The 5-tuple (plus source MAC) of a TCP or UDP packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowDescriptor {
    pub protocol: Protocol,
    pub src_mac: Mac,
    pub src_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_ip: Ipv4Addr,
    pub dst_port: u16,
}

impl FlowDescriptor {
    /// Extract the flow of a TCP or UDP packet.
    ///
    /// # Errors
    ///
    /// [`NatError::UnsupportedProtocol`] for anything but TCP and UDP, and
    /// [`NatError::MissingHeader`] if the headers could not be parsed.
    pub fn from_packet(packet: &Packet) -> Result<FlowDescriptor, NatError> {
        let ip = packet.ipv4().ok_or(NatError::MissingHeader("ipv4"))?;
        let (protocol, src_port, dst_port) = match packet.transport() {
            Some(Transport::Tcp(tcp)) => (Protocol::Tcp, tcp.source(), tcp.destination()),
            Some(Transport::Udp(udp)) => (Protocol::Udp, udp.source(), udp.destination()),
            Some(Transport::Icmp4(_)) => {
                return Err(NatError::UnsupportedProtocol(Protocol::Icmp.number()));
            }
            None => {
                let number = ip.protocol().0;
                return Err(match Protocol::from_number(number) {
                    Some(Protocol::Tcp | Protocol::Udp) => NatError::MissingHeader("transport"),
                    _ => NatError::UnsupportedProtocol(number),
                });
            }
        };
        Ok(FlowDescriptor {
            protocol,
            src_mac: packet.eth().source(),
            src_ip: ip.source(),
            src_port,
            dst_ip: ip.destination(),
            dst_port,
        })
    }
}

/// Where a flow leaves the gateway, and as what
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub egress: PortId,
    pub translated_ip: Ipv4Addr,
    pub translated_mac: Mac,
    pub translated_port: u16,
    /// true if an existing session of the host source decided the uplink
    pub affinity: bool,
}

/// Result of translating a TCP/UDP packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub egress: PortId,
    pub session: NatSession,
    pub outbound: FlowRule,
    pub inbound: FlowRule,
    pub affinity: bool,
}

/// Result of translating an ICMP echo message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoTranslation {
    pub uplink: PortId,
    pub session: NatSession,
}

/// Source NAT for the hosts behind a gateway, with endpoint-independent mapping.
///
/// Once a host source (ip, port) is bound to an uplink and a translated port, every later flow
/// of that source reuses the binding, whatever the load balancer would have picked.
#[derive(Debug, Clone, Default)]
pub struct NatEngine {
    params: NatParams,
}

impl NatEngine {
    #[must_use]
    pub fn new(params: NatParams) -> NatEngine {
        NatEngine { params }
    }

    #[must_use]
    pub fn params(&self) -> &NatParams {
        &self.params
    }

    /// A session table configured like this engine's
    #[must_use]
    pub fn session_table(&self, uplink: PortId) -> SessionTable {
        SessionTable::new(uplink, self.params.port_range.clone())
    }

    /// Decide the uplink and translated port of a new flow.
    ///
    /// The translated port is taken (or shared) on the chosen uplink: the caller must record a
    /// session for it.
    ///
    /// # Errors
    ///
    /// [`NatError::UnknownUplink`] if the uplink is not in the arena, and
    /// [`NatError::PortExhaustion`] if no port is left on it.
    pub fn bind<A: UplinkArena>(
        &self,
        arena: &mut A,
        flow: &FlowDescriptor,
        candidate: PortId,
    ) -> Result<Binding, NatError> {
        let existing = arena.session_tables().find_map(|(id, table)| {
            table
                .find_by_host_source(flow.src_ip, flow.src_port)
                .map(|s| (id, s.translated_id))
        });
        let (egress, reuse) = match existing {
            Some((id, port)) => {
                if id != candidate {
                    debug!(
                        "{}:{} is bound to uplink {id}, overriding candidate {candidate}",
                        flow.src_ip, flow.src_port
                    );
                }
                (id, Some(port))
            }
            None => (candidate, None),
        };
        let uplink = arena
            .uplink_mut(egress)
            .ok_or(NatError::UnknownUplink(egress))?;
        let translated_port = match reuse {
            Some(port) => {
                uplink.sessions.share_port(port);
                port
            }
            None => uplink.sessions.allocate(flow.protocol)?,
        };
        Ok(Binding {
            egress,
            translated_ip: uplink.ip,
            translated_mac: uplink.mac,
            translated_port,
            affinity: reuse.is_some(),
        })
    }

    /// The outbound and inbound rules of a bound flow
    #[must_use]
    pub fn rules(
        &self,
        flow: &FlowDescriptor,
        binding: &Binding,
        ingress: PortId,
    ) -> (FlowRule, FlowRule) {
        let outbound = FlowRule {
            id: RuleId::new(),
            direction: FlowDirection::Outbound,
            matches: FlowMatch {
                eth_type: Some(ETH_TYPE_IPV4),
                protocol: flow.protocol,
                src_ip: Ipv4Net::from(flow.src_ip),
                src_port: flow.src_port,
                dst_ip: Ipv4Net::from(flow.dst_ip),
                dst_port: flow.dst_port,
            },
            actions: vec![
                FlowAction::SetIpSrc(binding.translated_ip),
                FlowAction::SetEthSrc(binding.translated_mac),
                FlowAction::SetTpSrc(binding.translated_port),
                FlowAction::Output(binding.egress),
            ],
            idle_timeout: self.params.idle_timeout,
            priority: self.params.priority,
        };
        let inbound = FlowRule {
            id: RuleId::new(),
            direction: FlowDirection::Inbound,
            matches: FlowMatch {
                eth_type: None,
                protocol: flow.protocol,
                src_ip: Ipv4Net::from(flow.dst_ip),
                src_port: flow.dst_port,
                dst_ip: Ipv4Net::from(binding.translated_ip),
                dst_port: binding.translated_port,
            },
            actions: vec![
                FlowAction::SetIpDst(flow.src_ip),
                FlowAction::SetEthDst(flow.src_mac),
                FlowAction::SetTpDst(flow.src_port),
                FlowAction::Output(ingress),
            ],
            idle_timeout: self.params.idle_timeout,
            priority: self.params.priority,
        };
        (outbound, inbound)
    }

    /// Translate the first packet of a TCP or UDP flow from a host.
    ///
    /// Binds the flow (honoring the affinity of its source), records the session keyed by the
    /// outbound rule and rewrites the packet as the outbound rule would.
    ///
    /// # Errors
    ///
    /// Fails if the packet is not TCP or UDP, if an uplink is unknown, or if ports ran out.
    pub fn translate<A: UplinkArena>(
        &self,
        arena: &mut A,
        packet: &mut Packet,
        ingress: PortId,
        candidate: PortId,
    ) -> Result<Translation, NatError> {
        let flow = FlowDescriptor::from_packet(packet)?;
        let binding = self.bind(arena, &flow, candidate)?;
        let (outbound, inbound) = self.rules(&flow, &binding, ingress);
        let session = NatSession {
            host_ip: flow.src_ip,
            host_id: flow.src_port,
            translated_ip: binding.translated_ip,
            translated_id: binding.translated_port,
            peer_ip: flow.dst_ip,
            peer_id: Some(flow.dst_port),
            protocol: flow.protocol,
        };
        arena
            .uplink_mut(binding.egress)
            .ok_or(NatError::UnknownUplink(binding.egress))?
            .sessions
            .add_session(outbound.id, session);
        apply_actions(&outbound, packet);
        Ok(Translation {
            egress: binding.egress,
            session,
            outbound,
            inbound,
            affinity: binding.affinity,
        })
    }

    /// Translate an echo request leaving through `egress`.
    ///
    /// Every request gets a new identifier of the egress uplink, recorded as an echo session,
    /// and the uplink's addresses as its source.
    ///
    /// # Errors
    ///
    /// [`NatError::NotEcho`] if this is not an echo request, [`NatError::UnknownUplink`] and
    /// [`NatError::PortExhaustion`].
    pub fn handle_egress<A: UplinkArena>(
        &self,
        arena: &mut A,
        packet: &mut Packet,
        egress: PortId,
    ) -> Result<EchoTranslation, NatError> {
        let (host_ip, peer_ip) = ip_pair(packet)?;
        let host_id = echo_id(packet, EchoKind::Request)?;
        let uplink = arena
            .uplink_mut(egress)
            .ok_or(NatError::UnknownUplink(egress))?;
        let session = NatSession {
            host_ip,
            host_id,
            translated_ip: uplink.ip,
            translated_id: uplink.sessions.allocate_icmp_id()?,
            peer_ip,
            peer_id: None,
            protocol: Protocol::Icmp,
        };
        uplink.sessions.add_echo_session(session);
        if let Some(icmp) = packet.icmp4_mut() {
            icmp.set_echo_id(session.translated_id);
        }
        if let Some(ip) = packet.ipv4_mut() {
            ip.set_source(uplink.ip);
        }
        packet.eth_mut().set_source(uplink.mac);
        trace!("echo request {host_ip}:{host_id} sent as {}:{}", uplink.ip, session.translated_id);
        Ok(EchoTranslation {
            uplink: egress,
            session,
        })
    }

    /// Translate an echo reply received on `ingress` back to the host that sent the request.
    ///
    /// # Errors
    ///
    /// [`NatError::NotEcho`] if this is not an echo reply, [`NatError::UnknownUplink`] and
    /// [`NatError::NoSession`] if the identifier was not handed out to that peer.
    pub fn handle_ingress<A: UplinkArena>(
        &self,
        arena: &A,
        packet: &mut Packet,
        ingress: PortId,
    ) -> Result<EchoTranslation, NatError> {
        let (peer_ip, uplink_ip) = ip_pair(packet)?;
        let translated_id = echo_id(packet, EchoKind::Reply)?;
        let (_, table) = arena
            .session_tables()
            .find(|(id, _)| *id == ingress)
            .ok_or(NatError::UnknownUplink(ingress))?;
        let (host_ip, host_id) = table
            .find_reverse(peer_ip, translated_id, Protocol::Icmp)
            .ok_or(NatError::NoSession {
                peer: peer_ip,
                id: translated_id,
                protocol: Protocol::Icmp,
            })?;
        let session = NatSession {
            host_ip,
            host_id,
            translated_ip: uplink_ip,
            translated_id,
            peer_ip,
            peer_id: None,
            protocol: Protocol::Icmp,
        };
        if let Some(ip) = packet.ipv4_mut() {
            ip.set_destination(host_ip);
        }
        if let Some(icmp) = packet.icmp4_mut() {
            icmp.set_echo_id(host_id);
        }
        trace!("echo reply from {peer_ip} id {translated_id} back to {host_ip}:{host_id}");
        Ok(EchoTranslation {
            uplink: ingress,
            session,
        })
    }
}

fn ip_pair(packet: &Packet) -> Result<(Ipv4Addr, Ipv4Addr), NatError> {
    let ip = packet.ipv4().ok_or(NatError::MissingHeader("ipv4"))?;
    Ok((ip.source(), ip.destination()))
}

fn echo_id(packet: &Packet, expected: EchoKind) -> Result<u16, NatError> {
    let icmp = packet.icmp4().ok_or(NatError::MissingHeader("icmp"))?;
    match icmp.echo() {
        Some((kind, id)) if kind == expected => Ok(id),
        _ => Err(NatError::NotEcho {
            icmp_type: icmp.icmp_type(),
            icmp_code: icmp.icmp_code(),
        }),
    }
}

/// Rewrite a packet the way the rule layer would apply `rule`.
pub fn apply_actions(rule: &FlowRule, packet: &mut Packet) {
    for action in &rule.actions {
        match *action {
            FlowAction::SetIpSrc(ip) => {
                if let Some(hdr) = packet.ipv4_mut() {
                    hdr.set_source(ip);
                }
            }
            FlowAction::SetIpDst(ip) => {
                if let Some(hdr) = packet.ipv4_mut() {
                    hdr.set_destination(ip);
                }
            }
            FlowAction::SetEthSrc(mac) => {
                packet.eth_mut().set_source(mac);
            }
            FlowAction::SetEthDst(mac) => {
                packet.eth_mut().set_destination(mac);
            }
            FlowAction::SetTpSrc(port) => {
                if let Some(tcp) = packet.tcp_mut() {
                    tcp.set_source(port);
                } else if let Some(udp) = packet.udp_mut() {
                    udp.set_source(port);
                }
            }
            FlowAction::SetTpDst(port) => {
                if let Some(tcp) = packet.tcp_mut() {
                    tcp.set_destination(port);
                } else if let Some(udp) = packet.udp_mut() {
                    udp.set_destination(port);
                }
            }
            FlowAction::Output(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use net::checksum::Checksum;
    use net::packet::test_utils::{
        addr_v4, echo_reply_frame, echo_request_frame, icmp_frame, tcp_syn_frame, udp_frame,
    };
    use net::tcp::L4ChecksumPayload;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tracing_test::traced_test;

    const HOST_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 5];
    const LAN_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0xfe];
    const LAN: PortId = PortId::new(5);
    const UPLINK_A: PortId = PortId::new(1);
    const UPLINK_B: PortId = PortId::new(2);

    struct TestArena {
        uplinks: BTreeMap<PortId, (Ipv4Addr, Mac, SessionTable)>,
    }

    impl TestArena {
        fn new(engine: &NatEngine) -> Self {
            let mut uplinks = BTreeMap::new();
            for (id, ip, last) in [
                (UPLINK_A, "203.0.113.7", 0xa1),
                (UPLINK_B, "198.51.100.9", 0xb1),
            ] {
                let mac = Mac([0x02, 0, 0, 0, 0xaa, last]);
                uplinks.insert(id, (addr_v4(ip), mac, engine.session_table(id)));
            }
            TestArena { uplinks }
        }
        fn table(&self, id: PortId) -> &SessionTable {
            &self.uplinks[&id].2
        }
    }

    impl UplinkArena for TestArena {
        fn session_tables(&self) -> impl Iterator<Item = (PortId, &SessionTable)> {
            self.uplinks.iter().map(|(id, (_, _, table))| (*id, table))
        }
        fn uplink_mut(&mut self, id: PortId) -> Option<UplinkView<'_>> {
            self.uplinks
                .get_mut(&id)
                .map(|(ip, mac, sessions)| UplinkView {
                    id,
                    ip: *ip,
                    mac: *mac,
                    sessions,
                })
        }
    }

    fn syn(src: &str, sport: u16, dst: &str, dport: u16) -> Packet {
        Packet::parse(&tcp_syn_frame(HOST_MAC, LAN_MAC, src, dst, sport, dport)).unwrap()
    }

    #[test]
    fn translated_ports_are_allocated_in_order() {
        let engine = NatEngine::default();
        let mut arena = TestArena::new(&engine);

        let mut first = syn("10.0.0.5", 4444, "93.184.216.34", 80);
        let t1 = engine.translate(&mut arena, &mut first, LAN, UPLINK_A).unwrap();
        assert_eq!(t1.session.translated_id, 1);

        let mut second = syn("10.0.0.6", 4444, "93.184.216.34", 80);
        let t2 = engine.translate(&mut arena, &mut second, LAN, UPLINK_A).unwrap();
        assert_eq!(t2.session.translated_id, 2);
        assert_eq!(arena.table(UPLINK_A).len(), 2);
    }

    #[test]
    fn rules_are_symmetric() {
        let engine = NatEngine::default();
        let mut arena = TestArena::new(&engine);
        let mut packet = syn("10.0.0.5", 4444, "93.184.216.34", 80);
        let t = engine.translate(&mut arena, &mut packet, LAN, UPLINK_A).unwrap();

        let uplink_ip = addr_v4("203.0.113.7");
        let uplink_mac = Mac([0x02, 0, 0, 0, 0xaa, 0xa1]);
        assert_eq!(t.outbound.direction, FlowDirection::Outbound);
        assert_eq!(
            t.outbound.matches,
            FlowMatch {
                eth_type: Some(0x0800),
                protocol: Protocol::Tcp,
                src_ip: "10.0.0.5/32".parse().unwrap(),
                src_port: 4444,
                dst_ip: "93.184.216.34/32".parse().unwrap(),
                dst_port: 80,
            }
        );
        assert_eq!(
            t.outbound.actions,
            vec![
                FlowAction::SetIpSrc(uplink_ip),
                FlowAction::SetEthSrc(uplink_mac),
                FlowAction::SetTpSrc(1),
                FlowAction::Output(UPLINK_A),
            ]
        );
        assert_eq!(
            t.inbound.matches,
            FlowMatch {
                eth_type: None,
                protocol: Protocol::Tcp,
                src_ip: "93.184.216.34/32".parse().unwrap(),
                src_port: 80,
                dst_ip: "203.0.113.7/32".parse().unwrap(),
                dst_port: 1,
            }
        );
        assert_eq!(
            t.inbound.actions,
            vec![
                FlowAction::SetIpDst(addr_v4("10.0.0.5")),
                FlowAction::SetEthDst(Mac(HOST_MAC)),
                FlowAction::SetTpDst(4444),
                FlowAction::Output(LAN),
            ]
        );
        for rule in [&t.outbound, &t.inbound] {
            assert_eq!(rule.idle_timeout, Duration::from_secs(20));
            assert_eq!(rule.priority, 50000);
        }
        assert_ne!(t.outbound.id, t.inbound.id);
        assert_eq!(t.outbound.output(), Some(UPLINK_A));

        // the packet now looks like what the outbound rule emits
        let ip = packet.ipv4().unwrap();
        assert_eq!(ip.source(), uplink_ip);
        assert_eq!(ip.destination(), addr_v4("93.184.216.34"));
        assert_eq!(packet.eth().source(), uplink_mac);
        let Some(Transport::Tcp(tcp)) = packet.transport() else {
            unreachable!()
        };
        assert_eq!((tcp.source(), tcp.destination()), (1, 80));
    }

    #[test]
    #[traced_test]
    fn affinity_overrides_the_candidate() {
        let engine = NatEngine::default();
        let mut arena = TestArena::new(&engine);

        let mut first = syn("10.0.0.5", 4444, "93.184.216.34", 80);
        let t1 = engine.translate(&mut arena, &mut first, LAN, UPLINK_B).unwrap();
        assert!(!t1.affinity);

        // same host source, another peer and another protocol
        let frame = udp_frame(HOST_MAC, LAN_MAC, "10.0.0.5", "1.1.1.1", 4444, 53, b"q");
        let mut second = Packet::parse(&frame).unwrap();
        let t2 = engine.translate(&mut arena, &mut second, LAN, UPLINK_A).unwrap();
        assert!(t2.affinity);
        assert_eq!(t2.egress, UPLINK_B);
        assert_eq!(t2.session.translated_id, t1.session.translated_id);
        assert_eq!(arena.table(UPLINK_A).len(), 0);
        assert_eq!(arena.table(UPLINK_B).len(), 2);
        assert!(logs_contain("overriding candidate 1"));

        // the port stays bound until both sessions are gone
        let port = t1.session.translated_id;
        arena.uplinks.get_mut(&UPLINK_B).unwrap().2.remove_session(t1.outbound.id);
        assert!(arena.table(UPLINK_B).port_in_use(port));
        arena.uplinks.get_mut(&UPLINK_B).unwrap().2.remove_session(t2.outbound.id);
        assert!(!arena.table(UPLINK_B).port_in_use(port));
    }

    #[test]
    fn udp_rewrite_keeps_checksums_valid() {
        let engine = NatEngine::default();
        let mut arena = TestArena::new(&engine);
        let frame = udp_frame(HOST_MAC, LAN_MAC, "10.0.0.5", "8.8.8.8", 5353, 53, b"query");
        let mut packet = Packet::parse(&frame).unwrap();
        engine.translate(&mut arena, &mut packet, LAN, UPLINK_A).unwrap();

        let bytes = packet.serialize().unwrap();
        let emitted = Packet::parse(&bytes).unwrap();
        let ip = emitted.ipv4().unwrap();
        assert!(ip.validate_checksum(&()).is_ok());
        assert_eq!(ip.ttl(), 64);
        let Some(Transport::Udp(udp)) = emitted.transport() else {
            unreachable!()
        };
        assert_eq!(udp.source(), 1);
        assert!(
            udp.validate_checksum(&L4ChecksumPayload::new(ip, emitted.payload()))
                .is_ok()
        );
    }

    #[test]
    fn unknown_uplink_and_unsupported_protocol() {
        let engine = NatEngine::default();
        let mut arena = TestArena::new(&engine);
        let mut packet = syn("10.0.0.5", 4444, "93.184.216.34", 80);
        assert_eq!(
            engine.translate(&mut arena, &mut packet, LAN, PortId::new(9)),
            Err(NatError::UnknownUplink(PortId::new(9)))
        );

        let frame = echo_request_frame(HOST_MAC, LAN_MAC, "10.0.0.5", "8.8.8.8", 7, 1);
        let mut ping = Packet::parse(&frame).unwrap();
        assert_eq!(
            engine.translate(&mut arena, &mut ping, LAN, UPLINK_A),
            Err(NatError::UnsupportedProtocol(1))
        );
    }

    #[test]
    fn port_exhaustion() {
        let params = crate::NatParamsBuilder::default()
            .port_range(1000..=1000)
            .build()
            .unwrap();
        let engine = NatEngine::new(params);
        let mut arena = TestArena::new(&engine);
        let mut first = syn("10.0.0.5", 4444, "93.184.216.34", 80);
        assert_eq!(
            engine
                .translate(&mut arena, &mut first, LAN, UPLINK_A)
                .unwrap()
                .session
                .translated_id,
            1000
        );
        let mut second = syn("10.0.0.6", 4444, "93.184.216.34", 80);
        assert_eq!(
            engine.translate(&mut arena, &mut second, LAN, UPLINK_A),
            Err(NatError::PortExhaustion {
                uplink: UPLINK_A,
                protocol: Protocol::Tcp
            })
        );
        // nothing was recorded for the failed flow
        assert_eq!(arena.table(UPLINK_A).len(), 1);
    }

    #[test]
    fn echo_round_trip() {
        let engine = NatEngine::default();
        let mut arena = TestArena::new(&engine);
        let uplink_ip = addr_v4("198.51.100.9");

        let frame = echo_request_frame(HOST_MAC, LAN_MAC, "10.0.0.5", "8.8.8.8", 777, 1);
        let mut request = Packet::parse(&frame).unwrap();
        let out = engine.handle_egress(&mut arena, &mut request, UPLINK_B).unwrap();
        let translated = out.session.translated_id;
        assert_eq!(translated, 1);
        assert_eq!(request.ipv4().unwrap().source(), uplink_ip);
        assert_eq!(request.icmp4().unwrap().echo(), Some((EchoKind::Request, 1)));
        assert_eq!(request.eth().source(), Mac([0x02, 0, 0, 0, 0xaa, 0xb1]));

        let uplink_mac = [0x02, 0, 0, 0, 0xaa, 0xb1];
        let peer_mac = [0x02, 0, 0, 0, 0, 0x99];
        let frame =
            echo_reply_frame(peer_mac, uplink_mac, "8.8.8.8", "198.51.100.9", translated, 1);
        let mut reply = Packet::parse(&frame).unwrap();
        let back = engine.handle_ingress(&arena, &mut reply, UPLINK_B).unwrap();
        assert_eq!(back.session.host_ip, addr_v4("10.0.0.5"));
        assert_eq!(reply.ipv4().unwrap().destination(), addr_v4("10.0.0.5"));
        assert_eq!(reply.icmp4().unwrap().echo(), Some((EchoKind::Reply, 777)));

        // the reply must come back on the uplink the request left from
        let mut reply = Packet::parse(&frame).unwrap();
        assert_eq!(
            engine.handle_ingress(&arena, &mut reply, UPLINK_A),
            Err(NatError::NoSession {
                peer: addr_v4("8.8.8.8"),
                id: translated,
                protocol: Protocol::Icmp
            })
        );
    }

    #[test]
    fn every_echo_request_gets_an_identifier() {
        let engine = NatEngine::default();
        let mut arena = TestArena::new(&engine);
        let ids: Vec<u16> = (1..=3)
            .map(|seq| {
                let frame =
                    echo_request_frame(HOST_MAC, LAN_MAC, "10.0.0.5", "8.8.8.8", 777, seq);
                let mut request = Packet::parse(&frame).unwrap();
                let out = engine.handle_egress(&mut arena, &mut request, UPLINK_B).unwrap();
                assert_eq!(request.icmp4().unwrap().echo_seq(), Some(seq));
                out.session.translated_id
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(arena.table(UPLINK_B).echo_sessions().count(), 3);

        // a reply to any of them finds its way back
        let uplink_mac = [0x02, 0, 0, 0, 0xaa, 0xb1];
        let peer_mac = [0x02, 0, 0, 0, 0, 0x99];
        let frame = echo_reply_frame(peer_mac, uplink_mac, "8.8.8.8", "198.51.100.9", 2, 2);
        let mut reply = Packet::parse(&frame).unwrap();
        let back = engine.handle_ingress(&arena, &mut reply, UPLINK_B).unwrap();
        assert_eq!(back.session.translated_id, 2);
        assert_eq!(reply.icmp4().unwrap().echo(), Some((EchoKind::Reply, 777)));
    }

    #[test]
    fn non_echo_icmp_is_rejected() {
        let engine = NatEngine::default();
        let mut arena = TestArena::new(&engine);
        let frame = icmp_frame(HOST_MAC, LAN_MAC, "10.0.0.5", "8.8.8.8", 3, 1);
        let mut packet = Packet::parse(&frame).unwrap();
        assert_eq!(
            engine.handle_egress(&mut arena, &mut packet, UPLINK_A),
            Err(NatError::NotEcho {
                icmp_type: 3,
                icmp_code: 1
            })
        );
        // a reply is not a request
        let frame = echo_reply_frame(HOST_MAC, LAN_MAC, "10.0.0.5", "8.8.8.8", 1, 1);
        let mut packet = Packet::parse(&frame).unwrap();
        assert!(matches!(
            engine.handle_egress(&mut arena, &mut packet, UPLINK_A),
            Err(NatError::NotEcho { icmp_type: 0, .. })
        ));
        assert!(arena.table(UPLINK_A).is_empty());
    }
}
