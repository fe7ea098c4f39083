// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Classification of frames punted by the gateways, and what to do with them.
//!
//! The dispatcher handles one frame at a time per gateway: the gateway stays locked from the
//! choice of the egress until the session is recorded.

use crate::arp_proxy::ArpProxy;
use crate::hosts::HostLocator;
use crate::sink::FlowRuleSink;
use crate::statistics::{count_drop, count_no_egress, count_session};
use gateway::{Gateway, GatewayId, GatewayRegistry, LoadBalancer};
use ipnet::Ipv4Net;
use nat::{FlowRule, NatError, Protocol};
use net::eth::mac::Mac;
use net::headers::Transport;
use net::icmp4::EchoKind;
use net::interface::PortId;
use net::packet::{DoneReason, Packet, PacketDropStats};
use parking_lot::Mutex;
use rand::Rng;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Where a frame came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingress {
    pub gateway: GatewayId,
    pub port: PortId,
}

impl Display for Ingress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.gateway, self.port)
    }
}

/// Where a frame goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Port(PortId),
    /// every port but the ingress one
    Flood,
}

impl Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Port(port) => write!(f, "port {port}"),
            Output::Flood => write!(f, "flood"),
        }
    }
}

/// A frame to emit on the ingress gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub output: Output,
    pub frame: Vec<u8>,
}

/// The outcome of processing a frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    pub frame: Option<OutboundFrame>,
    /// rules handed to the rule layer
    pub rules: Vec<FlowRule>,
    pub done: Option<DoneReason>,
}

impl Dispatch {
    fn dropped(reason: DoneReason) -> Self {
        Self {
            frame: None,
            rules: Vec::new(),
            done: Some(reason),
        }
    }

    fn delivered(frame: OutboundFrame, rules: Vec<FlowRule>) -> Self {
        Self {
            frame: Some(frame),
            rules,
            done: Some(DoneReason::Delivered),
        }
    }
}

impl Display for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.frame {
            Some(out) => write!(f, "{} bytes to {}", out.frame.len(), out.output)?,
            None => write!(f, "dropped")?,
        }
        if !self.rules.is_empty() {
            write!(f, ", {} rules", self.rules.len())?;
        }
        if let Some(done) = self.done {
            write!(f, " ({done})")?;
        }
        Ok(())
    }
}

/// Entry point of frames punted by the gateways
pub struct PacketDispatcher<L: HostLocator, S: FlowRuleSink> {
    registry: Arc<GatewayRegistry>,
    local_prefix: Ipv4Net,
    balancer: LoadBalancer,
    arp_proxy: ArpProxy,
    hosts: L,
    sink: S,
    stats: Mutex<PacketDropStats>,
}

impl<L: HostLocator, S: FlowRuleSink> PacketDispatcher<L, S> {
    #[must_use]
    pub fn new(registry: Arc<GatewayRegistry>, local_prefix: Ipv4Net, hosts: L, sink: S) -> Self {
        Self {
            registry,
            local_prefix,
            balancer: LoadBalancer,
            arp_proxy: ArpProxy,
            hosts,
            sink,
            stats: Mutex::new(PacketDropStats::new("dispatcher")),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<GatewayRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The count of processed frames per outcome
    #[must_use]
    pub fn stat(&self, reason: DoneReason) -> u64 {
        self.stats.lock().get_stat(reason).unwrap_or(0)
    }

    /// A dump of the outcome counters
    #[must_use]
    pub fn stats_dump(&self) -> String {
        self.stats.lock().to_string()
    }

    /// Process a frame received on `ingress`
    #[must_use]
    pub fn process(&self, ingress: &Ingress, frame: &[u8]) -> Dispatch {
        self.process_with_rng(ingress, frame, &mut rand::rng())
    }

    /// Process a frame received on `ingress`, drawing egress uplinks from `rng`
    pub fn process_with_rng<R: Rng>(
        &self,
        ingress: &Ingress,
        frame: &[u8],
        rng: &mut R,
    ) -> Dispatch {
        let dispatch = match Packet::parse(frame) {
            Ok(packet) => self.handle(ingress, packet, rng),
            Err(e) => {
                debug!("{ingress}: dropping malformed frame: {}", e.error());
                Dispatch::dropped(DoneReason::Malformed)
            }
        };
        if let Some(done) = dispatch.done {
            self.stats.lock().incr(done, 1);
            if done != DoneReason::Delivered {
                count_drop(done);
            }
        }
        trace!("{ingress}: {dispatch}");
        dispatch
    }

    fn handle<R: Rng>(&self, ingress: &Ingress, mut packet: Packet, rng: &mut R) -> Dispatch {
        if let Some(arp) = packet.arp() {
            return match self.arp_proxy.handle(&self.registry, arp) {
                Ok(frame) => Dispatch::delivered(frame, Vec::new()),
                Err(reason) => Dispatch::dropped(reason),
            };
        }
        let Some(ip) = packet.ipv4() else {
            trace!("{ingress}: ethertype {} is not handled", packet.eth().ether_type());
            return Dispatch::dropped(DoneReason::Unhandled);
        };
        let (src, dst, protocol) = (ip.source(), ip.destination(), ip.protocol().0);
        let fragment = ip.is_trailing_fragment();
        let Some(handle) = self.registry.gateway(&ingress.gateway) else {
            trace!("{ingress}: not a gateway, ignoring IPv4 {src} -> {dst}");
            return Dispatch::dropped(DoneReason::GatewayUnknown);
        };
        let mut gateway = handle.lock();

        match packet.transport() {
            Some(Transport::Icmp4(_)) => self.handle_icmp(ingress, &mut gateway, packet, rng),
            Some(Transport::Tcp(_) | Transport::Udp(_)) => {
                if !self.local_prefix.contains(&src) {
                    debug!("{ingress}: dropping {src} -> {dst}: source is not local");
                    return Dispatch::dropped(DoneReason::NotLocalSource);
                }
                if self.local_prefix.contains(&dst) {
                    info!("{ingress}: unhandled intra-LAN traffic {src} -> {dst}");
                    return Dispatch::dropped(DoneReason::LocalTraffic);
                }
                self.handle_flow(ingress, &mut gateway, &mut packet, rng)
            }
            None if !fragment && Protocol::from_number(protocol).is_some() => {
                debug!("{ingress}: dropping {src} -> {dst}: bad protocol {protocol} header");
                Dispatch::dropped(DoneReason::Malformed)
            }
            None => {
                debug!("{ingress}: dropping {src} -> {dst}: protocol {protocol} not handled");
                Dispatch::dropped(DoneReason::UnsupportedProtocol)
            }
        }
    }

    fn select_egress<R: Rng>(&self, gateway: &Gateway, rng: &mut R) -> Result<PortId, DoneReason> {
        self.balancer.select_egress(gateway, rng).map_err(|e| {
            warn!("{e}");
            count_no_egress(gateway.id());
            DoneReason::NoEgress
        })
    }

    /// First packet of a TCP or UDP flow from the LAN
    fn handle_flow<R: Rng>(
        &self,
        ingress: &Ingress,
        gateway: &mut Gateway,
        packet: &mut Packet,
        rng: &mut R,
    ) -> Dispatch {
        let candidate = match self.select_egress(gateway, rng) {
            Ok(port) => port,
            Err(reason) => return Dispatch::dropped(reason),
        };
        let nat = self.registry.nat();
        let translation = match nat.translate(gateway, packet, ingress.port, candidate) {
            Ok(translation) => translation,
            Err(e) => return Dispatch::dropped(nat_failure(ingress, &e)),
        };
        count_session(gateway.id(), translation.session.protocol);
        debug!(
            "{ingress}: new session {} on uplink {}",
            translation.session, translation.egress
        );
        let rules = vec![translation.outbound, translation.inbound];
        for rule in &rules {
            self.sink.install(gateway.id(), rule.clone());
        }
        match packet.serialize() {
            Ok(frame) => Dispatch::delivered(
                OutboundFrame {
                    output: Output::Port(translation.egress),
                    frame,
                },
                rules,
            ),
            Err(e) => {
                error!("{ingress}: failed to serialize translated packet: {e}");
                Dispatch {
                    frame: None,
                    rules,
                    done: Some(DoneReason::Malformed),
                }
            }
        }
    }

    fn handle_icmp<R: Rng>(
        &self,
        ingress: &Ingress,
        gateway: &mut Gateway,
        mut packet: Packet,
        rng: &mut R,
    ) -> Dispatch {
        let Some(icmp) = packet.icmp4() else {
            return Dispatch::dropped(DoneReason::Malformed);
        };
        let nat = self.registry.nat();
        match icmp.echo() {
            Some((EchoKind::Request, _)) => {
                let egress = match self.select_egress(gateway, rng) {
                    Ok(port) => port,
                    Err(reason) => return Dispatch::dropped(reason),
                };
                match nat.handle_egress(gateway, &mut packet, egress) {
                    Ok(echo) => {
                        count_session(gateway.id(), Protocol::Icmp);
                        trace!("{ingress}: echo request as {}", echo.session);
                        emit(ingress, &mut packet, Output::Port(egress))
                    }
                    Err(e) => Dispatch::dropped(nat_failure(ingress, &e)),
                }
            }
            Some((EchoKind::Reply, _)) => {
                let echo = match nat.handle_ingress(&*gateway, &mut packet, ingress.port) {
                    Ok(echo) => echo,
                    Err(e) => return Dispatch::dropped(nat_failure(ingress, &e)),
                };
                let (mac, output) = match self.hosts.locate(echo.session.host_ip) {
                    Some(host) => (host.mac, Output::Port(host.port)),
                    None => {
                        debug!("{ingress}: host {} not located", echo.session.host_ip);
                        (Mac::ZERO, Output::Flood)
                    }
                };
                packet.eth_mut().set_destination(mac);
                emit(ingress, &mut packet, output)
            }
            None => {
                info!(
                    "{ingress}: unhandled ICMP type {} code {}",
                    icmp.icmp_type(),
                    icmp.icmp_code()
                );
                Dispatch::dropped(DoneReason::UnsupportedIcmp)
            }
        }
    }
}

fn emit(ingress: &Ingress, packet: &mut Packet, output: Output) -> Dispatch {
    match packet.serialize() {
        Ok(frame) => Dispatch::delivered(OutboundFrame { output, frame }, Vec::new()),
        Err(e) => {
            error!("{ingress}: failed to serialize packet: {e}");
            Dispatch::dropped(DoneReason::Malformed)
        }
    }
}

fn nat_failure(ingress: &Ingress, error: &NatError) -> DoneReason {
    match error {
        NatError::PortExhaustion { .. } => {
            warn!("{ingress}: {error}");
            DoneReason::NatOutOfResources
        }
        NatError::NoSession { .. } => {
            debug!("{ingress}: {error}");
            DoneReason::NatSessionMissing
        }
        NatError::UnknownUplink(_) => {
            debug!("{ingress}: {error}");
            DoneReason::InterfaceUnknown
        }
        NatError::NotEcho { .. } => DoneReason::UnsupportedIcmp,
        NatError::UnsupportedProtocol(_) => DoneReason::UnsupportedProtocol,
        NatError::MissingHeader(_) => DoneReason::Malformed,
    }
}
