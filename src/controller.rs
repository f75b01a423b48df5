use crate::command::{
    Action, Command, FlowInstall, FlowMatch, OutPort, PacketOrigin, PacketOut, Payload,
    PRIORITY_FLOW,
};
use crate::config::{ControllerConfig, GatewayConfig};
use crate::error::{ConfigError, DropReason};
use crate::event::{Event, PacketIn};
use crate::router::RouterState;
use crate::routing::NextHopTable;
use crate::switch::{L2Decision, MacTable};
use crate::topology::discovery::DiscoveryTracker;
use crate::topology::{Topology, dpid_of, fattree};
use crate::types::{
    ArpOp, ArpPacket, Dpid, ETH_TYPE_IP, EthernetFrame, FramePayload, IPPROTO_ICMP, IpPayload,
    Ipv4Packet, MacAddr, PortNo,
};
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use tracing::{debug, info, warn};

/// What kind of device an event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Plain learning switch; ARP and IP payloads are opaque L2 frames.
    Switch,
    /// Statically configured router with an external-interface policy.
    Gateway,
    /// Fat-tree switch routing across the fabric for its own /24.
    Fabric,
}

/// The decision engine: classifies each inbound event by device role,
/// consults the learning, resolution and routing stores, and emits the
/// southbound instructions that realize the decision. One event is always
/// processed to completion before the next.
pub struct Controller {
    config: ControllerConfig,
    topology: Topology,
    discovery: DiscoveryTracker,
    mac_table: MacTable,
    routers: HashMap<Dpid, RouterState>,
    next_hops: NextHopTable,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let topology = match config.fattree_k {
            Some(k) => fattree::build(k)?,
            None => Topology::new(),
        };
        let discovery = DiscoveryTracker::new(topology.switch_count());
        Ok(Controller {
            config,
            topology,
            discovery,
            mac_table: MacTable::new(),
            routers: HashMap::new(),
            next_hops: NextHopTable::default(),
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn next_hops(&self) -> &NextHopTable {
        &self.next_hops
    }

    pub fn discovery(&self) -> &DiscoveryTracker {
        &self.discovery
    }

    pub fn router(&self, dpid: Dpid) -> Option<&RouterState> {
        self.routers.get(&dpid)
    }

    /// Processes one inbound event to completion and returns the
    /// instructions it produced, in emission order.
    pub fn handle_event(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::SwitchFeaturesReady { dpid } => {
                info!(dpid, "installing table-miss rule");
                vec![Command::FlowInstall(FlowInstall::table_miss(dpid))]
            }
            Event::SwitchEntered { dpid } => {
                if self.discovery.switch_entered(dpid) {
                    self.next_hops = NextHopTable::compute(&self.topology);
                }
                Vec::new()
            }
            Event::LinkDiscovered(link) => {
                self.discovery.link_discovered(&link, &mut self.topology);
                Vec::new()
            }
            Event::PacketIn(packet) => self.on_packet_in(packet),
        }
    }

    /// Packets parked on ARP resolution resume through an explicit queue, so
    /// replay depth is bounded and ordering stays observable.
    fn on_packet_in(&mut self, packet: PacketIn) -> Vec<Command> {
        let mut commands = Vec::new();
        let mut replay = VecDeque::new();
        replay.push_back(packet);
        while let Some(next) = replay.pop_front() {
            self.process_packet(next, &mut commands, &mut replay);
        }
        commands
    }

    fn process_packet(
        &mut self,
        packet: PacketIn,
        out: &mut Vec<Command>,
        replay: &mut VecDeque<PacketIn>,
    ) {
        match self.role_of(packet.dpid) {
            Role::Switch => self.l2_forward(packet, out),
            Role::Gateway => self.gateway_packet(packet, out, replay),
            Role::Fabric => self.fabric_packet(packet, out, replay),
        }
    }

    fn role_of(&self, dpid: Dpid) -> Role {
        if self.config.gateways.contains_key(&dpid) {
            Role::Gateway
        } else if self.topology.node(dpid).is_some_and(|n| n.kind.is_switch()) {
            Role::Fabric
        } else {
            Role::Switch
        }
    }

    fn router_mut(&mut self, dpid: Dpid) -> &mut RouterState {
        self.routers.entry(dpid).or_default()
    }

    // --- plain L2 switch ---------------------------------------------------

    /// Learn the source, then forward to the learned port or flood. A flow
    /// is installed only once a concrete destination is confirmed reachable,
    /// never speculatively.
    fn l2_forward(&mut self, packet: PacketIn, out: &mut Vec<Command>) {
        let src = packet.frame.src;
        let dst = packet.frame.dst;
        match self.mac_table.observe(packet.dpid, packet.in_port, src, dst) {
            L2Decision::Forward(port) => {
                let actions = vec![Action::Output(OutPort::Port(port))];
                out.push(Command::FlowInstall(FlowInstall {
                    dpid: packet.dpid,
                    priority: PRIORITY_FLOW,
                    matching: FlowMatch {
                        in_port: Some(packet.in_port),
                        eth_dst: Some(dst),
                        ..FlowMatch::default()
                    },
                    actions: actions.clone(),
                }));
                out.push(Command::PacketOut(PacketOut {
                    dpid: packet.dpid,
                    origin: PacketOrigin::InPort(packet.in_port),
                    actions,
                    payload: Payload::Raw(packet.raw),
                }));
            }
            L2Decision::Flood => {
                out.push(Command::PacketOut(PacketOut {
                    dpid: packet.dpid,
                    origin: PacketOrigin::InPort(packet.in_port),
                    actions: vec![Action::Output(OutPort::Flood)],
                    payload: Payload::Raw(packet.raw),
                }));
            }
        }
    }

    // --- statically configured gateway -------------------------------------

    fn gateway_packet(
        &mut self,
        packet: PacketIn,
        out: &mut Vec<Command>,
        replay: &mut VecDeque<PacketIn>,
    ) {
        let Some(gateway) = self.config.gateways.get(&packet.dpid).cloned() else {
            return;
        };
        match packet.frame.payload.clone() {
            FramePayload::Ipv4(ip) => self.gateway_ip(&gateway, packet, ip, out),
            FramePayload::Arp(arp) => self.gateway_arp(&gateway, packet, arp, out, replay),
            FramePayload::Other { ether_type } => {
                debug!(dpid = packet.dpid, ether_type, "unsupported ethertype at gateway");
            }
        }
    }

    fn gateway_ip(
        &mut self,
        gateway: &GatewayConfig,
        packet: PacketIn,
        ip: Ipv4Packet,
        out: &mut Vec<Command>,
    ) {
        let dpid = packet.dpid;
        let in_port = packet.in_port;

        // addressed to the gateway address of the ingress interface itself
        if gateway.interface_ip(in_port) == Some(ip.dst) {
            if ip.proto == IPPROTO_ICMP {
                if let IpPayload::IcmpEchoRequest(echo) = ip.payload {
                    info!(dpid, src = %ip.src, "answering ICMP echo request");
                    out.push(Command::PacketOut(PacketOut {
                        dpid,
                        origin: PacketOrigin::Controller,
                        actions: vec![Action::Output(OutPort::Port(in_port))],
                        payload: Payload::Frame(EthernetFrame::icmp_echo_reply(
                            packet.frame.dst,
                            packet.frame.src,
                            ip.dst,
                            ip.src,
                            echo,
                        )),
                    }));
                    return;
                }
            }
            drop_packet(dpid, ip.src, ip.dst, DropReason::UnsupportedProtocol);
            return;
        }

        // egress is the interface whose subnet holds the destination; the
        // external interface never carries transit traffic
        let out_port = match gateway.port_for_subnet(ip.dst) {
            Some(port) if Some(port) != gateway.external_port => port,
            _ => {
                drop_packet(dpid, ip.src, ip.dst, DropReason::UnreachableOrExternal);
                return;
            }
        };
        if gateway.is_external_subnet(ip.src) {
            drop_packet(dpid, ip.src, ip.dst, DropReason::PolicyViolation);
            return;
        }
        if out_port == in_port {
            drop_packet(dpid, ip.src, ip.dst, DropReason::SameSubnetMisdirected);
            return;
        }

        let Some(out_iface) = gateway.interface(out_port) else {
            return;
        };
        let own_mac = out_iface.mac;
        let own_ip = out_iface.ip();
        match self.router_mut(dpid).resolve(ip.dst) {
            Some(dst_mac) => {
                info!(dpid, dst = %ip.dst, out_port, "routing resolved packet");
                emit_routed(out, dpid, in_port, out_port, own_mac, dst_mac, ip.dst, packet.raw);
            }
            None => {
                info!(dpid, dst = %ip.dst, out_port, "destination unresolved, asking who-has");
                self.router_mut(dpid).park(packet, ip.dst);
                out.push(Command::PacketOut(PacketOut {
                    dpid,
                    origin: PacketOrigin::Controller,
                    actions: vec![Action::Output(OutPort::Port(out_port))],
                    payload: Payload::Frame(EthernetFrame::arp_request(own_mac, own_ip, ip.dst)),
                }));
            }
        }
    }

    fn gateway_arp(
        &mut self,
        gateway: &GatewayConfig,
        packet: PacketIn,
        arp: ArpPacket,
        out: &mut Vec<Command>,
        replay: &mut VecDeque<PacketIn>,
    ) {
        let dpid = packet.dpid;
        // the sender is learned unconditionally, request or reply
        self.router_mut(dpid).learn_mapping(arp.sender_ip, arp.sender_mac);
        match arp.op {
            ArpOp::Request => {
                if let Some(iface) = gateway.interface_for_ip(arp.target_ip) {
                    info!(dpid, target = %arp.target_ip, mac = %iface.mac, "answering ARP request");
                    out.push(Command::PacketOut(PacketOut {
                        dpid,
                        origin: PacketOrigin::Controller,
                        actions: vec![Action::Output(OutPort::Port(packet.in_port))],
                        payload: Payload::Frame(EthernetFrame::arp_reply(
                            iface.mac,
                            arp.target_ip,
                            arp.sender_mac,
                            arp.sender_ip,
                        )),
                    }));
                }
            }
            ArpOp::Reply => self.replay_resolved(dpid, replay),
        }
    }

    // --- fabric switch ------------------------------------------------------

    fn fabric_packet(
        &mut self,
        packet: PacketIn,
        out: &mut Vec<Command>,
        replay: &mut VecDeque<PacketIn>,
    ) {
        let own_ip = match self.topology.node(packet.dpid) {
            Some(node) => node.ip,
            None => return,
        };
        let own_mac = MacAddr::from_dpid(packet.dpid);
        match packet.frame.payload.clone() {
            FramePayload::Arp(arp) => self.fabric_arp(own_ip, own_mac, packet, arp, out, replay),
            FramePayload::Ipv4(ip) => self.fabric_ip(own_ip, own_mac, packet, ip, out),
            FramePayload::Other { ether_type } => {
                debug!(dpid = packet.dpid, ether_type, "unsupported ethertype at fabric switch");
            }
        }
    }

    fn fabric_arp(
        &mut self,
        own_ip: Ipv4Addr,
        own_mac: MacAddr,
        packet: PacketIn,
        arp: ArpPacket,
        out: &mut Vec<Command>,
        replay: &mut VecDeque<PacketIn>,
    ) {
        let dpid = packet.dpid;
        let in_port = packet.in_port;
        // every observed ARP frame teaches us where its sender lives
        {
            let state = self.router_mut(dpid);
            state.learn_host_port(arp.sender_ip, in_port);
            state.learn_mapping(arp.sender_ip, arp.sender_mac);
        }
        match arp.op {
            ArpOp::Request => {
                if arp.target_ip == own_ip {
                    info!(dpid, target = %arp.target_ip, "answering ARP request for own address");
                    out.push(Command::PacketOut(PacketOut {
                        dpid,
                        origin: PacketOrigin::Controller,
                        actions: vec![Action::Output(OutPort::Port(in_port))],
                        payload: Payload::Frame(EthernetFrame::arp_reply(
                            own_mac,
                            own_ip,
                            arp.sender_mac,
                            arp.sender_ip,
                        )),
                    }));
                } else {
                    // relay toward hosts only; fabric ports would loop it
                    let ports = self.host_facing_ports(dpid, Some(in_port));
                    if ports.is_empty() {
                        debug!(dpid, target = %arp.target_ip, "no host port to relay ARP request");
                        return;
                    }
                    out.push(Command::PacketOut(PacketOut {
                        dpid,
                        origin: PacketOrigin::InPort(in_port),
                        actions: ports
                            .into_iter()
                            .map(|p| Action::Output(OutPort::Port(p)))
                            .collect(),
                        payload: Payload::Raw(packet.raw),
                    }));
                }
            }
            ArpOp::Reply => {
                if arp.target_ip == own_ip {
                    self.replay_resolved(dpid, replay);
                } else if let Some(port) = self.router(dpid).and_then(|r| r.host_port(arp.target_ip)) {
                    out.push(Command::PacketOut(PacketOut {
                        dpid,
                        origin: PacketOrigin::InPort(in_port),
                        actions: vec![Action::Output(OutPort::Port(port))],
                        payload: Payload::Raw(packet.raw),
                    }));
                } else {
                    debug!(dpid, target = %arp.target_ip, reason = %DropReason::NotForDevice, "dropping ARP reply");
                }
            }
        }
    }

    fn fabric_ip(
        &mut self,
        own_ip: Ipv4Addr,
        own_mac: MacAddr,
        packet: PacketIn,
        ip: Ipv4Packet,
        out: &mut Vec<Command>,
    ) {
        let dpid = packet.dpid;
        let in_port = packet.in_port;

        if ip.dst == own_ip {
            if ip.proto == IPPROTO_ICMP {
                if let IpPayload::IcmpEchoRequest(echo) = ip.payload {
                    info!(dpid, src = %ip.src, "answering ICMP echo request");
                    out.push(Command::PacketOut(PacketOut {
                        dpid,
                        origin: PacketOrigin::Controller,
                        actions: vec![Action::Output(OutPort::Port(in_port))],
                        payload: Payload::Frame(EthernetFrame::icmp_echo_reply(
                            own_mac,
                            packet.frame.src,
                            ip.dst,
                            ip.src,
                            echo,
                        )),
                    }));
                    return;
                }
            }
            drop_packet(dpid, ip.src, ip.dst, DropReason::UnsupportedProtocol);
            return;
        }

        if fattree::same_subnet(ip.dst, own_ip) {
            // destination edge switch reached, deliver to the host directly
            let known = self
                .router(dpid)
                .and_then(|r| r.resolve(ip.dst).zip(r.host_port(ip.dst)));
            match known {
                Some((dst_mac, port)) => {
                    info!(dpid, dst = %ip.dst, port, "delivering to attached host");
                    emit_routed(out, dpid, in_port, port, own_mac, dst_mac, ip.dst, packet.raw);
                }
                None => {
                    info!(dpid, dst = %ip.dst, "host unresolved, flooding who-has on host ports");
                    let ports = self.host_facing_ports(dpid, None);
                    self.router_mut(dpid).park(packet, ip.dst);
                    out.push(Command::PacketOut(PacketOut {
                        dpid,
                        origin: PacketOrigin::Controller,
                        actions: ports
                            .into_iter()
                            .map(|p| Action::Output(OutPort::Port(p)))
                            .collect(),
                        payload: Payload::Frame(EthernetFrame::arp_request(
                            own_mac, own_ip, ip.dst,
                        )),
                    }));
                }
            }
            return;
        }

        // multi-hop: mask the destination down to its edge gateway and walk
        // the precomputed tables
        if !self.discovery.is_ready() {
            drop_packet(dpid, ip.src, ip.dst, DropReason::NoRoute);
            return;
        }
        let dest_edge = dpid_of(fattree::gateway_of(ip.dst));
        let Some(hop) = self.next_hops.first_hop(dpid, dest_edge) else {
            drop_packet(dpid, ip.src, ip.dst, DropReason::NoRoute);
            return;
        };
        let Some(out_port) = self.discovery.port_to(dpid, hop) else {
            drop_packet(dpid, ip.src, ip.dst, DropReason::NoRoute);
            return;
        };
        info!(dpid, dst = %ip.dst, hop, out_port, "routing across the fabric");
        // next-hop switch MACs are DPID-derived, no resolution needed
        emit_routed(
            out,
            dpid,
            in_port,
            out_port,
            own_mac,
            MacAddr::from_dpid(hop),
            ip.dst,
            packet.raw,
        );
    }

    // --- shared -------------------------------------------------------------

    /// Moves every now-resolvable parked packet onto the replay queue. Each
    /// is replayed at most once; a repeated ARP reply finds the buffer empty.
    fn replay_resolved(&mut self, dpid: Dpid, replay: &mut VecDeque<PacketIn>) {
        for pending in self.router_mut(dpid).take_resolved() {
            info!(dpid, awaiting = %pending.awaiting, "resuming parked packet");
            replay.push_back(pending.packet);
        }
    }

    /// Ports of a fabric switch that face hosts: every port the switch has,
    /// minus those the discovery port map attributes to other switches.
    fn host_facing_ports(&self, dpid: Dpid, exclude: Option<PortNo>) -> Vec<PortNo> {
        let k = self.config.fattree_k.unwrap_or(0) as PortNo;
        let fabric = self.discovery.fabric_ports(dpid);
        (1..=k)
            .filter(|port| !fabric.contains(port) && Some(*port) != exclude)
            .collect()
    }
}

fn drop_packet(dpid: Dpid, src: Ipv4Addr, dst: Ipv4Addr, reason: DropReason) {
    warn!(dpid, %src, %dst, %reason, "dropping packet");
}

/// Install the routing flow and forward the triggering packet: rewrite both
/// MACs, then output. The flow matches on ingress port and destination IP.
#[allow(clippy::too_many_arguments)]
fn emit_routed(
    out: &mut Vec<Command>,
    dpid: Dpid,
    in_port: PortNo,
    out_port: PortNo,
    src_mac: MacAddr,
    dst_mac: MacAddr,
    dst_ip: Ipv4Addr,
    raw: Vec<u8>,
) {
    let actions = vec![
        Action::SetEthSrc(src_mac),
        Action::SetEthDst(dst_mac),
        Action::Output(OutPort::Port(out_port)),
    ];
    out.push(Command::FlowInstall(FlowInstall {
        dpid,
        priority: PRIORITY_FLOW,
        matching: FlowMatch {
            in_port: Some(in_port),
            eth_type: Some(ETH_TYPE_IP),
            ipv4_dst: Some(dst_ip),
            ..FlowMatch::default()
        },
        actions: actions.clone(),
    }));
    out.push(Command::PacketOut(PacketOut {
        dpid,
        origin: PacketOrigin::InPort(in_port),
        actions,
        payload: Payload::Raw(raw),
    }));
}
