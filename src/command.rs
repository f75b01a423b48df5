use crate::types::{Dpid, EthernetFrame, MacAddr, PortNo};
use std::net::Ipv4Addr;

/// Priority of the match-all rule punting misses to the controller.
pub const PRIORITY_TABLE_MISS: u16 = 0;
/// Priority of lazily installed forwarding and routing flows.
pub const PRIORITY_FLOW: u16 = 1;

/// Outbound instructions handed to the southbound collaborator. Fire and
/// forget: nothing in the engine waits for an acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FlowInstall(FlowInstall),
    PacketOut(PacketOut),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowMatch {
    pub in_port: Option<PortNo>,
    pub eth_type: Option<u16>,
    pub eth_dst: Option<MacAddr>,
    pub ipv4_dst: Option<Ipv4Addr>,
}

/// Action list entries are ordered: field rewrites must precede the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SetEthSrc(MacAddr),
    SetEthDst(MacAddr),
    Output(OutPort),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutPort {
    Port(PortNo),
    /// All ports except the ingress port.
    Flood,
    Controller,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowInstall {
    pub dpid: Dpid,
    pub priority: u16,
    pub matching: FlowMatch,
    pub actions: Vec<Action>,
}

impl FlowInstall {
    /// Default rule installed on every new device: match everything, punt to
    /// the controller.
    pub fn table_miss(dpid: Dpid) -> Self {
        FlowInstall {
            dpid,
            priority: PRIORITY_TABLE_MISS,
            matching: FlowMatch::default(),
            actions: vec![Action::Output(OutPort::Controller)],
        }
    }
}

/// Where a packet-out pretends to have entered the device. Relays keep their
/// ingress port so flooding excludes it; self-generated frames carry the
/// controller marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOrigin {
    InPort(PortNo),
    Controller,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Received bytes relayed unchanged.
    Raw(Vec<u8>),
    /// Controller-built frame; the packet codec serializes it downstream.
    Frame(EthernetFrame),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PacketOut {
    pub dpid: Dpid,
    pub origin: PacketOrigin,
    pub actions: Vec<Action>,
    pub payload: Payload,
}
