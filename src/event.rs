use crate::types::{Dpid, EthernetFrame, PortNo};

/// Inbound events consumed from the southbound/topology collaborator. Every
/// event kind the engine handles is enumerated here; dispatch is a single
/// `match` in the controller.
#[derive(Debug, Clone)]
pub enum Event {
    PacketIn(PacketIn),
    /// The device completed its handshake and accepts flow rules.
    SwitchFeaturesReady { dpid: Dpid },
    /// A switch joined topology discovery.
    SwitchEntered { dpid: Dpid },
    LinkDiscovered(LinkDiscovered),
}

/// A frame punted to the controller for a decision.
#[derive(Debug, Clone)]
pub struct PacketIn {
    pub dpid: Dpid,
    pub in_port: PortNo,
    pub frame: EthernetFrame,
    /// Original frame bytes, preserved unchanged so a parked packet can be
    /// relayed or replayed exactly as received.
    pub raw: Vec<u8>,
}

/// One direction of a discovered inter-switch link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkDiscovered {
    pub src_dpid: Dpid,
    pub src_port: PortNo,
    pub dst_dpid: Dpid,
    pub dst_port: PortNo,
}
