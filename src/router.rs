use crate::event::PacketIn;
use crate::types::{MacAddr, PortNo};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use tracing::debug;

/// A packet parked while its destination MAC is being resolved.
#[derive(Debug, Clone)]
pub struct PendingPacket {
    pub packet: PacketIn,
    pub awaiting: Ipv4Addr,
}

/// Resolution state of one router-role device: its ARP cache, the packets
/// parked on unresolved destinations, and the host ports learned from
/// observed ARP traffic. Created on first reference to the device.
#[derive(Debug, Default)]
pub struct RouterState {
    arp_cache: HashMap<Ipv4Addr, MacAddr>,
    pending: Vec<PendingPacket>,
    host_ports: HashMap<Ipv4Addr, PortNo>,
}

impl RouterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddr> {
        self.arp_cache.get(&ip).copied()
    }

    /// Last write wins; updated from both ARP requests and replies.
    pub fn learn_mapping(&mut self, ip: Ipv4Addr, mac: MacAddr) {
        if self.arp_cache.insert(ip, mac) != Some(mac) {
            debug!(%ip, %mac, "ARP cache updated");
        }
    }

    pub fn learn_host_port(&mut self, ip: Ipv4Addr, port: PortNo) {
        self.host_ports.insert(ip, port);
    }

    pub fn host_port(&self, ip: Ipv4Addr) -> Option<PortNo> {
        self.host_ports.get(&ip).copied()
    }

    pub fn park(&mut self, packet: PacketIn, awaiting: Ipv4Addr) {
        debug!(%awaiting, parked = self.pending.len() + 1, "parking packet until ARP resolves");
        self.pending.push(PendingPacket { packet, awaiting });
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Removes and returns every parked packet whose awaited address is now
    /// in the cache. The buffer is rebuilt from the unresolved remainder
    /// instead of being mutated mid-scan, so entries parked while the caller
    /// replays are never skipped.
    pub fn take_resolved(&mut self) -> Vec<PendingPacket> {
        let parked = std::mem::take(&mut self.pending);
        let (resolved, waiting): (Vec<_>, Vec<_>) = parked
            .into_iter()
            .partition(|p| self.arp_cache.contains_key(&p.awaiting));
        self.pending = waiting;
        resolved
    }
}
