use super::Topology;
use crate::event::LinkDiscovered;
use crate::types::{Dpid, PortNo};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Accumulates discovered switches and inter-switch links. Readiness fires
/// exactly once, when the distinct switch count reaches the expected size of
/// the network; nothing is applied after that point.
#[derive(Debug, Default)]
pub struct DiscoveryTracker {
    expected_switches: usize,
    seen: HashSet<Dpid>,
    port_map: HashMap<Dpid, HashMap<Dpid, PortNo>>,
    ready: bool,
}

impl DiscoveryTracker {
    pub fn new(expected_switches: usize) -> Self {
        DiscoveryTracker { expected_switches, ..Default::default() }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Records a switch; returns true for the one event that completes
    /// discovery.
    pub fn switch_entered(&mut self, dpid: Dpid) -> bool {
        if self.ready {
            return false;
        }
        self.seen.insert(dpid);
        debug!(dpid, seen = self.seen.len(), expected = self.expected_switches, "switch entered");
        if self.expected_switches > 0 && self.seen.len() == self.expected_switches {
            self.ready = true;
            info!(switches = self.seen.len(), "topology discovery complete");
            return true;
        }
        false
    }

    /// Records the port mapping on both endpoints and mirrors the link into
    /// the graph when both nodes are known there.
    pub fn link_discovered(&mut self, link: &LinkDiscovered, topo: &mut Topology) {
        if self.ready {
            return;
        }
        self.port_map
            .entry(link.src_dpid)
            .or_default()
            .insert(link.dst_dpid, link.src_port);
        self.port_map
            .entry(link.dst_dpid)
            .or_default()
            .insert(link.src_dpid, link.dst_port);
        topo.add_edge(link.src_dpid, link.dst_dpid, 1);
        debug!(
            src = link.src_dpid,
            src_port = link.src_port,
            dst = link.dst_dpid,
            dst_port = link.dst_port,
            "link discovered"
        );
    }

    /// Local port leading to a neighboring switch.
    pub fn port_to(&self, from: Dpid, to: Dpid) -> Option<PortNo> {
        self.port_map.get(&from)?.get(&to).copied()
    }

    /// Ports of a switch known to face other switches.
    pub fn fabric_ports(&self, dpid: Dpid) -> Vec<PortNo> {
        self.port_map
            .get(&dpid)
            .map(|peers| peers.values().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Node, NodeKind};
    use std::net::Ipv4Addr;

    fn link(src: Dpid, src_port: PortNo, dst: Dpid, dst_port: PortNo) -> LinkDiscovered {
        LinkDiscovered { src_dpid: src, src_port, dst_dpid: dst, dst_port }
    }

    #[test]
    fn port_map_is_recorded_on_both_sides() {
        let mut tracker = DiscoveryTracker::new(2);
        let mut topo = Topology::new();
        topo.add_node(Node { id: 1, kind: NodeKind::Edge, ip: Ipv4Addr::new(10, 0, 0, 1) });
        topo.add_node(Node { id: 2, kind: NodeKind::Aggregation, ip: Ipv4Addr::new(10, 0, 2, 1) });
        tracker.link_discovered(&link(1, 3, 2, 1), &mut topo);
        assert_eq!(tracker.port_to(1, 2), Some(3));
        assert_eq!(tracker.port_to(2, 1), Some(1));
        assert_eq!(topo.edge_count(), 1);
        assert_eq!(tracker.fabric_ports(1), vec![3]);
    }

    #[test]
    fn readiness_fires_exactly_once() {
        let mut tracker = DiscoveryTracker::new(2);
        assert!(!tracker.switch_entered(1));
        assert!(!tracker.switch_entered(1)); // duplicates do not count
        assert!(tracker.switch_entered(2));
        assert!(tracker.is_ready());
        assert!(!tracker.switch_entered(3));
    }

    #[test]
    fn links_after_readiness_are_ignored() {
        let mut tracker = DiscoveryTracker::new(1);
        let mut topo = Topology::new();
        topo.add_node(Node { id: 1, kind: NodeKind::Edge, ip: Ipv4Addr::new(10, 0, 0, 1) });
        topo.add_node(Node { id: 2, kind: NodeKind::Edge, ip: Ipv4Addr::new(10, 0, 1, 1) });
        tracker.switch_entered(1);
        tracker.link_discovered(&link(1, 1, 2, 1), &mut topo);
        assert_eq!(tracker.port_to(1, 2), None);
        assert_eq!(topo.edge_count(), 0);
    }
}
