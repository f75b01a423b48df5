pub mod discovery;
pub mod fattree;

use crate::types::Dpid;
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// DPID of a node under the fabric addressing scheme: its IPv4 address as an
/// integer.
pub fn dpid_of(ip: Ipv4Addr) -> Dpid {
    u32::from(ip) as Dpid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Core,
    Aggregation,
    Edge,
    Host,
}

impl NodeKind {
    pub fn is_switch(self) -> bool {
        !matches!(self, NodeKind::Host)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub id: Dpid,
    pub kind: NodeKind,
    pub ip: Ipv4Addr,
}

/// An undirected weighted edge, reported with both endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub a: Dpid,
    pub b: Dpid,
    pub weight: u32,
}

/// In-memory graph of switches and hosts. Built once, either from the
/// fat-tree generator or incrementally during discovery, and treated as
/// read-only once discovery completes.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: HashMap<Dpid, Node>,
    adjacency: HashMap<Dpid, Vec<(Dpid, u32)>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) {
        self.adjacency.entry(node.id).or_default();
        self.nodes.insert(node.id, node);
    }

    pub fn node(&self, id: Dpid) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: Dpid) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Connects two known nodes. Re-adding an existing edge is a no-op, so
    /// links reported from both endpoints collapse into one edge.
    pub fn add_edge(&mut self, a: Dpid, b: Dpid, weight: u32) {
        if !self.nodes.contains_key(&a) || !self.nodes.contains_key(&b) {
            return;
        }
        if self.neighbors(a).iter().any(|&(n, _)| n == b) {
            return;
        }
        self.adjacency.entry(a).or_default().push((b, weight));
        self.adjacency.entry(b).or_default().push((a, weight));
    }

    /// Detaches the edge from both endpoints.
    pub fn remove_edge(&mut self, a: Dpid, b: Dpid) {
        if let Some(list) = self.adjacency.get_mut(&a) {
            list.retain(|&(n, _)| n != b);
        }
        if let Some(list) = self.adjacency.get_mut(&b) {
            list.retain(|&(n, _)| n != a);
        }
    }

    pub fn neighbors(&self, id: Dpid) -> &[(Dpid, u32)] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges_of(&self, id: Dpid) -> Vec<Edge> {
        self.neighbors(id)
            .iter()
            .map(|&(b, weight)| Edge { a: id, b, weight })
            .collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn switches(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.kind.is_switch())
    }

    pub fn switch_count(&self) -> usize {
        self.switches().count()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum::<usize>() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: Dpid, kind: NodeKind) -> Node {
        Node { id, kind, ip: Ipv4Addr::from(id as u32) }
    }

    #[test]
    fn edges_are_undirected_and_deduplicated() {
        let mut topo = Topology::new();
        topo.add_node(node(1, NodeKind::Edge));
        topo.add_node(node(2, NodeKind::Edge));
        topo.add_edge(1, 2, 1);
        topo.add_edge(2, 1, 1);
        assert_eq!(topo.edge_count(), 1);
        assert_eq!(topo.neighbors(1), &[(2, 1)]);
        assert_eq!(topo.neighbors(2), &[(1, 1)]);
    }

    #[test]
    fn edge_to_unknown_node_is_ignored() {
        let mut topo = Topology::new();
        topo.add_node(node(1, NodeKind::Edge));
        topo.add_edge(1, 99, 1);
        assert_eq!(topo.edge_count(), 0);
    }

    #[test]
    fn remove_edge_detaches_both_endpoints() {
        let mut topo = Topology::new();
        topo.add_node(node(1, NodeKind::Edge));
        topo.add_node(node(2, NodeKind::Host));
        topo.add_edge(1, 2, 1);
        topo.remove_edge(1, 2);
        assert!(topo.neighbors(1).is_empty());
        assert!(topo.neighbors(2).is_empty());
        assert_eq!(topo.edge_count(), 0);
    }

    #[test]
    fn switch_count_excludes_hosts() {
        let mut topo = Topology::new();
        topo.add_node(node(1, NodeKind::Edge));
        topo.add_node(node(2, NodeKind::Aggregation));
        topo.add_node(node(3, NodeKind::Host));
        assert_eq!(topo.switch_count(), 2);
        assert_eq!(topo.node_count(), 3);
    }
}
