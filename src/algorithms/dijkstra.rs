use crate::topology::Topology;
use crate::types::Dpid;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Shortest path from a source switch to one destination switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortestPath {
    pub distance: u32,
    /// The switch immediately after the source on the path.
    pub first_hop: Dpid,
}

#[derive(Debug, PartialEq, Eq)]
struct State {
    cost: u32,
    node: Dpid,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for a min-heap; ties broken by DPID so runs are
        // deterministic.
        other.cost.cmp(&self.cost).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-source shortest paths restricted to switch nodes. Hosts are
/// leaves: they are never relaxed and never appear in the result.
pub fn shortest_paths(topo: &Topology, source: Dpid) -> HashMap<Dpid, ShortestPath> {
    let mut dist: HashMap<Dpid, u32> = HashMap::new();
    let mut prev: HashMap<Dpid, Dpid> = HashMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(source, 0);
    heap.push(State { cost: 0, node: source });

    while let Some(State { cost, node }) = heap.pop() {
        if cost > *dist.get(&node).unwrap_or(&u32::MAX) {
            continue;
        }
        for &(next, weight) in topo.neighbors(node) {
            if !topo.node(next).is_some_and(|n| n.kind.is_switch()) {
                continue;
            }
            let candidate = cost + weight;
            if candidate < *dist.get(&next).unwrap_or(&u32::MAX) {
                dist.insert(next, candidate);
                prev.insert(next, node);
                heap.push(State { cost: candidate, node: next });
            }
        }
    }

    let mut paths = HashMap::new();
    for (&node, &distance) in &dist {
        if node == source {
            continue;
        }
        if let Some(first_hop) = first_hop(&prev, source, node) {
            paths.insert(node, ShortestPath { distance, first_hop });
        }
    }
    paths
}

/// Walks predecessors back from the destination until the node right after
/// the source.
fn first_hop(prev: &HashMap<Dpid, Dpid>, source: Dpid, dest: Dpid) -> Option<Dpid> {
    let mut current = dest;
    loop {
        let before = *prev.get(&current)?;
        if before == source {
            return Some(current);
        }
        current = before;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Node, NodeKind};
    use std::net::Ipv4Addr;

    fn chain(ids: &[Dpid]) -> Topology {
        let mut topo = Topology::new();
        for &id in ids {
            topo.add_node(Node {
                id,
                kind: NodeKind::Edge,
                ip: Ipv4Addr::from(id as u32),
            });
        }
        for pair in ids.windows(2) {
            topo.add_edge(pair[0], pair[1], 1);
        }
        topo
    }

    #[test]
    fn chain_distances_and_first_hop() {
        let topo = chain(&[1, 2, 3, 4]);
        let paths = shortest_paths(&topo, 1);
        assert_eq!(paths[&2], ShortestPath { distance: 1, first_hop: 2 });
        assert_eq!(paths[&3], ShortestPath { distance: 2, first_hop: 2 });
        assert_eq!(paths[&4], ShortestPath { distance: 3, first_hop: 2 });
        assert!(!paths.contains_key(&1));
    }

    #[test]
    fn hosts_are_not_traversed() {
        let mut topo = chain(&[1, 2]);
        // host hanging off switch 2 must not appear as a destination, and a
        // host bridging 1 and 3 must not create a path
        topo.add_node(Node { id: 10, kind: NodeKind::Host, ip: Ipv4Addr::from(10u32) });
        topo.add_node(Node { id: 3, kind: NodeKind::Edge, ip: Ipv4Addr::from(3u32) });
        topo.add_edge(2, 10, 1);
        topo.add_edge(10, 3, 1);
        let paths = shortest_paths(&topo, 1);
        assert!(!paths.contains_key(&10));
        assert!(!paths.contains_key(&3));
    }

    #[test]
    fn weights_are_respected() {
        let mut topo = chain(&[1, 2, 3]);
        // direct heavy edge loses to the two-hop light path
        topo.add_edge(1, 3, 5);
        let paths = shortest_paths(&topo, 1);
        assert_eq!(paths[&3], ShortestPath { distance: 2, first_hop: 2 });
    }

    #[test]
    fn unreachable_nodes_are_absent() {
        let mut topo = chain(&[1, 2]);
        topo.add_node(Node { id: 7, kind: NodeKind::Edge, ip: Ipv4Addr::from(7u32) });
        let paths = shortest_paths(&topo, 1);
        assert!(!paths.contains_key(&7));
    }
}
