use crate::algorithms::dijkstra::{self, ShortestPath};
use crate::topology::Topology;
use crate::types::Dpid;
use std::collections::HashMap;
use tracing::info;

/// Precomputed per-source next-hop tables. Computed once, when discovery
/// completes; a topology change afterwards leaves them stale.
#[derive(Debug, Default)]
pub struct NextHopTable {
    tables: HashMap<Dpid, HashMap<Dpid, ShortestPath>>,
}

impl NextHopTable {
    /// Runs the shortest-path computation from every switch in the graph.
    pub fn compute(topo: &Topology) -> Self {
        let tables: HashMap<_, _> = topo
            .switches()
            .map(|sw| (sw.id, dijkstra::shortest_paths(topo, sw.id)))
            .collect();
        info!(sources = tables.len(), "next-hop tables computed");
        NextHopTable { tables }
    }

    pub fn first_hop(&self, from: Dpid, to: Dpid) -> Option<Dpid> {
        self.tables.get(&from)?.get(&to).map(|p| p.first_hop)
    }

    pub fn distance(&self, from: Dpid, to: Dpid) -> Option<u32> {
        self.tables.get(&from)?.get(&to).map(|p| p.distance)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::fattree;
    use std::net::Ipv4Addr;

    #[test]
    fn every_switch_reaches_every_other_switch() {
        let topo = fattree::build(4).unwrap();
        let table = NextHopTable::compute(&topo);
        for a in topo.switches() {
            for b in topo.switches() {
                if a.id == b.id {
                    continue;
                }
                assert!(
                    table.distance(a.id, b.id).is_some(),
                    "no path {} -> {}",
                    a.ip,
                    b.ip
                );
            }
        }
    }

    #[test]
    fn inter_pod_edge_distance_is_four() {
        use crate::topology::dpid_of;
        let topo = fattree::build(4).unwrap();
        let table = NextHopTable::compute(&topo);
        let a = dpid_of(Ipv4Addr::new(10, 0, 0, 1));
        let b = dpid_of(Ipv4Addr::new(10, 3, 1, 1));
        // edge -> aggregation -> core -> aggregation -> edge
        assert_eq!(table.distance(a, b), Some(4));
        // the first hop must be one of the pod's aggregation switches
        let hop = table.first_hop(a, b).unwrap();
        let hop_ip = topo.node(hop).unwrap().ip;
        assert!(hop_ip == Ipv4Addr::new(10, 0, 2, 1) || hop_ip == Ipv4Addr::new(10, 0, 3, 1));
    }

    #[test]
    fn intra_pod_distance_is_two() {
        use crate::topology::dpid_of;
        let topo = fattree::build(4).unwrap();
        let table = NextHopTable::compute(&topo);
        let a = dpid_of(Ipv4Addr::new(10, 1, 0, 1));
        let b = dpid_of(Ipv4Addr::new(10, 1, 1, 1));
        assert_eq!(table.distance(a, b), Some(2));
    }
}
