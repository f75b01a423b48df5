use super::{Node, NodeKind, Topology, dpid_of};
use crate::error::ConfigError;
use std::net::Ipv4Addr;
use tracing::info;

/// Builds the k-ary fat-tree with the standard pod addressing: pod switches
/// at `10.pod.switch.1` (edge switches use the low switch numbers,
/// aggregation the high ones), core switches at `10.k.j.i`, and hosts at
/// `10.pod.switch.id` with id starting at 2. All link weights are 1.
pub fn build(k: usize) -> Result<Topology, ConfigError> {
    if k < 2 || k % 2 != 0 {
        return Err(ConfigError::InvalidArity(k));
    }
    let half = k / 2;
    let mut topo = Topology::new();

    // (k/2)^2 core switches, grouped by j; group j serves the j-th
    // aggregation switch of every pod.
    for j in 1..=half {
        for i in 1..=half {
            add_switch(&mut topo, NodeKind::Core, addr(k, j, i));
        }
    }

    for pod in 0..k {
        for s in half..k {
            let agg = add_switch(&mut topo, NodeKind::Aggregation, addr(pod, s, 1));
            let group = s - half + 1;
            for i in 1..=half {
                topo.add_edge(agg, dpid_of(addr(k, group, i)), 1);
            }
        }
        for s in 0..half {
            let edge = add_switch(&mut topo, NodeKind::Edge, addr(pod, s, 1));
            for s_agg in half..k {
                topo.add_edge(edge, dpid_of(addr(pod, s_agg, 1)), 1);
            }
            for h in 2..=half + 1 {
                let host_ip = addr(pod, s, h);
                let host = Node { id: dpid_of(host_ip), kind: NodeKind::Host, ip: host_ip };
                topo.add_node(host);
                topo.add_edge(edge, host.id, 1);
            }
        }
    }

    info!(
        k,
        switches = topo.switch_count(),
        hosts = topo.node_count() - topo.switch_count(),
        "fat-tree topology generated"
    );
    Ok(topo)
}

/// Switches of a k-ary fat-tree: k^2 pod switches plus (k/2)^2 core switches.
pub fn switch_count(k: usize) -> usize {
    k * k + (k / 2) * (k / 2)
}

/// Gateway (edge-switch) address of the /24 an address belongs to.
pub fn gateway_of(ip: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from((u32::from(ip) & 0xffff_ff00) | 1)
}

/// Whether two addresses share a /24, the subnet granularity of the fabric.
pub fn same_subnet(a: Ipv4Addr, b: Ipv4Addr) -> bool {
    u32::from(a) & 0xffff_ff00 == u32::from(b) & 0xffff_ff00
}

fn addr(a: usize, b: usize, c: usize) -> Ipv4Addr {
    Ipv4Addr::new(10, a as u8, b as u8, c as u8)
}

fn add_switch(topo: &mut Topology, kind: NodeKind, ip: Ipv4Addr) -> u64 {
    let node = Node { id: dpid_of(ip), kind, ip };
    topo.add_node(node);
    node.id
}
