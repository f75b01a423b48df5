use crate::types::{Dpid, MacAddr, PortNo};
use std::collections::HashMap;
use tracing::debug;

/// L2 forwarding decision for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L2Decision {
    Forward(PortNo),
    /// Unknown destination: send on every port except the ingress one.
    Flood,
}

/// Per-switch source-MAC to port memory. Last write wins and entries never
/// expire.
#[derive(Debug, Default)]
pub struct MacTable {
    tables: HashMap<Dpid, HashMap<MacAddr, PortNo>>,
}

impl MacTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the source binding, then decides for the destination.
    /// Broadcast destinations are never learned, so they always flood.
    pub fn observe(
        &mut self,
        dpid: Dpid,
        in_port: PortNo,
        src: MacAddr,
        dst: MacAddr,
    ) -> L2Decision {
        let table = self.tables.entry(dpid).or_default();
        table.insert(src, in_port);
        match table.get(&dst) {
            Some(&port) => {
                debug!(dpid, %dst, port, "destination known");
                L2Decision::Forward(port)
            }
            None => {
                debug!(dpid, %dst, "destination unknown, flooding");
                L2Decision::Flood
            }
        }
    }

    pub fn lookup(&self, dpid: Dpid, mac: MacAddr) -> Option<PortNo> {
        self.tables.get(&dpid)?.get(&mac).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(n: u8) -> MacAddr {
        MacAddr::new([0, 0, 0, 0, 0, n])
    }

    #[test]
    fn source_is_learned_before_deciding() {
        let mut table = MacTable::new();
        assert_eq!(table.observe(1, 4, mac(1), mac(2)), L2Decision::Flood);
        assert_eq!(table.lookup(1, mac(1)), Some(4));
        // reverse direction now finds the learned port
        assert_eq!(table.observe(1, 7, mac(2), mac(1)), L2Decision::Forward(4));
    }

    #[test]
    fn last_write_wins() {
        let mut table = MacTable::new();
        table.observe(1, 4, mac(1), mac(9));
        table.observe(1, 5, mac(1), mac(9));
        assert_eq!(table.lookup(1, mac(1)), Some(5));
    }

    #[test]
    fn tables_are_per_switch() {
        let mut table = MacTable::new();
        table.observe(1, 4, mac(1), mac(9));
        assert_eq!(table.lookup(2, mac(1)), None);
        assert_eq!(table.observe(2, 3, mac(2), mac(1)), L2Decision::Flood);
    }

    #[test]
    fn broadcast_destination_always_floods() {
        let mut table = MacTable::new();
        table.observe(1, 1, mac(1), MacAddr::BROADCAST);
        assert_eq!(
            table.observe(1, 2, mac(2), MacAddr::BROADCAST),
            L2Decision::Flood
        );
        assert_eq!(table.lookup(1, MacAddr::BROADCAST), None);
    }
}
