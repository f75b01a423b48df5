use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// OpenFlow datapath identifier of a switch-like device.
pub type Dpid = u64;

/// Physical port number on a device.
pub type PortNo = u32;

pub const ETH_TYPE_IP: u16 = 0x0800;
pub const ETH_TYPE_ARP: u16 = 0x0806;

pub const IPPROTO_ICMP: u8 = 1;

/// 48-bit Ethernet address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        MacAddr(octets)
    }

    /// MAC a fabric switch answers with, derived from the low 48 bits of its
    /// DPID.
    pub fn from_dpid(dpid: Dpid) -> Self {
        let b = dpid.to_be_bytes();
        MacAddr([b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid MAC address: {0}")]
pub struct InvalidMacAddr(String);

impl FromStr for MacAddr {
    type Err = InvalidMacAddr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(|| InvalidMacAddr(s.to_string()))?;
            *octet = u8::from_str_radix(part, 16).map_err(|_| InvalidMacAddr(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(InvalidMacAddr(s.to_string()));
        }
        Ok(MacAddr(octets))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A frame as decoded by the packet codec collaborator. The decision engine
/// only ever sees structured fields; raw bytes travel alongside in the
/// packet-in event for exact relays.
#[derive(Debug, Clone, PartialEq)]
pub struct EthernetFrame {
    pub src: MacAddr,
    pub dst: MacAddr,
    pub payload: FramePayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FramePayload {
    Arp(ArpPacket),
    Ipv4(Ipv4Packet),
    Other { ether_type: u16 },
}

impl EthernetFrame {
    pub fn ether_type(&self) -> u16 {
        match &self.payload {
            FramePayload::Arp(_) => ETH_TYPE_ARP,
            FramePayload::Ipv4(_) => ETH_TYPE_IP,
            FramePayload::Other { ether_type } => *ether_type,
        }
    }

    /// Broadcast who-has frame sourced from one of our own interfaces.
    pub fn arp_request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        EthernetFrame {
            src: sender_mac,
            dst: MacAddr::BROADCAST,
            payload: FramePayload::Arp(ArpPacket {
                op: ArpOp::Request,
                sender_mac,
                sender_ip,
                target_mac: MacAddr::BROADCAST,
                target_ip,
            }),
        }
    }

    pub fn arp_reply(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        EthernetFrame {
            src: sender_mac,
            dst: target_mac,
            payload: FramePayload::Arp(ArpPacket {
                op: ArpOp::Reply,
                sender_mac,
                sender_ip,
                target_mac,
                target_ip,
            }),
        }
    }

    /// Echo reply mirroring a received request: addresses swapped, id,
    /// sequence and payload untouched.
    pub fn icmp_echo_reply(
        src_mac: MacAddr,
        dst_mac: MacAddr,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
        echo: IcmpEcho,
    ) -> Self {
        EthernetFrame {
            src: src_mac,
            dst: dst_mac,
            payload: FramePayload::Ipv4(Ipv4Packet {
                src: src_ip,
                dst: dst_ip,
                proto: IPPROTO_ICMP,
                payload: IpPayload::IcmpEchoReply(echo),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOp {
    Request,
    Reply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    pub op: ArpOp,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ipv4Packet {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub proto: u8,
    pub payload: IpPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IpPayload {
    IcmpEchoRequest(IcmpEcho),
    IcmpEchoReply(IcmpEcho),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpEcho {
    pub id: u16,
    pub seq: u16,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_display_roundtrip() {
        let mac = MacAddr::new([0x00, 0x00, 0x00, 0x00, 0x01, 0x02]);
        assert_eq!(mac.to_string(), "00:00:00:00:01:02");
        assert_eq!("00:00:00:00:01:02".parse::<MacAddr>().unwrap(), mac);
    }

    #[test]
    fn mac_parse_rejects_garbage() {
        assert!("00:00:00:00:01".parse::<MacAddr>().is_err());
        assert!("00:00:00:00:01:02:03".parse::<MacAddr>().is_err());
        assert!("zz:00:00:00:01:02".parse::<MacAddr>().is_err());
    }

    #[test]
    fn mac_from_dpid_takes_low_48_bits() {
        let ip = Ipv4Addr::new(10, 0, 0, 1);
        let dpid = u32::from(ip) as Dpid;
        assert_eq!(
            MacAddr::from_dpid(dpid),
            MacAddr::new([0x00, 0x00, 0x0a, 0x00, 0x00, 0x01])
        );
    }

    #[test]
    fn broadcast_is_never_unicast() {
        assert!(MacAddr::BROADCAST.is_broadcast());
        assert!(MacAddr::BROADCAST.is_multicast());
        assert!(!MacAddr::new([0, 0, 0, 0, 0, 1]).is_broadcast());
    }

    #[test]
    fn echo_reply_swaps_addresses_and_keeps_payload() {
        let echo = IcmpEcho { id: 7, seq: 3, data: vec![1, 2, 3] };
        let frame = EthernetFrame::icmp_echo_reply(
            MacAddr::new([0, 0, 0, 0, 1, 1]),
            MacAddr::new([0, 0, 0, 0, 2, 2]),
            Ipv4Addr::new(10, 0, 1, 1),
            Ipv4Addr::new(10, 0, 1, 2),
            echo.clone(),
        );
        match frame.payload {
            FramePayload::Ipv4(ip) => {
                assert_eq!(ip.src, Ipv4Addr::new(10, 0, 1, 1));
                assert_eq!(ip.dst, Ipv4Addr::new(10, 0, 1, 2));
                assert_eq!(ip.payload, IpPayload::IcmpEchoReply(echo));
            }
            other => panic!("expected IPv4 payload, got {other:?}"),
        }
    }
}
