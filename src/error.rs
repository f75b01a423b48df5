use ipnet::Ipv4Net;
use thiserror::Error;

/// Why a packet was discarded without emitting any instruction. Drops are
/// logged and local to the event; none of them are fatal to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("non-ICMP traffic addressed to a router interface")]
    UnsupportedProtocol,
    #[error("destination subnet unknown or external")]
    UnreachableOrExternal,
    #[error("transit to or from the external network is forbidden")]
    PolicyViolation,
    #[error("intra-subnet traffic misdirected to the router")]
    SameSubnetMisdirected,
    #[error("no route computed for the destination")]
    NoRoute,
    #[error("frame not addressed to this device")]
    NotForDevice,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("gateway {dpid}: external port {port} has no configured interface")]
    ExternalPortUnknown { dpid: u64, port: u32 },
    #[error("gateway {dpid}: ports {a} and {b} both cover subnet {net}")]
    DuplicateSubnet { dpid: u64, a: u32, b: u32, net: Ipv4Net },
    #[error("fat-tree arity must be even and at least 2, got {0}")]
    InvalidArity(usize),
}
