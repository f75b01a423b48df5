//! Control-plane decision engine for an OpenFlow-style fat-tree network.
//!
//! The engine consumes structured southbound events (packet-ins, switch
//! handshakes, link discovery) and produces the flow installations and
//! packet-outs that realize its decisions. Devices play one of three roles:
//! plain L2 learning switches, statically configured gateways with an
//! external-interface policy, and fat-tree fabric switches that route across
//! the discovered topology with precomputed shortest paths.
//!
//! Transport is out of scope here: a separate southbound layer decodes wire
//! frames into [`event::Event`] values and encodes [`command::Command`]
//! values back out.

pub mod algorithms;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod router;
pub mod routing;
pub mod service;
pub mod switch;
pub mod topology;
pub mod types;

pub use command::Command;
pub use config::ControllerConfig;
pub use controller::Controller;
pub use event::Event;
pub use service::{ControllerHandle, spawn};
pub use types::{Dpid, MacAddr, PortNo};
