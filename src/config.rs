use crate::error::ConfigError;
use crate::types::{Dpid, MacAddr, PortNo};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use std::path::Path;

/// One router-facing interface of a statically configured gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub mac: MacAddr,
    /// Interface address with prefix, e.g. `10.0.1.1/24`.
    pub addr: Ipv4Net,
}

impl InterfaceConfig {
    pub fn ip(&self) -> Ipv4Addr {
        self.addr.addr()
    }

    pub fn subnet(&self) -> Ipv4Net {
        self.addr.trunc()
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.addr.contains(&ip)
    }
}

/// Static per-gateway interface map. Ports are ordered so subnet matching is
/// deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub interfaces: BTreeMap<PortNo, InterfaceConfig>,
    /// Interface facing the external network; no transit traffic may cross
    /// it in either direction.
    #[serde(default)]
    pub external_port: Option<PortNo>,
}

impl GatewayConfig {
    pub fn interface(&self, port: PortNo) -> Option<&InterfaceConfig> {
        self.interfaces.get(&port)
    }

    pub fn interface_ip(&self, port: PortNo) -> Option<Ipv4Addr> {
        self.interfaces.get(&port).map(InterfaceConfig::ip)
    }

    /// Interface owning the given address, if it is one of ours.
    pub fn interface_for_ip(&self, ip: Ipv4Addr) -> Option<&InterfaceConfig> {
        self.interfaces.values().find(|iface| iface.ip() == ip)
    }

    /// Egress port whose configured subnet contains the address.
    pub fn port_for_subnet(&self, ip: Ipv4Addr) -> Option<PortNo> {
        self.interfaces
            .iter()
            .find(|(_, iface)| iface.contains(ip))
            .map(|(&port, _)| port)
    }

    pub fn is_external_subnet(&self, ip: Ipv4Addr) -> bool {
        self.external_port
            .and_then(|port| self.interfaces.get(&port))
            .is_some_and(|iface| iface.contains(ip))
    }
}

/// Top-level engine configuration: which devices are gateways, and whether a
/// fat-tree fabric is expected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Fat-tree arity (ports per switch). When set, every generated switch
    /// acts as a fabric router for its own /24.
    #[serde(default)]
    pub fattree_k: Option<usize>,
    /// Statically configured ARP-aware gateways, keyed by DPID.
    #[serde(default)]
    pub gateways: HashMap<Dpid, GatewayConfig>,
}

impl ControllerConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ControllerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(k) = self.fattree_k {
            if k < 2 || k % 2 != 0 {
                return Err(ConfigError::InvalidArity(k));
            }
        }
        for (&dpid, gateway) in &self.gateways {
            if let Some(port) = gateway.external_port {
                if !gateway.interfaces.contains_key(&port) {
                    return Err(ConfigError::ExternalPortUnknown { dpid, port });
                }
            }
            let interfaces: Vec<_> = gateway.interfaces.iter().collect();
            for (i, &(&a, iface_a)) in interfaces.iter().enumerate() {
                for &(&b, iface_b) in interfaces.iter().skip(i + 1) {
                    if iface_a.subnet() == iface_b.subnet() {
                        return Err(ConfigError::DuplicateSubnet {
                            dpid,
                            a,
                            b,
                            net: iface_a.subnet(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn two_subnet_gateway() -> GatewayConfig {
    let mut interfaces = BTreeMap::new();
    interfaces.insert(1, InterfaceConfig {
        mac: "00:00:00:00:01:01".parse().unwrap(),
        addr: "10.0.1.1/24".parse().unwrap(),
    });
    interfaces.insert(2, InterfaceConfig {
        mac: "00:00:00:00:01:02".parse().unwrap(),
        addr: "10.0.2.1/24".parse().unwrap(),
    });
    interfaces.insert(3, InterfaceConfig {
        mac: "00:00:00:00:01:03".parse().unwrap(),
        addr: "192.168.1.1/24".parse().unwrap(),
    });
    GatewayConfig { interfaces, external_port: Some(3) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gateway_config_from_json() {
        let raw = r#"{
            "gateways": {
                "3": {
                    "interfaces": {
                        "1": { "mac": "00:00:00:00:01:01", "addr": "10.0.1.1/24" },
                        "2": { "mac": "00:00:00:00:01:02", "addr": "10.0.2.1/24" }
                    },
                    "external_port": 2
                }
            }
        }"#;
        let config: ControllerConfig = serde_json::from_str(raw).unwrap();
        config.validate().unwrap();
        let gateway = &config.gateways[&3];
        assert_eq!(gateway.interface_ip(1), Some(Ipv4Addr::new(10, 0, 1, 1)));
        assert!(gateway.is_external_subnet(Ipv4Addr::new(10, 0, 2, 40)));
    }

    #[test]
    fn subnet_matching_is_exact() {
        let gateway = two_subnet_gateway();
        assert_eq!(gateway.port_for_subnet(Ipv4Addr::new(10, 0, 2, 17)), Some(2));
        assert_eq!(gateway.port_for_subnet(Ipv4Addr::new(10, 0, 3, 17)), None);
        assert!(gateway.interface_for_ip(Ipv4Addr::new(10, 0, 1, 1)).is_some());
        assert!(gateway.interface_for_ip(Ipv4Addr::new(10, 0, 1, 2)).is_none());
    }

    #[test]
    fn validation_rejects_unknown_external_port() {
        let mut gateway = two_subnet_gateway();
        gateway.external_port = Some(9);
        let config = ControllerConfig {
            fattree_k: None,
            gateways: HashMap::from([(3, gateway)]),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ExternalPortUnknown { dpid: 3, port: 9 })
        ));
    }

    #[test]
    fn validation_rejects_duplicate_subnets() {
        let mut gateway = two_subnet_gateway();
        gateway.interfaces.insert(4, InterfaceConfig {
            mac: "00:00:00:00:01:04".parse().unwrap(),
            addr: "10.0.1.7/24".parse().unwrap(),
        });
        let config = ControllerConfig {
            fattree_k: None,
            gateways: HashMap::from([(3, gateway)]),
        };
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateSubnet { .. })));
    }

    #[test]
    fn validation_rejects_odd_arity() {
        let config = ControllerConfig { fattree_k: Some(3), gateways: HashMap::new() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidArity(3))));
    }
}
