use std::fmt::Display;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::network::{
    endpoint::{BmcType, Endpoint},
    mac::MacAddress,
    switch::SwitchInterface,
};

static NODE_NAMESPACE: Lazy<Uuid> =
    Lazy::new(|| Uuid::new_v5(&Uuid::NAMESPACE_OID, b"switch-mapper.node"));

/// Poll outcome of a configured switch as seen by the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchStatus {
    /// Polled and at least one interface had observations.
    Polled,
    /// Polled successfully but no interface yielded any data.
    Isolated,
    /// The poll failed or timed out; the switch contributes no data.
    Unreachable,
}

impl Display for SwitchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitchStatus::Polled => write!(f, "polled"),
            SwitchStatus::Isolated => write!(f, "isolated"),
            SwitchStatus::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// A node of the topology graph. Ids are UUIDv5 derived from the node's identity, so the same
/// server reached over several interfaces is one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub info: NodeInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeInfo {
    Switch {
        hostname: String,
        status: SwitchStatus,
    },
    Server {
        hostname: String,
        bmc_type: BmcType,
    },
    Unknown {
        mac: Option<MacAddress>,
        reported_name: Option<String>,
        /// Where the device was seen; only part of the identity when no MAC is known.
        seen_on: SwitchInterface,
    },
}

impl Node {
    pub fn switch(hostname: &str, status: SwitchStatus) -> Self {
        Self {
            id: Self::switch_id(hostname),
            info: NodeInfo::Switch {
                hostname: hostname.to_string(),
                status,
            },
        }
    }

    pub fn switch_id(hostname: &str) -> Uuid {
        Uuid::new_v5(&NODE_NAMESPACE, format!("switch:{}", hostname.to_ascii_lowercase()).as_bytes())
    }

    /// Builds the node for a non-switch endpoint. Switch endpoints map to the switch node
    /// and return `None`.
    pub fn from_endpoint(endpoint: &Endpoint, seen_on: &SwitchInterface) -> Option<Self> {
        match endpoint {
            Endpoint::Switch(_) => None,
            Endpoint::Server(server) => Some(Self {
                id: Uuid::new_v5(
                    &NODE_NAMESPACE,
                    format!("server:{}", server.hostname.to_ascii_lowercase()).as_bytes(),
                ),
                info: NodeInfo::Server {
                    hostname: server.hostname.clone(),
                    bmc_type: server.bmc_type,
                },
            }),
            Endpoint::Unknown(unknown) => {
                let key = match unknown.mac {
                    Some(mac) => format!("unknown:{mac}"),
                    None => format!("unknown:{}:{}", seen_on.switch, seen_on.name),
                };
                Some(Self {
                    id: Uuid::new_v5(&NODE_NAMESPACE, key.as_bytes()),
                    info: NodeInfo::Unknown {
                        mac: unknown.mac,
                        reported_name: unknown.reported_name.clone(),
                        seen_on: seen_on.clone(),
                    },
                })
            }
        }
    }

    /// Multi-line caption used by the renderers.
    pub fn caption(&self) -> String {
        match &self.info {
            NodeInfo::Switch { hostname, status } => match status {
                SwitchStatus::Unreachable => format!("{hostname}\nNexus switch (unreachable)"),
                _ => format!("{hostname}\nNexus switch"),
            },
            NodeInfo::Server { hostname, bmc_type } => format!("{hostname}\n{bmc_type}"),
            NodeInfo::Unknown { mac, reported_name, .. } => {
                let mut caption = "Unknown Device".to_string();
                if let Some(name) = reported_name {
                    caption.push('\n');
                    caption.push_str(name);
                }
                if let Some(mac) = mac {
                    caption.push('\n');
                    caption.push_str(&mac.to_string());
                }
                caption
            }
        }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.caption())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::endpoint::{ServerEndpoint, UnknownEndpoint};

    #[test]
    fn test_server_reached_twice_is_one_node() {
        let endpoint = Endpoint::Server(ServerEndpoint {
            hostname: "server1.example.com".into(),
            mac: "00:11:22:33:44:55".parse().unwrap(),
            bmc_type: BmcType::Ilo,
        });
        let a = Node::from_endpoint(&endpoint, &SwitchInterface::new("nexus9k-1", "Eth1/10")).unwrap();
        let b = Node::from_endpoint(&endpoint, &SwitchInterface::new("nexus9k-2", "Eth1/10")).unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, Node::switch_id("server1.example.com"));
    }

    #[test]
    fn test_unknown_without_mac_is_keyed_by_interface() {
        let endpoint = Endpoint::Unknown(UnknownEndpoint { mac: None, reported_name: Some("phone".into()) });
        let a = Node::from_endpoint(&endpoint, &SwitchInterface::new("nexus9k-1", "Eth1/3")).unwrap();
        let b = Node::from_endpoint(&endpoint, &SwitchInterface::new("nexus9k-1", "Eth1/4")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.caption(), "Unknown Device\nphone");
    }

    #[test]
    fn test_switch_endpoint_has_no_own_node() {
        let endpoint = Endpoint::Switch(crate::network::endpoint::SwitchEndpoint { hostname: "nexus9k-2".into() });
        assert!(Node::from_endpoint(&endpoint, &SwitchInterface::new("nexus9k-1", "Eth1/1")).is_none());
        assert_eq!(Node::switch_id("Nexus9k-2"), Node::switch_id("nexus9k-2"));
    }
}
