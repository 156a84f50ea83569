use serde::{Deserialize, Serialize};

use crate::network::{endpoint::DiscoveryProtocol, mac::MacAddress, switch::SwitchInterface};

/// A directed graph edge from a switch interface to whatever it connects to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub interface: SwitchInterface,
    pub kind: EdgeKind,
    pub protocols: Vec<DiscoveryProtocol>,
    pub mac: Option<MacAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeKind {
    /// One logical switch-to-switch link. `peer` is set when the far end confirmed it.
    SwitchLink {
        peer: Option<SwitchInterface>,
        verified: bool,
    },
    Server,
    Unknown,
}

impl Edge {
    /// Multi-line label: interface (and peer interface), MAC, protocols.
    pub fn label(&self) -> String {
        let mut lines = Vec::new();
        match &self.kind {
            EdgeKind::SwitchLink { peer: Some(peer), .. } => {
                lines.push(format!("{} <-> {}", self.interface.name, peer.name));
            }
            EdgeKind::SwitchLink { peer: None, .. } => {
                lines.push(format!("{} (unverified)", self.interface.name));
            }
            _ => lines.push(self.interface.name.clone()),
        }
        if let Some(mac) = self.mac {
            lines.push(format!("MAC: {mac}"));
        }
        if !self.protocols.is_empty() {
            lines.push(
                self.protocols
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join("/"),
            );
        }
        lines.join("\n")
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One side of a switch-to-switch link and the discovery protocols seen on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSide {
    pub interface: SwitchInterface,
    pub protocols: Vec<DiscoveryProtocol>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkPeer {
    /// The peer switch reported the link back.
    Verified(LinkSide),
    /// Only the local side reported the link.
    Unverified {
        switch: String,
        reported_interface: Option<String>,
    },
}

/// A reconciled switch-to-switch link. A verified link stores its smaller side as `local`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchLink {
    pub local: LinkSide,
    pub peer: LinkPeer,
}

impl SwitchLink {
    pub fn verified(a: LinkSide, b: LinkSide) -> Self {
        let (local, peer) = if a.interface <= b.interface { (a, b) } else { (b, a) };
        Self {
            local,
            peer: LinkPeer::Verified(peer),
        }
    }

    pub fn unverified(local: LinkSide, switch: String, reported_interface: Option<String>) -> Self {
        Self {
            local,
            peer: LinkPeer::Unverified {
                switch,
                reported_interface,
            },
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.peer, LinkPeer::Verified(_))
    }

    pub fn peer_switch(&self) -> &str {
        match &self.peer {
            LinkPeer::Verified(side) => &side.interface.switch,
            LinkPeer::Unverified { switch, .. } => switch,
        }
    }

    pub fn peer_interface_name(&self) -> Option<&str> {
        match &self.peer {
            LinkPeer::Verified(side) => Some(&side.interface.name),
            LinkPeer::Unverified {
                reported_interface, ..
            } => reported_interface.as_deref(),
        }
    }

    /// True if `interface` is either end of this link.
    pub fn touches(&self, interface: &SwitchInterface) -> bool {
        self.local.interface == *interface
            || matches!(&self.peer, LinkPeer::Verified(side) if side.interface == *interface)
    }

    /// Seen from `interface`: the far switch and, if known, its port.
    pub fn far_end_from(&self, interface: &SwitchInterface) -> Option<(&str, Option<&str>)> {
        if self.local.interface == *interface {
            return Some((self.peer_switch(), self.peer_interface_name()));
        }
        match &self.peer {
            LinkPeer::Verified(side) if side.interface == *interface => Some((
                self.local.interface.switch.as_str(),
                Some(self.local.interface.name.as_str()),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(switch: &str, name: &str, protocols: &[DiscoveryProtocol]) -> LinkSide {
        LinkSide {
            interface: SwitchInterface::new(switch, name),
            protocols: protocols.to_vec(),
        }
    }

    #[test]
    fn test_verified_link_orders_sides() {
        let a = side("nexus9k-2", "Eth1/1", &[DiscoveryProtocol::Cdp]);
        let b = side("nexus9k-1", "Eth1/1", &[DiscoveryProtocol::Lldp]);
        let one = SwitchLink::verified(a.clone(), b.clone());
        let two = SwitchLink::verified(b, a);
        assert_eq!(one, two);
        assert_eq!(one.local.interface.switch, "nexus9k-1");
        assert_eq!(one.peer_switch(), "nexus9k-2");
        assert!(one.is_verified());
    }

    #[test]
    fn test_far_end_from_either_side() {
        let link = SwitchLink::verified(
            side("nexus9k-1", "Eth1/1", &[DiscoveryProtocol::Cdp]),
            side("nexus9k-2", "Eth1/2", &[DiscoveryProtocol::Cdp]),
        );
        let from_b = SwitchInterface::new("nexus9k-2", "Ethernet1/2");
        assert!(link.touches(&from_b));
        assert_eq!(link.far_end_from(&from_b), Some(("nexus9k-1", Some("Eth1/1"))));
        assert_eq!(link.far_end_from(&SwitchInterface::new("nexus9k-2", "Eth1/9")), None);
    }

    #[test]
    fn test_edge_label() {
        let edge = Edge {
            interface: SwitchInterface::new("nexus9k-1", "Eth1/10"),
            kind: EdgeKind::Server,
            protocols: vec![DiscoveryProtocol::Lldp],
            mac: Some("00:11:22:33:44:55".parse().unwrap()),
        };
        assert_eq!(edge.label(), "Eth1/10\nMAC: 00:11:22:33:44:55\nLLDP");
    }
}
