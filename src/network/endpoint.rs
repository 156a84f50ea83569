use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::network::{mac::MacAddress, switch::SwitchInterface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiscoveryProtocol {
    Cdp,
    Lldp,
}

impl Display for DiscoveryProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryProtocol::Cdp => write!(f, "CDP"),
            DiscoveryProtocol::Lldp => write!(f, "LLDP"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmcType {
    Ilo,
    Idrac,
}

impl Display for BmcType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BmcType::Ilo => write!(f, "ilo"),
            BmcType::Idrac => write!(f, "idrac"),
        }
    }
}

/// A normalized CDP or LLDP observation on one local interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub interface: SwitchInterface,
    pub protocol: DiscoveryProtocol,
    pub device_name: String,
    pub mac: Option<MacAddress>,
    pub platform: Option<String>,
    pub capabilities: Vec<String>,
    /// The far end's own port name, canonicalized.
    pub remote_interface: Option<String>,
}

/// One row of a switch's forwarding table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacTableEntry {
    pub interface: SwitchInterface,
    pub mac: MacAddress,
    pub vlan: Option<u16>,
}

/// A server NIC as reported by its management controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BmcIdentity {
    pub mac: MacAddress,
    pub hostname: String,
    pub bmc_type: BmcType,
    /// Address of the BMC that reported this identity.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchEndpoint {
    pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub hostname: String,
    pub mac: MacAddress,
    pub bmc_type: BmcType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownEndpoint {
    pub mac: Option<MacAddress>,
    /// Device name from an unmatched neighbor record, if one was seen.
    pub reported_name: Option<String>,
}

/// Resolved far end of a switch interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Endpoint {
    Switch(SwitchEndpoint),
    Server(ServerEndpoint),
    Unknown(UnknownEndpoint),
}

impl Endpoint {
    pub fn mac(&self) -> Option<MacAddress> {
        match self {
            Endpoint::Switch(_) => None,
            Endpoint::Server(server) => Some(server.mac),
            Endpoint::Unknown(unknown) => unknown.mac,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Endpoint::Switch(switch) => switch.hostname.clone(),
            Endpoint::Server(server) => server.hostname.clone(),
            Endpoint::Unknown(unknown) => match (&unknown.reported_name, unknown.mac) {
                (Some(name), _) => name.clone(),
                (None, Some(mac)) => format!("Unknown Device {mac}"),
                (None, None) => "Unknown Device".to_string(),
            },
        }
    }
}
