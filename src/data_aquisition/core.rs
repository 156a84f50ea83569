use serde::Serialize;
use serde_json::Value;

use crate::network::endpoint::BmcType;

/// The show commands collected from every switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchCommand {
    CdpNeighbors,
    LldpNeighbors,
    MacTable,
    InterfaceStatus,
}

impl SwitchCommand {
    pub fn cli(&self) -> &'static str {
        match self {
            SwitchCommand::CdpNeighbors => "show cdp neighbors detail",
            SwitchCommand::LldpNeighbors => "show lldp neighbors detail",
            SwitchCommand::MacTable => "show mac address-table",
            SwitchCommand::InterfaceStatus => "show interface status",
        }
    }
}

/// Output of every [`SwitchCommand`] for one switch. `T` is the transport's body type.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutputs<T> {
    pub cdp_neighbors: T,
    pub lldp_neighbors: T,
    pub mac_table: T,
    pub interface_status: Option<T>,
}

/// Raw data retrieved from a switch, tagged by the transport that produced it. The tag selects
/// the parser family in `parsers`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "transport", content = "outputs", rename_all = "snake_case")]
pub enum RawSwitchPayload {
    /// NX-API `body` objects.
    NxApi(CommandOutputs<Value>),
    /// CLI text collected over SSH.
    Ssh(CommandOutputs<String>),
}

impl RawSwitchPayload {
    pub fn transport(&self) -> &'static str {
        match self {
            RawSwitchPayload::NxApi(_) => "nxapi",
            RawSwitchPayload::Ssh(_) => "ssh",
        }
    }
}

/// Redfish documents retrieved from one BMC.
#[derive(Debug, Clone, Serialize)]
pub struct RawBmcPayload {
    pub address: String,
    pub bmc_type: BmcType,
    /// The ComputerSystem document.
    pub system: Value,
    /// One document per EthernetInterface member.
    pub interfaces: Vec<Value>,
}
