/*
This module turns raw device output into the uniform observation types of the `network` module.

--- data_aquisition module ---
NX-API / SSH / Redfish
|
| Raw command output, shape depends on the transport
v
--- parsers module ---
NeighborRecord, MacTableEntry, interface status, BmcIdentity
|
v
--- topology module ---
Correlation into the TopologyGraph

The switch parsers come in two variants selected by transport: `nxapi` for NX-API JSON bodies and
`ssh_text` for CLI text. Both produce the same record shapes. A malformed record is returned in
`Parsed::skipped` and never aborts the rest of the payload.
*/

pub mod nxapi;
pub mod redfish;
pub mod ssh_text;

use thiserror::Error;

use crate::{
    data_aquisition::core::RawSwitchPayload,
    network::endpoint::{MacTableEntry, NeighborRecord},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{origin} record is missing '{field}'")]
    MissingField {
        origin: &'static str,
        field: &'static str,
    },
    #[error("{origin} record has invalid MAC '{value}'")]
    InvalidMac { origin: &'static str, value: String },
    #[error("{origin} record is malformed: {detail}")]
    Malformed {
        origin: &'static str,
        detail: String,
    },
    /// The payload as a whole has an unexpected shape; nothing could be read from it.
    #[error("unusable {origin} output: {detail}")]
    Rejected {
        origin: &'static str,
        detail: String,
    },
}

impl ParseError {
    pub fn source_label(&self) -> &'static str {
        match self {
            ParseError::MissingField { origin, .. }
            | ParseError::InvalidMac { origin, .. }
            | ParseError::Malformed { origin, .. }
            | ParseError::Rejected { origin, .. } => origin,
        }
    }
}

/// Records parsed from one payload plus the ones that had to be skipped.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub skipped: Vec<ParseError>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> Parsed<T> {
    pub(crate) fn push(&mut self, result: Result<Option<T>, ParseError>) {
        match result {
            Ok(Some(record)) => self.records.push(record),
            Ok(None) => {}
            Err(e) => self.skipped.push(e),
        }
    }

    pub(crate) fn merge(&mut self, other: Parsed<T>) {
        self.records.extend(other.records);
        self.skipped.extend(other.skipped);
    }
}

/// Per-interface operational state from `show interface status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceStatus {
    pub interface: String,
    pub state: String,
}

/// Everything one switch reported, normalized.
#[derive(Debug, Clone, Default)]
pub struct SwitchRecords {
    pub neighbors: Vec<NeighborRecord>,
    pub mac_table: Vec<MacTableEntry>,
    pub interface_status: Vec<InterfaceStatus>,
    pub skipped: Vec<ParseError>,
}

/// Normalizes a switch payload with the parser matching its transport.
///
/// Returns `Err` only when the neighbor or MAC output is unusable as a whole; single bad
/// records end up in `SwitchRecords::skipped`.
pub fn normalize_switch(hostname: &str, payload: &RawSwitchPayload) -> Result<SwitchRecords, ParseError> {
    let (neighbors, mac_table, status) = match payload {
        RawSwitchPayload::NxApi(outputs) => {
            let mut neighbors = nxapi::parse_cdp_neighbors(hostname, &outputs.cdp_neighbors)?;
            neighbors.merge(nxapi::parse_lldp_neighbors(hostname, &outputs.lldp_neighbors)?);
            let mac_table = nxapi::parse_mac_table(hostname, &outputs.mac_table)?;
            let status = match &outputs.interface_status {
                Some(body) => nxapi::parse_interface_status(body)?,
                None => Parsed::default(),
            };
            (neighbors, mac_table, status)
        }
        RawSwitchPayload::Ssh(outputs) => {
            let mut neighbors = ssh_text::parse_cdp_neighbors(hostname, &outputs.cdp_neighbors);
            neighbors.merge(ssh_text::parse_lldp_neighbors(hostname, &outputs.lldp_neighbors));
            let mac_table = ssh_text::parse_mac_table(hostname, &outputs.mac_table);
            let status = match &outputs.interface_status {
                Some(text) => ssh_text::parse_interface_status(text),
                None => Parsed::default(),
            };
            (neighbors, mac_table, status)
        }
    };

    let mut skipped = neighbors.skipped;
    skipped.extend(mac_table.skipped);
    skipped.extend(status.skipped);
    Ok(SwitchRecords {
        neighbors: neighbors.records,
        mac_table: mac_table.records,
        interface_status: status.records,
        skipped,
    })
}

/// Trims a device-reported value; blank means absent.
pub(crate) fn present(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Ports that carry the switch's own MACs, or MACs learned across the vPC peer link, rather
/// than attached devices.
pub(crate) fn is_internal_port(port: &str) -> bool {
    let lower = port.trim().to_ascii_lowercase();
    lower.starts_with("sup-") || lower == "cpu" || lower.ends_with("(r)") || lower.ends_with("peer-link")
}
