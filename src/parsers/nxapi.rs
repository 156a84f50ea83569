/*!
Parsers for NX-API JSON bodies.

NX-API wraps every table as `TABLE_<name>.ROW_<name>`, where the row member is an object when
there is exactly one row and an array otherwise. A missing table or a `null` body means the
command printed nothing.
*/

use serde::Deserialize;
use serde_json::Value;

use crate::{
    network::{
        endpoint::{DiscoveryProtocol, MacTableEntry, NeighborRecord},
        mac::MacAddress,
        switch::{SwitchInterface, canonical_interface_name},
    },
    parsers::{InterfaceStatus, ParseError, Parsed, is_internal_port, present},
};

const CDP: &str = "CDP";
const LLDP: &str = "LLDP";
const MAC_TABLE: &str = "MAC table";
const INTERFACE_STATUS: &str = "interface status";

fn table_rows(
    body: &Value,
    table: &str,
    row: &str,
    origin: &'static str,
) -> Result<Vec<Value>, ParseError> {
    let object = match body {
        Value::Null => return Ok(Vec::new()),
        Value::Object(object) => object,
        other => {
            return Err(ParseError::Rejected {
                origin,
                detail: format!("expected an object body, got {}", json_kind(other)),
            });
        }
    };
    let Some(table_value) = object.get(table) else {
        return Ok(Vec::new());
    };
    match table_value.get(row) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(rows)) => Ok(rows.clone()),
        Some(single @ Value::Object(_)) => Ok(vec![single.clone()]),
        Some(other) => Err(ParseError::Rejected {
            origin,
            detail: format!("{row} is {}", json_kind(other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn row_as<T: for<'de> Deserialize<'de>>(row: Value, origin: &'static str) -> Result<T, ParseError> {
    serde_json::from_value(row).map_err(|e| ParseError::Malformed {
        origin,
        detail: e.to_string(),
    })
}

/// NX-API reports capability lists either as one string or as an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::One(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            StringOrList::Many(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CdpRow {
    intf_id: Option<String>,
    device_id: Option<String>,
    sysname: Option<String>,
    platform_id: Option<String>,
    port_id: Option<String>,
    capability: Option<StringOrList>,
}

#[derive(Debug, Deserialize)]
struct LldpRow {
    l_port_id: Option<String>,
    sys_name: Option<String>,
    chassis_id: Option<String>,
    port_id: Option<String>,
    sys_desc: Option<String>,
    enabled_capability: Option<StringOrList>,
}

#[derive(Debug, Deserialize)]
struct MacRow {
    disp_mac_addr: Option<String>,
    disp_port: Option<String>,
    disp_vlan: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct InterfaceRow {
    interface: Option<String>,
    state: Option<String>,
}

pub fn parse_cdp_neighbors(hostname: &str, body: &Value) -> Result<Parsed<NeighborRecord>, ParseError> {
    let mut parsed = Parsed::default();
    for row in table_rows(body, "TABLE_cdp_neighbor_detail_info", "ROW_cdp_neighbor_detail_info", CDP)? {
        parsed.push(cdp_row(hostname, row).map(Some));
    }
    Ok(parsed)
}

fn cdp_row(hostname: &str, row: Value) -> Result<NeighborRecord, ParseError> {
    let row: CdpRow = row_as(row, CDP)?;
    let interface = present(row.intf_id.as_deref()).ok_or(ParseError::MissingField {
        origin: CDP,
        field: "intf_id",
    })?;
    let device_name = present(row.device_id.as_deref())
        .or_else(|| present(row.sysname.as_deref()))
        .ok_or(ParseError::MissingField {
            origin: CDP,
            field: "device_id",
        })?;
    Ok(NeighborRecord {
        interface: SwitchInterface::new(hostname, &interface),
        protocol: DiscoveryProtocol::Cdp,
        device_name,
        mac: None,
        platform: present(row.platform_id.as_deref()),
        capabilities: row.capability.map(StringOrList::into_vec).unwrap_or_default(),
        remote_interface: present(row.port_id.as_deref()).map(|p| canonical_interface_name(&p)),
    })
}

pub fn parse_lldp_neighbors(hostname: &str, body: &Value) -> Result<Parsed<NeighborRecord>, ParseError> {
    let mut parsed = Parsed::default();
    for row in table_rows(body, "TABLE_nbor_detail", "ROW_nbor_detail", LLDP)? {
        parsed.push(lldp_row(hostname, row).map(Some));
    }
    Ok(parsed)
}

fn lldp_row(hostname: &str, row: Value) -> Result<NeighborRecord, ParseError> {
    let row: LldpRow = row_as(row, LLDP)?;
    let interface = present(row.l_port_id.as_deref()).ok_or(ParseError::MissingField {
        origin: LLDP,
        field: "l_port_id",
    })?;
    let chassis_id = present(row.chassis_id.as_deref());
    // servers often advertise no system name, only the chassis MAC
    let device_name = present(row.sys_name.as_deref())
        .filter(|name| name != "null")
        .or_else(|| chassis_id.clone())
        .ok_or(ParseError::MissingField {
            origin: LLDP,
            field: "sys_name",
        })?;
    Ok(NeighborRecord {
        interface: SwitchInterface::new(hostname, &interface),
        protocol: DiscoveryProtocol::Lldp,
        device_name,
        mac: MacAddress::parse_optional(chassis_id.as_deref()),
        platform: present(row.sys_desc.as_deref()),
        capabilities: row
            .enabled_capability
            .map(StringOrList::into_vec)
            .unwrap_or_default(),
        remote_interface: present(row.port_id.as_deref()).map(|p| canonical_interface_name(&p)),
    })
}

pub fn parse_mac_table(hostname: &str, body: &Value) -> Result<Parsed<MacTableEntry>, ParseError> {
    let mut parsed = Parsed::default();
    for row in table_rows(body, "TABLE_mac_address", "ROW_mac_address", MAC_TABLE)? {
        parsed.push(mac_row(hostname, row));
    }
    Ok(parsed)
}

fn mac_row(hostname: &str, row: Value) -> Result<Option<MacTableEntry>, ParseError> {
    let row: MacRow = row_as(row, MAC_TABLE)?;
    let port = present(row.disp_port.as_deref()).ok_or(ParseError::MissingField {
        origin: MAC_TABLE,
        field: "disp_port",
    })?;
    if is_internal_port(&port) {
        return Ok(None);
    }
    let raw_mac = present(row.disp_mac_addr.as_deref()).ok_or(ParseError::MissingField {
        origin: MAC_TABLE,
        field: "disp_mac_addr",
    })?;
    let mac: MacAddress = raw_mac.parse().map_err(|_| ParseError::InvalidMac {
        origin: MAC_TABLE,
        value: raw_mac.clone(),
    })?;
    // disp_vlan is a string on most releases, a number on some; "-" means none
    let vlan = match row.disp_vlan {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(Some(MacTableEntry {
        interface: SwitchInterface::new(hostname, &port),
        mac,
        vlan,
    }))
}

pub fn parse_interface_status(body: &Value) -> Result<Parsed<InterfaceStatus>, ParseError> {
    let mut parsed = Parsed::default();
    for row in table_rows(body, "TABLE_interface", "ROW_interface", INTERFACE_STATUS)? {
        parsed.push(status_row(row).map(Some));
    }
    Ok(parsed)
}

fn status_row(row: Value) -> Result<InterfaceStatus, ParseError> {
    let row: InterfaceRow = row_as(row, INTERFACE_STATUS)?;
    let interface = present(row.interface.as_deref()).ok_or(ParseError::MissingField {
        origin: INTERFACE_STATUS,
        field: "interface",
    })?;
    Ok(InterfaceStatus {
        interface: canonical_interface_name(&interface),
        state: present(row.state.as_deref()).unwrap_or_else(|| "unknown".to_string()),
    })
}
