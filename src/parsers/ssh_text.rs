/*!
Parsers for NX-OS CLI text collected over SSH.

`show cdp neighbors detail` and `show lldp neighbors detail` print one block per neighbor,
starting at `Device ID:` and `Chassis id:` respectively. Lines outside a block (legends,
headers, totals) are ignored.
*/

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

/// Values NX-OS prints for a TLV the neighbor did not send.
const ABSENT_VALUES: [&str; 3] = ["null", "not advertised", "n/a"];

const INTERFACE_STATES: [&str; 12] = [
    "connected",
    "notconnec",
    "notconnect",
    "disabled",
    "sfpAbsent",
    "xcvrAbsen",
    "noOperMem",
    "down",
    "up",
    "linkFlapE",
    "err-disabled",
    "suspended",
];

fn text_value(raw: &str) -> Option<String> {
    present(Some(raw)).filter(|v| !ABSENT_VALUES.contains(&v.to_ascii_lowercase().as_str()))
}

/// Splits `text` into blocks, each starting at a line whose trimmed form begins with `marker`.
fn blocks<'a>(text: &'a str, marker: &str) -> Vec<Vec<&'a str>> {
    let mut out: Vec<Vec<&str>> = Vec::new();
    for line in text.lines() {
        if line.trim_start().starts_with(marker) {
            out.push(vec![line.trim()]);
        } else if let Some(current) = out.last_mut() {
            current.push(line.trim());
        }
    }
    out
}

pub fn parse_cdp_neighbors(hostname: &str, text: &str) -> Parsed<NeighborRecord> {
    let mut parsed = Parsed::default();
    for block in blocks(text, "Device ID:") {
        parsed.push(cdp_block(hostname, &block).map(Some));
    }
    parsed
}

fn cdp_block(hostname: &str, block: &[&str]) -> Result<NeighborRecord, ParseError> {
    let mut device_id = None;
    let mut system_name = None;
    let mut platform = None;
    let mut capabilities = Vec::new();
    let mut interface = None;
    let mut remote_interface = None;

    for line in block {
        if let Some(rest) = line.strip_prefix("Device ID:") {
            device_id = text_value(rest);
        } else if let Some(rest) = line.strip_prefix("System Name:") {
            system_name = text_value(rest);
        } else if let Some(rest) = line.strip_prefix("Platform:") {
            let (platform_part, tail) = rest.split_once(',').unwrap_or((rest, ""));
            platform = text_value(platform_part);
            if let Some(caps) = tail.trim().strip_prefix("Capabilities:") {
                capabilities = caps.split_whitespace().map(str::to_string).collect();
            }
        } else if let Some(rest) = line.strip_prefix("Interface:") {
            let (local, tail) = rest.split_once(',').unwrap_or((rest, ""));
            interface = text_value(local);
            remote_interface = tail
                .trim()
                .strip_prefix("Port ID (outgoing port):")
                .and_then(text_value)
                .map(|p| canonical_interface_name(&p));
        }
    }

    let interface = interface.ok_or(ParseError::MissingField {
        origin: CDP,
        field: "Interface",
    })?;
    let device_name = device_id.or(system_name).ok_or(ParseError::MissingField {
        origin: CDP,
        field: "Device ID",
    })?;
    Ok(NeighborRecord {
        interface: SwitchInterface::new(hostname, &interface),
        protocol: DiscoveryProtocol::Cdp,
        device_name,
        mac: None,
        platform,
        capabilities,
        remote_interface,
    })
}

pub fn parse_lldp_neighbors(hostname: &str, text: &str) -> Parsed<NeighborRecord> {
    let mut parsed = Parsed::default();
    for block in blocks(text, "Chassis id:") {
        parsed.push(lldp_block(hostname, &block).map(Some));
    }
    parsed
}

fn lldp_block(hostname: &str, block: &[&str]) -> Result<NeighborRecord, ParseError> {
    let mut chassis_id = None;
    let mut port_id = None;
    let mut local_port = None;
    let mut system_name = None;
    let mut description = None;
    let mut capabilities = Vec::new();

    for line in block {
        if let Some(rest) = line.strip_prefix("Chassis id:") {
            chassis_id = text_value(rest);
        } else if let Some(rest) = line.strip_prefix("Port id:") {
            port_id = text_value(rest);
        } else if let Some(rest) = line.strip_prefix("Local Port id:") {
            local_port = text_value(rest);
        } else if let Some(rest) = line.strip_prefix("System Name:") {
            system_name = text_value(rest);
        } else if let Some(rest) = line.strip_prefix("System Description:") {
            description = text_value(rest);
        } else if let Some(rest) = line.strip_prefix("Enabled Capabilities:") {
            capabilities = rest
                .split(',')
                .filter_map(text_value)
                .collect();
        }
    }

    let interface = local_port.ok_or(ParseError::MissingField {
        origin: LLDP,
        field: "Local Port id",
    })?;
    let device_name = system_name
        .or_else(|| chassis_id.clone())
        .ok_or(ParseError::MissingField {
            origin: LLDP,
            field: "System Name",
        })?;
    Ok(NeighborRecord {
        interface: SwitchInterface::new(hostname, &interface),
        protocol: DiscoveryProtocol::Lldp,
        device_name,
        mac: MacAddress::parse_optional(chassis_id.as_deref()),
        platform: description,
        capabilities,
        remote_interface: port_id.map(|p| canonical_interface_name(&p)),
    })
}

/// Rows look like `*   10     0011.2233.4455   dynamic  0   F   F    Eth1/10`: the first token
/// that parses as a MAC is the address, the last token is the port.
pub fn parse_mac_table(hostname: &str, text: &str) -> Parsed<MacTableEntry> {
    let mut parsed = Parsed::default();
    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(mac_pos) = tokens.iter().position(|t| looks_like_mac(t)) else {
            continue;
        };
        parsed.push(mac_line(hostname, &tokens, mac_pos));
    }
    parsed
}

fn looks_like_mac(token: &str) -> bool {
    token.contains(['.', ':']) && token.len() >= 14
}

fn mac_line(hostname: &str, tokens: &[&str], mac_pos: usize) -> Result<Option<MacTableEntry>, ParseError> {
    let raw_mac = tokens[mac_pos];
    let mac: MacAddress = raw_mac.parse().map_err(|_| ParseError::InvalidMac {
        origin: MAC_TABLE,
        value: raw_mac.to_string(),
    })?;
    let port = match tokens.last() {
        Some(port) if tokens.len() - 1 > mac_pos => *port,
        _ => {
            return Err(ParseError::Malformed {
                origin: MAC_TABLE,
                detail: format!("no port after {raw_mac}"),
            });
        }
    };
    if is_internal_port(port) {
        return Ok(None);
    }
    let vlan = mac_pos
        .checked_sub(1)
        .and_then(|i| tokens[i].parse::<u16>().ok());
    Ok(Some(MacTableEntry {
        interface: SwitchInterface::new(hostname, port),
        mac,
        vlan,
    }))
}

/// Whitespace-separated tokens of `line` with their byte offsets.
fn token_spans(line: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, &line[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, &line[s..]));
    }
    spans
}

/// The state of a status row. Under a `Port ... Status ...` header the token in the Status
/// column is used, so a description such as `up` in the Name column is never taken for it.
fn row_state<'a>(tokens: &[(usize, &'a str)], status_column: Option<usize>) -> Option<&'a str> {
    match status_column {
        Some(column) => tokens
            .iter()
            .skip(1)
            .find(|(start, token)| start + token.len() > column)
            .map(|(_, token)| *token)
            .filter(|token| INTERFACE_STATES.contains(token)),
        None => tokens
            .iter()
            .skip(1)
            .map(|(_, token)| *token)
            .find(|token| INTERFACE_STATES.contains(token)),
    }
}

pub fn parse_interface_status(text: &str) -> Parsed<InterfaceStatus> {
    let mut parsed = Parsed::default();
    let mut status_column = None;
    for line in text.lines() {
        let tokens = token_spans(line);
        let Some(&(_, first)) = tokens.first() else {
            continue;
        };
        if first == "Port" {
            status_column = tokens
                .iter()
                .find(|(_, token)| *token == "Status")
                .map(|(start, _)| *start);
            continue;
        }
        let is_interface = first.starts_with(|c: char| c.is_ascii_alphabetic())
            && first.contains(|c: char| c.is_ascii_digit());
        if !is_interface {
            continue;
        }
        let state = row_state(&tokens, status_column).map(str::to_string);
        parsed.push(match state {
            Some(state) => Ok(Some(InterfaceStatus {
                interface: canonical_interface_name(first),
                state,
            })),
            None => Err(ParseError::Malformed {
                origin: INTERFACE_STATUS,
                detail: format!("no known state for {first}"),
            }),
        });
    }
    parsed
}
