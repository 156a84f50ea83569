/*!
Turns Redfish documents fetched from an iLO or iDRAC into [`BmcIdentity`] records: one per NIC
MAC, all carrying the system's host name.
*/

use serde_json::Value;
use tracing::debug;

use crate::{
    data_aquisition::core::RawBmcPayload,
    network::{endpoint::BmcIdentity, mac::MacAddress},
    parsers::{ParseError, Parsed, present},
};

const REDFISH: &str = "Redfish";

/// iLO spells it `MACAddress`, iDRAC `MacAddress`; `PermanentMACAddress` is the last resort.
const MAC_KEYS: [&str; 3] = ["MACAddress", "MacAddress", "PermanentMACAddress"];

#[derive(Debug, Clone)]
pub struct BmcRecords {
    pub identities: Parsed<BmcIdentity>,
    /// True when the system document carried no `HostName` and the BMC address was used.
    pub hostname_missing: bool,
}

pub fn parse_bmc(payload: &RawBmcPayload) -> Result<BmcRecords, ParseError> {
    let Value::Object(system) = &payload.system else {
        return Err(ParseError::Rejected {
            origin: REDFISH,
            detail: "system document is not an object".to_string(),
        });
    };
    let reported = present(system.get("HostName").and_then(Value::as_str));
    let hostname_missing = reported.is_none();
    let hostname = reported.unwrap_or_else(|| payload.address.clone());

    let mut identities = Parsed::default();
    for member in &payload.interfaces {
        identities.push(interface_identity(payload, &hostname, member));
    }
    Ok(BmcRecords {
        identities,
        hostname_missing,
    })
}

fn interface_identity(
    payload: &RawBmcPayload,
    hostname: &str,
    member: &Value,
) -> Result<Option<BmcIdentity>, ParseError> {
    if !member.is_object() {
        return Err(ParseError::Malformed {
            origin: REDFISH,
            detail: "EthernetInterface member is not an object".to_string(),
        });
    }
    let raw_mac = MAC_KEYS
        .iter()
        .find_map(|key| present(member.get(*key).and_then(Value::as_str)));
    let Some(raw_mac) = raw_mac else {
        debug!(
            bmc = %payload.address,
            interface = member.get("Name").and_then(|v| v.as_str()).unwrap_or("?"),
            "interface without MAC address, skipping"
        );
        return Ok(None);
    };
    let mac: MacAddress = raw_mac.parse().map_err(|_| ParseError::InvalidMac {
        origin: REDFISH,
        value: raw_mac.clone(),
    })?;
    Ok(Some(BmcIdentity {
        mac,
        hostname: hostname.to_string(),
        bmc_type: payload.bmc_type,
        source: payload.address.clone(),
    }))
}
