/*!
Non-fatal degradations collected during a run.

Every warning is logged when it is recorded and kept for the report, so nothing is silently
dropped.
*/

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    network::{mac::MacAddress, switch::SwitchInterface},
    topology::store::DeviceId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The device could not be polled; it contributes no data.
    Unreachable { device: DeviceId, reason: String },
    /// A single malformed record was skipped.
    RecordSkipped {
        device: DeviceId,
        source: String,
        reason: String,
    },
    /// CDP and LLDP name different neighbors on one interface. CDP was used.
    ProtocolDisagreement {
        interface: SwitchInterface,
        cdp: String,
        lldp: String,
    },
    /// Two BMC records claim the same MAC. The later one was kept.
    DuplicateMac {
        mac: MacAddress,
        kept: String,
        discarded: String,
    },
    /// A polled switch with no observed interfaces.
    IsolatedSwitch { hostname: String },
    /// A BMC did not report a host name; its address is used instead.
    MissingBmcHostname { device: DeviceId },
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Unreachable { device, reason } => {
                write!(f, "{device} unreachable: {reason}")
            }
            Warning::RecordSkipped {
                device,
                source,
                reason,
            } => write!(f, "{device}: skipped {source} record: {reason}"),
            Warning::ProtocolDisagreement {
                interface,
                cdp,
                lldp,
            } => write!(
                f,
                "{interface}: CDP reports '{cdp}' but LLDP reports '{lldp}', using CDP"
            ),
            Warning::DuplicateMac {
                mac,
                kept,
                discarded,
            } => write!(
                f,
                "MAC {mac} reported by both '{discarded}' and '{kept}', using '{kept}'"
            ),
            Warning::IsolatedSwitch { hostname } => {
                write!(f, "switch {hostname} has no observed connections")
            }
            Warning::MissingBmcHostname { device } => {
                write!(f, "{device} reported no host name")
            }
        }
    }
}

impl Warning {
    fn log(&self) {
        match self {
            Warning::Unreachable { device, reason } => {
                warn!(device = %device, reason = %reason, "device unreachable")
            }
            Warning::RecordSkipped {
                device,
                source,
                reason,
            } => warn!(device = %device, source = %source, reason = %reason, "skipped malformed record"),
            Warning::ProtocolDisagreement {
                interface,
                cdp,
                lldp,
            } => warn!(
                switch = %interface.switch,
                interface = %interface.name,
                cdp = %cdp,
                lldp = %lldp,
                "CDP and LLDP disagree on neighbor, using CDP"
            ),
            Warning::DuplicateMac {
                mac,
                kept,
                discarded,
            } => warn!(mac = %mac, kept = %kept, discarded = %discarded, "duplicate BMC MAC"),
            Warning::IsolatedSwitch { hostname } => {
                warn!(switch = %hostname, "switch has no observed connections")
            }
            Warning::MissingBmcHostname { device } => {
                warn!(device = %device, "BMC reported no host name")
            }
        }
    }
}

/// Collects warnings in the order they occur, logging each one.
#[derive(Debug, Clone, Default)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn push(&mut self, warning: Warning) {
        warning.log();
        self.0.push(warning);
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.0
    }
}
