/*!
This module provides storage for the raw data collected during one polling run.

This module defines:
- `DeviceId`: identifies a polled switch or BMC in warnings and logs
- `SourceHealth`: Represents a device's poll outcome
- `SourceState`: Holds a device's health and, when it answered, its raw payload
- `PollStore`: One slot per configured device, in configuration order

The store is filled once by the poller after its join barrier and then turned into the
correlation input, which is where the raw payloads are normalized.
*/

use std::{fmt::Display, time::SystemTime};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    data_aquisition::core::{RawBmcPayload, RawSwitchPayload},
    parsers::{ParseError, normalize_switch, redfish::parse_bmc},
    topology::{
        correlation::{CorrelationInput, SwitchObservation},
        source::TopologyError,
        warning::{Warning, Warnings},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum DeviceId {
    Switch(String),
    Bmc(String),
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceId::Switch(hostname) => write!(f, "switch {hostname}"),
            DeviceId::Bmc(address) => write!(f, "BMC {address}"),
        }
    }
}

/// Represents a device's poll outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceHealth {
    Connected,
    Lost,
}

impl Display for SourceHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceHealth::Connected => write!(f, "Connected"),
            SourceHealth::Lost => write!(f, "Lost"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceState<T> {
    pub id: DeviceId,
    pub health: SourceHealth,
    pub payload: Option<T>,
    pub error: Option<TopologyError>,
    pub last_status_change: SystemTime,
}

impl<T> SourceState<T> {
    fn pending(id: DeviceId) -> Self {
        Self {
            id,
            health: SourceHealth::Lost,
            payload: None,
            error: Some(TopologyError::Acquisition("not polled".to_string())),
            last_status_change: SystemTime::now(),
        }
    }

    fn replace_payload(&mut self, payload: T, timestamp: SystemTime) {
        self.payload = Some(payload);
        self.health = SourceHealth::Connected;
        self.error = None;
        self.last_status_change = timestamp;
    }

    fn mark_lost(&mut self, error: TopologyError, timestamp: SystemTime) {
        self.payload = None;
        self.health = SourceHealth::Lost;
        self.error = Some(error);
        self.last_status_change = timestamp;
    }
}

/// Raw results of one polling run, one slot per configured device.
#[derive(Debug, Clone)]
pub struct PollStore {
    switches: Vec<SourceState<RawSwitchPayload>>,
    bmcs: Vec<SourceState<RawBmcPayload>>,
}

impl PollStore {
    /// Creates a slot for every device. Slots start out lost until a result is recorded.
    pub fn new<S, B>(switch_hostnames: S, bmc_addresses: B) -> Self
    where
        S: IntoIterator<Item = String>,
        B: IntoIterator<Item = String>,
    {
        Self {
            switches: switch_hostnames
                .into_iter()
                .map(|h| SourceState::pending(DeviceId::Switch(h)))
                .collect(),
            bmcs: bmc_addresses
                .into_iter()
                .map(|a| SourceState::pending(DeviceId::Bmc(a)))
                .collect(),
        }
    }

    pub fn switches(&self) -> &[SourceState<RawSwitchPayload>] {
        &self.switches
    }

    pub fn bmcs(&self) -> &[SourceState<RawBmcPayload>] {
        &self.bmcs
    }

    /// Records the outcome of the switch poll in slot `index`. Out-of-range indices are ignored.
    pub fn record_switch(&mut self, index: usize, result: Result<RawSwitchPayload, TopologyError>, timestamp: SystemTime) {
        if let Some(slot) = self.switches.get_mut(index) {
            match result {
                Ok(payload) => slot.replace_payload(payload, timestamp),
                Err(e) => slot.mark_lost(e, timestamp),
            }
        }
    }

    pub fn record_bmc(&mut self, index: usize, result: Result<RawBmcPayload, TopologyError>, timestamp: SystemTime) {
        if let Some(slot) = self.bmcs.get_mut(index) {
            match result {
                Ok(payload) => slot.replace_payload(payload, timestamp),
                Err(e) => slot.mark_lost(e, timestamp),
            }
        }
    }

    pub fn connected_count(&self) -> usize {
        self.switches
            .iter()
            .filter(|s| s.health == SourceHealth::Connected)
            .count()
            + self
                .bmcs
                .iter()
                .filter(|s| s.health == SourceHealth::Connected)
                .count()
    }

    /// Normalizes every payload and collects the degradations as warnings.
    ///
    /// A lost device, or one whose payload cannot be used at all, becomes an `Unreachable`
    /// warning. Single bad records become `RecordSkipped` warnings.
    pub fn into_correlation_input(self) -> CorrelationInput {
        let mut warnings = Warnings::default();
        let mut switches = Vec::with_capacity(self.switches.len());
        for slot in self.switches {
            let DeviceId::Switch(hostname) = &slot.id else {
                continue;
            };
            let hostname = hostname.clone();
            let records = match usable_payload(slot.payload, slot.error) {
                Ok(payload) => match normalize_switch(&hostname, &payload) {
                    Ok(records) => {
                        debug!(
                            switch = %hostname,
                            transport = payload.transport(),
                            neighbors = records.neighbors.len(),
                            macs = records.mac_table.len(),
                            "switch output normalized"
                        );
                        record_skipped(&mut warnings, &slot.id, &records.skipped);
                        Some(records)
                    }
                    Err(e) => {
                        push_unreachable(&mut warnings, &slot.id, TopologyError::from(e));
                        None
                    }
                },
                Err(e) => {
                    push_unreachable(&mut warnings, &slot.id, e);
                    None
                }
            };
            switches.push(SwitchObservation { hostname, records });
        }

        let mut bmc_identities = Vec::new();
        for slot in self.bmcs {
            let payload = match usable_payload(slot.payload, slot.error) {
                Ok(payload) => payload,
                Err(e) => {
                    push_unreachable(&mut warnings, &slot.id, e);
                    continue;
                }
            };
            match parse_bmc(&payload) {
                Ok(records) => {
                    if records.hostname_missing {
                        warnings.push(Warning::MissingBmcHostname {
                            device: slot.id.clone(),
                        });
                    }
                    record_skipped(&mut warnings, &slot.id, &records.identities.skipped);
                    bmc_identities.extend(records.identities.records);
                }
                Err(e) => push_unreachable(&mut warnings, &slot.id, TopologyError::from(e)),
            }
        }

        CorrelationInput {
            switches,
            bmc_identities,
            warnings,
        }
    }
}

fn usable_payload<T>(payload: Option<T>, error: Option<TopologyError>) -> Result<T, TopologyError> {
    match (payload, error) {
        (Some(payload), _) => Ok(payload),
        (None, Some(e)) => Err(e),
        (None, None) => Err(TopologyError::Acquisition("no data".to_string())),
    }
}

fn push_unreachable(warnings: &mut Warnings, device: &DeviceId, error: TopologyError) {
    warnings.push(Warning::Unreachable {
        device: device.clone(),
        reason: error.to_string(),
    });
}

fn record_skipped(warnings: &mut Warnings, device: &DeviceId, skipped: &[ParseError]) {
    for e in skipped {
        warnings.push(Warning::RecordSkipped {
            device: device.clone(),
            source: e.source_label().to_string(),
            reason: e.to_string(),
        });
    }
}
