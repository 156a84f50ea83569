/*!
Device source interface.

This module defines:
- `AcquisitionError`: why a single device poll produced nothing.
- `TopologyError`: the coarse per-device failure kept in the poll store and reported as a warning.
- `SwitchSource` / `BmcSource`: async traits that return one device's raw payload.

Transport clients (NX-API, SSH, Redfish) are adapted to these traits here; the poller only ever
sees trait objects, which keeps it testable with in-memory sources.
*/

use std::{fmt::Display, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    config::{BmcConfig, SwitchConfig},
    data_aquisition::{
        core::{RawBmcPayload, RawSwitchPayload},
        nxapi::{NxApiClient, NxApiError},
        redfish::{RedfishClient, RedfishError},
        ssh::{SshClient, SshError},
    },
    parsers::ParseError,
};

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error(transparent)]
    NxApi(#[from] NxApiError),
    #[error(transparent)]
    Ssh(#[from] SshError),
    #[error(transparent)]
    Redfish(#[from] RedfishError),
    #[error("timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),
    #[error("poll task failed: {0}")]
    Task(String),
    #[error("client setup failed: {0}")]
    Setup(String),
}

/// Error type for a device that contributes no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// Underlying data acquisition/IO/transport error.
    Acquisition(String),
    /// The device answered but its output could not be used.
    Protocol(String),
}

impl Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::Acquisition(msg) => write!(f, "acquisition error: {msg}"),
            TopologyError::Protocol(msg) => write!(f, "protocol error: {msg}"),
        }
    }
}

impl std::error::Error for TopologyError {}

impl From<AcquisitionError> for TopologyError {
    fn from(value: AcquisitionError) -> Self {
        TopologyError::Acquisition(value.to_string())
    }
}

impl From<ParseError> for TopologyError {
    fn from(value: ParseError) -> Self {
        TopologyError::Protocol(value.to_string())
    }
}

/// A switch that can be asked for its neighbor, MAC and interface data.
#[async_trait]
pub trait SwitchSource: Send + Sync {
    fn hostname(&self) -> &str;
    async fn fetch_raw(&self) -> Result<RawSwitchPayload, AcquisitionError>;
}

/// A BMC that can be asked for its system and NIC documents.
#[async_trait]
pub trait BmcSource: Send + Sync {
    fn address(&self) -> &str;
    async fn fetch_raw(&self) -> Result<RawBmcPayload, AcquisitionError>;
}

#[async_trait]
impl SwitchSource for NxApiClient {
    fn hostname(&self) -> &str {
        NxApiClient::hostname(self)
    }

    async fn fetch_raw(&self) -> Result<RawSwitchPayload, AcquisitionError> {
        Ok(RawSwitchPayload::NxApi(self.collect().await?))
    }
}

/// Opens a fresh SSH session per poll.
pub struct SshSwitch {
    config: SwitchConfig,
    timeout: Duration,
}

#[async_trait]
impl SwitchSource for SshSwitch {
    fn hostname(&self) -> &str {
        &self.config.hostname
    }

    async fn fetch_raw(&self) -> Result<RawSwitchPayload, AcquisitionError> {
        let client = SshClient::from_config(&self.config, self.timeout);
        Ok(RawSwitchPayload::Ssh(client.collect().await?))
    }
}

#[async_trait]
impl BmcSource for RedfishClient {
    fn address(&self) -> &str {
        RedfishClient::address(self)
    }

    async fn fetch_raw(&self) -> Result<RawBmcPayload, AcquisitionError> {
        Ok(self.collect().await?)
    }
}

/// Holds the slot of a device whose client could not be built. Every poll fails with the
/// setup error, so the device is reported unreachable like any other failure.
pub struct Unavailable {
    name: String,
    reason: String,
}

impl Unavailable {
    pub fn new(name: impl Into<String>, error: &AcquisitionError) -> Self {
        Self {
            name: name.into(),
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl SwitchSource for Unavailable {
    fn hostname(&self) -> &str {
        &self.name
    }

    async fn fetch_raw(&self) -> Result<RawSwitchPayload, AcquisitionError> {
        Err(AcquisitionError::Setup(self.reason.clone()))
    }
}

#[async_trait]
impl BmcSource for Unavailable {
    fn address(&self) -> &str {
        &self.name
    }

    async fn fetch_raw(&self) -> Result<RawBmcPayload, AcquisitionError> {
        Err(AcquisitionError::Setup(self.reason.clone()))
    }
}

/// Picks the transport configured for a switch. `timeout` bounds every blocking SSH operation.
pub fn switch_source(config: &SwitchConfig, timeout: Duration) -> Result<Box<dyn SwitchSource>, AcquisitionError> {
    if config.use_nxapi {
        Ok(Box::new(NxApiClient::new(config)?))
    } else {
        Ok(Box::new(SshSwitch {
            config: config.clone(),
            timeout,
        }))
    }
}

pub fn bmc_source(config: &BmcConfig) -> Result<Box<dyn BmcSource>, AcquisitionError> {
    Ok(Box::new(RedfishClient::new(config)?))
}
