use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::BmcConfig,
    data_aquisition::core::RawBmcPayload,
    network::endpoint::BmcType,
};

const REDFISH_ROOT: &str = "/redfish/v1/";

/// Paths tried in order when an iLO system document does not link its EthernetInterfaces,
/// or the linked collection is empty.
const ILO_FALLBACK_COLLECTIONS: [&str; 3] = [
    "Systems/1/BaseNetworkAdapters",
    "Systems/1/EthernetInterfaces",
    "Systems/1/NetworkAdapters",
];

/// Read-only Redfish client for iLO and iDRAC controllers.
pub struct RedfishClient {
    address: String,
    bmc_type: BmcType,
    base_url: String,
    username: String,
    password: String,
    client: Client,
}

#[derive(Debug, Error)]
pub enum RedfishError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GET {path} returned HTTP {status}")]
    Status { path: String, status: StatusCode },
}

impl RedfishClient {
    pub fn new(config: &BmcConfig) -> Result<Self, RedfishError> {
        // BMCs ship self-signed certificates
        let client = Client::builder().danger_accept_invalid_certs(true).build()?;
        Ok(Self {
            address: config.ip.clone(),
            bmc_type: config.bmc_type,
            base_url: format!("https://{}{}", config.ip, REDFISH_ROOT),
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn get(&self, path: &str) -> Result<Value, RedfishError> {
        let url = format!("{}{}", self.base_url, relative_path(path));
        debug!(bmc = %self.address, url = %url, "Redfish GET");
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RedfishError::Status {
                path: path.to_string(),
                status,
            });
        }
        Ok(response.json().await?)
    }

    /// Fetches every member of a collection. Members that fail to load are logged and skipped.
    async fn collection_members(&self, path: &str) -> Result<Vec<Value>, RedfishError> {
        let collection = self.get(path).await?;
        let mut members = Vec::new();
        for link in member_links(&collection) {
            match self.get(&link).await {
                Ok(member) => members.push(member),
                Err(e) => warn!(bmc = %self.address, member = %link, error = %e, "skipping interface"),
            }
        }
        Ok(members)
    }

    pub async fn collect(&self) -> Result<RawBmcPayload, RedfishError> {
        let (system, interfaces) = match self.bmc_type {
            BmcType::Ilo => self.collect_ilo().await?,
            BmcType::Idrac => {
                let system = self.get("Systems/System.Embedded.1").await?;
                let interfaces = self
                    .collection_members("Systems/System.Embedded.1/EthernetInterfaces")
                    .await?;
                (system, interfaces)
            }
        };
        debug!(bmc = %self.address, interfaces = interfaces.len(), "Redfish data collected");
        Ok(RawBmcPayload {
            address: self.address.clone(),
            bmc_type: self.bmc_type,
            system,
            interfaces,
        })
    }

    async fn collect_ilo(&self) -> Result<(Value, Vec<Value>), RedfishError> {
        let system = self.get("Systems/1").await?;
        if let Some(link) = system
            .pointer("/EthernetInterfaces/@odata.id")
            .and_then(Value::as_str)
        {
            match self.collection_members(link).await {
                Ok(members) if !members.is_empty() => return Ok((system, members)),
                Ok(_) => debug!(bmc = %self.address, "linked EthernetInterfaces collection is empty"),
                Err(e) => debug!(bmc = %self.address, error = %e, "linked EthernetInterfaces unavailable"),
            }
        }
        for path in ILO_FALLBACK_COLLECTIONS {
            match self.collection_members(path).await {
                Ok(members) if !members.is_empty() => return Ok((system, members)),
                Ok(_) => debug!(bmc = %self.address, path, "collection is empty"),
                Err(e) => debug!(bmc = %self.address, path, error = %e, "collection unavailable"),
            }
        }
        warn!(bmc = %self.address, "no network interfaces found");
        Ok((system, Vec::new()))
    }
}

/// `/redfish/v1/Systems/1/` -> `Systems/1/`. Paths already relative are returned as-is.
pub fn relative_path(path: &str) -> &str {
    match path.find(REDFISH_ROOT) {
        Some(pos) => &path[pos + REDFISH_ROOT.len()..],
        None => path.trim_start_matches('/'),
    }
}

/// The `@odata.id` of every member of a Redfish collection.
pub fn member_links(collection: &Value) -> Vec<String> {
    collection
        .get("Members")
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(|m| m.get("@odata.id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
