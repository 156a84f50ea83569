use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::SwitchConfig,
    data_aquisition::core::{CommandOutputs, SwitchCommand},
};

/// Client for the NX-API JSON-RPC endpoint (`/ins`) of a Nexus switch.
pub struct NxApiClient {
    hostname: String,
    url: String,
    username: String,
    password: String,
    client: Client,
}

#[derive(Debug, Error)]
pub enum NxApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("'{command}' returned HTTP {status}")]
    Status {
        command: &'static str,
        status: StatusCode,
    },
    #[error("'{command}' failed: {message} (code {code})")]
    Rpc {
        command: &'static str,
        code: i64,
        message: String,
    },
    #[error("'{command}' returned an unexpected response: {detail}")]
    Response {
        command: &'static str,
        detail: String,
    },
}

impl NxApiClient {
    pub fn new(config: &SwitchConfig) -> Result<Self, NxApiError> {
        let port = config.effective_port();
        let scheme = if port == 443 { "https" } else { "http" };
        // switches ship self-signed certificates
        let client = Client::builder().danger_accept_invalid_certs(true).build()?;
        Ok(Self {
            hostname: config.hostname.clone(),
            url: format!("{scheme}://{}:{port}/ins", config.ip),
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    async fn run(&self, command: SwitchCommand) -> Result<Value, NxApiError> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": "cli",
            "params": { "cmd": command.cli(), "version": 1 },
            "id": 1
        });
        debug!(switch = %self.hostname, command = command.cli(), "sending NX-API request");
        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, "application/json-rpc")
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body: Value = response.json().await?;
        // NX-API answers RPC errors with HTTP 500 and an error object; prefer the latter
        match extract_body(command, body) {
            Err(NxApiError::Response { .. }) if !status.is_success() => Err(NxApiError::Status {
                command: command.cli(),
                status,
            }),
            other => other,
        }
    }

    /// Runs every [`SwitchCommand`]. Only a failing optional command is tolerated.
    pub async fn collect(&self) -> Result<CommandOutputs<Value>, NxApiError> {
        let cdp_neighbors = self.run(SwitchCommand::CdpNeighbors).await?;
        let lldp_neighbors = self.run(SwitchCommand::LldpNeighbors).await?;
        let mac_table = self.run(SwitchCommand::MacTable).await?;
        let interface_status = match self.run(SwitchCommand::InterfaceStatus).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(switch = %self.hostname, error = %e, "interface status unavailable");
                None
            }
        };
        Ok(CommandOutputs {
            cdp_neighbors,
            lldp_neighbors,
            mac_table,
            interface_status,
        })
    }
}

/// Pulls the command body out of a JSON-RPC response.
///
/// A `null` result means the command printed nothing (e.g. no CDP neighbors) and yields a
/// `null` body.
pub fn extract_body(command: SwitchCommand, response: Value) -> Result<Value, NxApiError> {
    let cli = command.cli();
    let Value::Object(mut response) = response else {
        return Err(NxApiError::Response {
            command: cli,
            detail: "response is not an object".to_string(),
        });
    };
    if let Some(error) = response.remove("error") {
        let message = error
            .pointer("/data/msg")
            .or_else(|| error.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .trim()
            .to_string();
        return Err(NxApiError::Rpc {
            command: cli,
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message,
        });
    }
    let result = match response.remove("result") {
        None => {
            return Err(NxApiError::Response {
                command: cli,
                detail: "neither result nor error present".to_string(),
            });
        }
        Some(Value::Null) => return Ok(Value::Null),
        // batched requests answer with a list; we send one command at a time
        Some(Value::Array(mut items)) if !items.is_empty() => items.swap_remove(0),
        Some(other) => other,
    };
    match result {
        Value::Object(mut result) => Ok(result.remove("body").unwrap_or(Value::Null)),
        Value::Null => Ok(Value::Null),
        _ => Err(NxApiError::Response {
            command: cli,
            detail: "result is not an object".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_body() {
        let response = json!({
            "jsonrpc": "2.0",
            "result": { "body": { "TABLE_mac_address": {} } },
            "id": 1
        });
        let body = extract_body(SwitchCommand::MacTable, response).unwrap();
        assert!(body.get("TABLE_mac_address").is_some());
    }

    #[test]
    fn test_extract_null_result() {
        let response = json!({ "jsonrpc": "2.0", "result": null, "id": 1 });
        assert_eq!(extract_body(SwitchCommand::CdpNeighbors, response).unwrap(), Value::Null);
    }

    #[test]
    fn test_extract_rpc_error() {
        let response = json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32602,
                "message": "Invalid params",
                "data": { "msg": "% Invalid command\n" }
            },
            "id": 1
        });
        let err = extract_body(SwitchCommand::LldpNeighbors, response).unwrap_err();
        match err {
            NxApiError::Rpc { code, message, .. } => {
                assert_eq!(code, -32602);
                assert_eq!(message, "% Invalid command");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_url_scheme_follows_port() {
        let mut config = SwitchConfig {
            hostname: "nexus9k-1".into(),
            ip: "192.168.1.1".into(),
            username: "admin".into(),
            password: "password".into(),
            use_nxapi: true,
            port: None,
        };
        assert_eq!(NxApiClient::new(&config).unwrap().url, "http://192.168.1.1:80/ins");
        config.port = Some(443);
        assert_eq!(NxApiClient::new(&config).unwrap().url, "https://192.168.1.1:443/ins");
    }
}
