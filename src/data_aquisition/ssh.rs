use std::{
    io::Read,
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use ssh2::{Channel, DisconnectCode, Session};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::SwitchConfig,
    data_aquisition::core::{CommandOutputs, SwitchCommand},
};

#[derive(Debug, Error)]
pub enum SshError {
    #[error("cannot resolve {0}")]
    Resolve(String),
    #[error("cannot reach {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },
    #[error("SSH session error: {0}")]
    Session(#[from] ssh2::Error),
    #[error("authentication failed for user '{0}'")]
    Auth(String),
    #[error("'{command}' failed: {detail}")]
    Command { command: &'static str, detail: String },
    #[error("blocking SSH task failed: {0}")]
    Task(String),
}

/// SSH transport for switches without NX-API.
///
/// `ssh2` is blocking, so one poll is a single `spawn_blocking` job: connect, run every
/// [`SwitchCommand`], disconnect. Nothing is kept open between polls.
///
/// A blocking job cannot be cancelled from the async side, so the connect and every session
/// operation carry their own `timeout`; a silent device frees its thread once it expires.
#[derive(Debug, Clone)]
pub struct SshClient {
    host: String,
    port: u16,
    username: String,
    password: String,
    timeout: Duration,
}

impl SshClient {
    pub fn from_config(config: &SwitchConfig, timeout: Duration) -> Self {
        Self {
            host: config.ip.clone(),
            port: config.effective_port(),
            username: config.username.clone(),
            password: config.password.clone(),
            timeout,
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn open(&self) -> Result<Session, SshError> {
        let address = self.address();
        debug!(%address, "opening SSH session");
        let socket_addr = address
            .to_socket_addrs()
            .map_err(|source| SshError::Connect {
                address: address.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| SshError::Resolve(address.clone()))?;
        let tcp = TcpStream::connect_timeout(&socket_addr, self.timeout)
            .map_err(|source| SshError::Connect { address, source })?;
        let mut session = Session::new()?;
        // libssh2 treats 0 as "wait forever"
        session.set_timeout(self.timeout.as_millis().clamp(1, u32::MAX as u128) as u32);
        session.set_tcp_stream(tcp);
        session.handshake()?;
        session
            .userauth_password(&self.username, &self.password)
            .map_err(|_| SshError::Auth(self.username.clone()))?;
        if !session.authenticated() {
            return Err(SshError::Auth(self.username.clone()));
        }
        Ok(session)
    }

    fn run(session: &Session, command: SwitchCommand) -> Result<String, SshError> {
        let cli = command.cli();
        let failed = |detail: String| SshError::Command { command: cli, detail };

        let mut channel: Channel = session.channel_session()?;
        channel.exec(cli).map_err(|e| failed(e.to_string()))?;
        let mut output = String::new();
        channel.read_to_string(&mut output).map_err(|e| failed(e.to_string()))?;
        channel.wait_close()?;
        match channel.exit_status() {
            // some NX-OS images never send an exit status
            Ok(0) | Err(_) => Ok(output),
            Ok(code) => Err(failed(format!("exit status {code}"))),
        }
    }

    fn collect_blocking(&self) -> Result<CommandOutputs<String>, SshError> {
        let session = self.open()?;
        let cdp_neighbors = Self::run(&session, SwitchCommand::CdpNeighbors)?;
        let lldp_neighbors = Self::run(&session, SwitchCommand::LldpNeighbors)?;
        let mac_table = Self::run(&session, SwitchCommand::MacTable)?;
        let interface_status = match Self::run(&session, SwitchCommand::InterfaceStatus) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(host = %self.host, error = %e, "interface status unavailable");
                None
            }
        };
        if let Err(e) = session.disconnect(Some(DisconnectCode::ByApplication), "", None) {
            debug!(host = %self.host, error = %e, "SSH disconnect failed");
        }
        Ok(CommandOutputs {
            cdp_neighbors,
            lldp_neighbors,
            mac_table,
            interface_status,
        })
    }

    /// Runs every switch command over one session. Only the interface status command may fail.
    pub async fn collect(&self) -> Result<CommandOutputs<String>, SshError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.collect_blocking())
            .await
            .map_err(|e| SshError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEADLINE: Duration = Duration::from_millis(300);

    fn config(port: Option<u16>) -> SwitchConfig {
        SwitchConfig {
            hostname: "nexus9k-2".into(),
            ip: "127.0.0.1".into(),
            username: "admin".into(),
            password: "password".into(),
            use_nxapi: false,
            port,
        }
    }

    #[tokio::test]
    async fn test_refused_connection() {
        // nothing listens on the discard port in the test environment
        let client = SshClient::from_config(&config(Some(9)), DEADLINE);
        let err = client.collect().await.unwrap_err();
        assert!(matches!(&err, SshError::Connect { address, .. } if address == "127.0.0.1:9"), "{err}");
    }

    #[tokio::test]
    async fn test_silent_server_releases_the_blocking_job() {
        // accepts TCP but never sends an SSH banner
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = SshClient::from_config(&config(Some(port)), DEADLINE);

        let started = std::time::Instant::now();
        let finished = tokio::time::timeout(Duration::from_secs(5), client.collect()).await;
        assert!(matches!(finished, Ok(Err(_))), "blocking job did not give up");
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(listener);
    }

    #[test]
    fn test_default_port() {
        let client = SshClient::from_config(&config(None), DEADLINE);
        assert_eq!(client.address(), "127.0.0.1:22");
    }

    #[test]
    fn test_command_error_names_the_command() {
        let err = SshError::Command {
            command: SwitchCommand::MacTable.cli(),
            detail: "exit status 1".into(),
        };
        assert_eq!(err.to_string(), format!("'{}' failed: exit status 1", SwitchCommand::MacTable.cli()));
    }
}
