/*!
YAML configuration: the switches and BMCs to poll and the poller settings.

```yaml
switches:
  - hostname: nexus9k-1
    ip: 192.168.1.1
    username: admin
    password: password
    use_nxapi: true
    port: 80
bmcs:
  - ip: 192.168.1.100
    username: admin
    password: password
    type: ilo
polling:
  workers: 8
  timeout: 30s
```

Every problem found here is fatal: nothing is polled with a configuration that failed
[`Config::validate`].
*/

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::network::{endpoint::BmcType, switch::KnownSwitches};

const NXAPI_DEFAULT_PORT: u16 = 80;
const SSH_DEFAULT_PORT: u16 = 22;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("refusing to overwrite existing file {0}")]
    AlreadyExists(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchConfig {
    pub hostname: String,
    pub ip: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_use_nxapi")]
    pub use_nxapi: bool,
    /// Defaults to 80 for NX-API and 22 for SSH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

fn default_use_nxapi() -> bool {
    true
}

impl SwitchConfig {
    pub fn effective_port(&self) -> u16 {
        match (self.port, self.use_nxapi) {
            (Some(port), _) => port,
            (None, true) => NXAPI_DEFAULT_PORT,
            (None, false) => SSH_DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BmcConfig {
    pub ip: String,
    pub username: String,
    pub password: String,
    #[serde(rename = "type")]
    pub bmc_type: BmcType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Upper bound on concurrently running device polls.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Per-device deadline, in humantime syntax (`30s`, `1m 30s`).
    #[serde(default = "default_timeout", with = "humantime_duration")]
    pub timeout: Duration,
}

fn default_workers() -> usize {
    8
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout: default_timeout(),
        }
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub switches: Vec<SwitchConfig>,
    #[serde(default)]
    pub bmcs: Vec<BmcConfig>,
    #[serde(default)]
    pub polling: PollingConfig,
}

impl Default for Config {
    /// The starter configuration written by `--init`.
    fn default() -> Self {
        Self {
            switches: vec![SwitchConfig {
                hostname: "nexus9k-1".to_string(),
                ip: "192.168.1.1".to_string(),
                username: "admin".to_string(),
                password: "password".to_string(),
                use_nxapi: true,
                port: Some(NXAPI_DEFAULT_PORT),
            }],
            bmcs: vec![BmcConfig {
                ip: "192.168.1.100".to_string(),
                username: "admin".to_string(),
                password: "password".to_string(),
                bmc_type: BmcType::Ilo,
            }],
            polling: PollingConfig::default(),
        }
    }
}

impl Config {
    /// Reads, parses and validates the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!(
            path = %path.display(),
            switches = config.switches.len(),
            bmcs = config.bmcs.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Writes the default configuration to `path`. Never overwrites an existing file.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        let yaml = serde_yaml::to_string(&Config::default()).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "default configuration written");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.switches.is_empty() {
            return Err(ConfigError::Invalid("no switches configured".to_string()));
        }
        let mut seen = HashSet::new();
        for (i, switch) in self.switches.iter().enumerate() {
            let hostname = switch.hostname.trim();
            if hostname.is_empty() {
                return Err(ConfigError::Invalid(format!("switch #{} has an empty hostname", i + 1)));
            }
            if !seen.insert(hostname.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!("duplicate switch hostname '{hostname}'")));
            }
            require("switch", hostname, "ip", &switch.ip)?;
            require("switch", hostname, "username", &switch.username)?;
            require("switch", hostname, "password", &switch.password)?;
            if switch.port == Some(0) {
                return Err(ConfigError::Invalid(format!("switch '{hostname}' has port 0")));
            }
        }
        for (i, bmc) in self.bmcs.iter().enumerate() {
            let label = format!("#{}", i + 1);
            require("BMC", &label, "ip", &bmc.ip)?;
            require("BMC", &bmc.ip, "username", &bmc.username)?;
            require("BMC", &bmc.ip, "password", &bmc.password)?;
        }
        if self.polling.workers == 0 {
            return Err(ConfigError::Invalid("polling.workers must be at least 1".to_string()));
        }
        if self.polling.timeout.is_zero() {
            return Err(ConfigError::Invalid("polling.timeout must be positive".to_string()));
        }
        Ok(())
    }

    pub fn known_switches(&self) -> KnownSwitches {
        KnownSwitches::new(self.switches.iter().map(|s| s.hostname.as_str()))
    }
}

fn require(kind: &str, device: &str, field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{kind} '{device}' has an empty {field}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_load_fixture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(include_str!("../test_data/config.yaml").as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.switches.len(), 2);
        assert_eq!(config.switches[0].effective_port(), 80);
        assert!(!config.switches[1].use_nxapi);
        assert_eq!(config.switches[1].effective_port(), 22);
        assert_eq!(config.bmcs.len(), 2);
        assert_eq!(config.bmcs[1].bmc_type, BmcType::Idrac);
        assert_eq!(config.polling.workers, 4);
        assert_eq!(config.polling.timeout, Duration::from_secs(90));
        assert_eq!(config.known_switches().resolve("NEXUS9K-2"), Some("nexus9k-2"));
    }

    #[test]
    fn test_polling_defaults() {
        let config = parse(
            "switches:\n  - {hostname: s1, ip: 10.0.0.1, username: u, password: p}\n",
        );
        assert!(config.switches[0].use_nxapi);
        assert_eq!(config.polling, PollingConfig::default());
        assert!(config.bmcs.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_unknown_bmc_type_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "switches:\n  - {{hostname: s1, ip: 10.0.0.1, username: u, password: p}}\nbmcs:\n  - {{ip: 10.0.0.9, username: u, password: p, type: imm}}\n"
        )
        .unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validation_errors() {
        let base = "  - {hostname: s1, ip: 10.0.0.1, username: u, password: p}\n";
        let cases = [
            "switches: []\n".to_string(),
            format!("switches:\n{base}  - {{hostname: S1, ip: 10.0.0.2, username: u, password: p}}\n"),
            "switches:\n  - {hostname: ' ', ip: 10.0.0.1, username: u, password: p}\n".to_string(),
            "switches:\n  - {hostname: s1, ip: 10.0.0.1, username: u, password: ''}\n".to_string(),
            format!("switches:\n{base}bmcs:\n  - {{ip: 10.0.0.9, username: '', password: p, type: ilo}}\n"),
            format!("switches:\n{base}polling: {{workers: 0}}\n"),
            format!("switches:\n{base}polling: {{timeout: 0s}}\n"),
        ];
        for case in cases {
            let config = parse(&case);
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "accepted: {case}"
            );
        }
    }

    #[test]
    fn test_write_default_round_trips_and_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        Config::write_default(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, Config::default());
        assert!(matches!(
            Config::write_default(&path),
            Err(ConfigError::AlreadyExists(_))
        ));
    }
}
