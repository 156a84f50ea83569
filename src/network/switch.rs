use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
};

use serde::{Deserialize, Serialize};

/// One physical port on one switch. The interface name is canonicalized on construction, so
/// `Ethernet1/1` (CDP) and `Eth1/1` (LLDP, MAC table) produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SwitchInterface {
    pub switch: String,
    pub name: String,
}

impl SwitchInterface {
    pub fn new(switch: impl Into<String>, name: &str) -> Self {
        Self {
            switch: switch.into(),
            name: canonical_interface_name(name),
        }
    }
}

impl Display for SwitchInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.switch, self.name)
    }
}

const INTERFACE_PREFIXES: [(&str, &str); 4] = [
    ("ethernet", "Eth"),
    ("port-channel", "Po"),
    ("eth", "Eth"),
    ("po", "Po"),
];

/// Rewrites NX-OS interface names to their short form (`Ethernet1/10` -> `Eth1/10`,
/// `port-channel10` -> `Po10`). Names with any other prefix are only trimmed.
pub fn canonical_interface_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    for (long, short) in INTERFACE_PREFIXES {
        if let Some(rest) = lower.strip_prefix(long) {
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                return format!("{short}{}", &trimmed[long.len()..]);
            }
        }
    }
    trimmed.to_string()
}

/// Normalizes a device name reported by CDP/LLDP for comparison: trims, drops the
/// `(serial)` suffix NX-OS appends to CDP device ids and lowercases.
pub fn normalize_device_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_serial = match trimmed.find('(') {
        Some(pos) if trimmed.ends_with(')') => trimmed[..pos].trim_end(),
        _ => trimmed,
    };
    without_serial.to_ascii_lowercase()
}

fn short_name(normalized: &str) -> &str {
    normalized.split('.').next().unwrap_or(normalized)
}

/// The configured switch hostnames, used to decide whether a neighbor is another switch.
///
/// Matching is case-insensitive and tolerates FQDN vs short name on either side. A short
/// name shared by two configured switches is ambiguous and only matches by full name.
#[derive(Debug, Clone, Default)]
pub struct KnownSwitches {
    by_full_name: HashMap<String, String>,
    by_short_name: HashMap<String, String>,
    ambiguous_short: HashSet<String>,
}

impl KnownSwitches {
    pub fn new<I, S>(hostnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut known = Self::default();
        for hostname in hostnames {
            let configured = hostname.as_ref().trim().to_string();
            let normalized = normalize_device_name(&configured);
            let short = short_name(&normalized).to_string();

            known.by_full_name.insert(normalized, configured.clone());
            if known.ambiguous_short.contains(&short) {
                continue;
            }
            match known.by_short_name.get(&short) {
                Some(existing) if *existing != configured => {
                    known.by_short_name.remove(&short);
                    known.ambiguous_short.insert(short);
                }
                _ => {
                    known.by_short_name.insert(short, configured);
                }
            }
        }
        known
    }

    /// Returns the configured hostname a reported neighbor name refers to, if any.
    pub fn resolve(&self, reported: &str) -> Option<&str> {
        let normalized = normalize_device_name(reported);
        if normalized.is_empty() {
            return None;
        }
        if let Some(configured) = self.by_full_name.get(&normalized) {
            return Some(configured);
        }
        self.by_short_name
            .get(short_name(&normalized))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_names_are_canonicalized() {
        assert_eq!(canonical_interface_name("Ethernet1/10"), "Eth1/10");
        assert_eq!(canonical_interface_name("eth1/10"), "Eth1/10");
        assert_eq!(canonical_interface_name(" Eth1/1/2 "), "Eth1/1/2");
        assert_eq!(canonical_interface_name("port-channel10"), "Po10");
        assert_eq!(canonical_interface_name("Po10"), "Po10");
        assert_eq!(canonical_interface_name("mgmt0"), "mgmt0");
        assert_eq!(canonical_interface_name("power-supply"), "power-supply");
        assert_eq!(
            SwitchInterface::new("nexus9k-1", "Ethernet1/1"),
            SwitchInterface::new("nexus9k-1", "Eth1/1")
        );
    }

    #[test]
    fn test_device_name_normalization() {
        assert_eq!(normalize_device_name("nexus9k-2(FDO21120U8N)"), "nexus9k-2");
        assert_eq!(normalize_device_name(" NEXUS9K-2.example.com "), "nexus9k-2.example.com");
        assert_eq!(normalize_device_name("weird(name"), "weird(name");
    }

    #[test]
    fn test_known_switch_matching() {
        let known = KnownSwitches::new(["nexus9k-1", "nexus9k-2.dc1.example.com"]);
        assert_eq!(known.resolve("nexus9k-1"), Some("nexus9k-1"));
        assert_eq!(known.resolve("NEXUS9K-1(FDO1234)"), Some("nexus9k-1"));
        assert_eq!(known.resolve("nexus9k-1.dc1.example.com"), Some("nexus9k-1"));
        assert_eq!(known.resolve("nexus9k-2"), Some("nexus9k-2.dc1.example.com"));
        assert_eq!(known.resolve("server1.example.com"), None);
        assert_eq!(known.resolve(""), None);
    }

    #[test]
    fn test_ambiguous_short_names_require_full_match() {
        let known = KnownSwitches::new(["leaf1.dc1", "leaf1.dc2"]);
        assert_eq!(known.resolve("leaf1"), None);
        assert_eq!(known.resolve("leaf1.dc2"), Some("leaf1.dc2"));
    }
}
