use std::collections::HashMap;

use tracing::debug;

use crate::{
    network::{endpoint::BmcIdentity, mac::MacAddress},
    topology::warning::{Warning, Warnings},
};

/// Lookup from a NIC MAC to the server identity its BMC reported.
///
/// Identities are added in BMC configuration order. A MAC claimed again under the same
/// host name is a harmless duplicate; under a different host name the later claim wins and a
/// [`Warning::DuplicateMac`] is recorded.
#[derive(Debug, Default)]
pub struct MacIdentityResolver {
    by_mac: HashMap<MacAddress, BmcIdentity>,
}

impl MacIdentityResolver {
    pub fn build<I>(identities: I, warnings: &mut Warnings) -> Self
    where
        I: IntoIterator<Item = BmcIdentity>,
    {
        let mut resolver = Self::default();
        for identity in identities {
            resolver.insert(identity, warnings);
        }
        debug!(macs = resolver.by_mac.len(), "MAC identity map built");
        resolver
    }

    fn insert(&mut self, identity: BmcIdentity, warnings: &mut Warnings) {
        match self.by_mac.get(&identity.mac) {
            Some(existing) if existing.hostname.eq_ignore_ascii_case(&identity.hostname) => {}
            Some(existing) => {
                warnings.push(Warning::DuplicateMac {
                    mac: identity.mac,
                    kept: identity.hostname.clone(),
                    discarded: existing.hostname.clone(),
                });
                self.by_mac.insert(identity.mac, identity);
            }
            None => {
                self.by_mac.insert(identity.mac, identity);
            }
        }
    }

    pub fn resolve(&self, mac: &MacAddress) -> Option<&BmcIdentity> {
        self.by_mac.get(mac)
    }
}
