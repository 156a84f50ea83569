/*!
The correlation engine: turns normalized switch and BMC data into a [`TopologyGraph`].

Every interface with at least one observation is classified in priority order:

1. the authoritative neighbor record (CDP, else LLDP) names a configured switch: `Switch`;
2. a MAC seen on the interface belongs to a BMC-reported NIC: one `Server` per host name;
3. anything else that was seen: `Unknown`, carrying the first MAC and the reported name.

Switch endpoints are then reconciled into links, pairing the two ends of a cable when both
switches reported it.
*/

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::{
    network::{
        edge::{LinkSide, SwitchLink},
        endpoint::{
            BmcIdentity, DiscoveryProtocol, Endpoint, NeighborRecord, ServerEndpoint, SwitchEndpoint,
            UnknownEndpoint,
        },
        mac::MacAddress,
        network_graph::{InterfaceView, TopologyBuilder, TopologyGraph},
        node::SwitchStatus,
        switch::{KnownSwitches, SwitchInterface, normalize_device_name},
    },
    parsers::SwitchRecords,
    topology::{
        resolver::MacIdentityResolver,
        warning::{Warning, Warnings},
    },
};

/// Normalized data for one configured switch. `records` is `None` when the switch could not be
/// polled.
#[derive(Debug, Clone)]
pub struct SwitchObservation {
    pub hostname: String,
    pub records: Option<SwitchRecords>,
}

#[derive(Debug, Default)]
pub struct CorrelationInput {
    pub switches: Vec<SwitchObservation>,
    /// In BMC configuration order; later entries win MAC conflicts.
    pub bmc_identities: Vec<BmcIdentity>,
    /// Degradations collected before correlation (unreachable devices, skipped records).
    pub warnings: Warnings,
}

pub struct CorrelationEngine {
    known: KnownSwitches,
}

/// One side's claim that an interface connects to another configured switch.
#[derive(Debug, Clone)]
struct SwitchEdge {
    local: SwitchInterface,
    peer: String,
    remote_port: Option<String>,
    protocols: Vec<DiscoveryProtocol>,
}

impl SwitchEdge {
    fn side(&self) -> LinkSide {
        LinkSide {
            interface: self.local.clone(),
            protocols: self.protocols.clone(),
        }
    }
}

impl CorrelationEngine {
    pub fn new(known: KnownSwitches) -> Self {
        Self { known }
    }

    pub fn correlate(&self, input: CorrelationInput) -> TopologyGraph {
        let CorrelationInput {
            switches,
            bmc_identities,
            mut warnings,
        } = input;
        let resolver = MacIdentityResolver::build(bmc_identities, &mut warnings);

        let mut builder = TopologyBuilder::default();
        let mut switch_edges = Vec::new();
        for observation in switches {
            let hostname = observation.hostname;
            let Some(records) = observation.records else {
                builder.add_switch(&hostname, SwitchStatus::Unreachable);
                continue;
            };

            let views = interface_views(&hostname, records);
            let status = if views.values().any(InterfaceView::has_observations) {
                SwitchStatus::Polled
            } else {
                warnings.push(Warning::IsolatedSwitch {
                    hostname: hostname.clone(),
                });
                SwitchStatus::Isolated
            };
            builder.add_switch(&hostname, status);

            for mut view in views.into_values() {
                view.endpoints = self.classify(&view, &resolver, &mut warnings);
                if let Some(edge) = self.switch_edge(&view) {
                    switch_edges.push(edge);
                }
                builder.add_interface(view);
            }
        }

        for link in reconcile(switch_edges) {
            builder.add_link(link);
        }
        builder.set_warnings(warnings.into_vec());
        let topology = builder.build();
        info!(
            switches = topology.switches().count(),
            links = topology.switch_links().len(),
            servers = topology.server_edges().len(),
            unknown = topology.unknown_edges().len(),
            warnings = topology.warnings().len(),
            "correlation complete"
        );
        topology
    }

    fn classify(
        &self,
        view: &InterfaceView,
        resolver: &MacIdentityResolver,
        warnings: &mut Warnings,
    ) -> Vec<Endpoint> {
        if !view.has_observations() {
            return Vec::new();
        }

        let cdp = first_of(view, DiscoveryProtocol::Cdp);
        let lldp = first_of(view, DiscoveryProtocol::Lldp);
        if let (Some(cdp), Some(lldp)) = (cdp, lldp) {
            if self.names_disagree(cdp, lldp) {
                warnings.push(Warning::ProtocolDisagreement {
                    interface: view.interface.clone(),
                    cdp: cdp.device_name.clone(),
                    lldp: lldp.device_name.clone(),
                });
            }
        }
        let authoritative = cdp.or(lldp);

        if let Some(hostname) = authoritative.and_then(|r| self.known.resolve(&r.device_name)) {
            return vec![Endpoint::Switch(SwitchEndpoint {
                hostname: hostname.to_string(),
            })];
        }

        // MAC table first, then whatever the neighbors advertised
        let mut candidates: Vec<MacAddress> = view.macs.clone();
        for mac in view.neighbors.iter().filter_map(|n| n.mac) {
            if !candidates.contains(&mac) {
                candidates.push(mac);
            }
        }

        let mut servers: Vec<ServerEndpoint> = Vec::new();
        for mac in &candidates {
            let Some(identity) = resolver.resolve(mac) else {
                continue;
            };
            if servers
                .iter()
                .any(|s| s.hostname.eq_ignore_ascii_case(&identity.hostname))
            {
                continue;
            }
            servers.push(ServerEndpoint {
                hostname: identity.hostname.clone(),
                mac: *mac,
                bmc_type: identity.bmc_type,
            });
        }
        if !servers.is_empty() {
            if servers.len() > 1 {
                debug!(
                    switch = %view.interface.switch,
                    interface = %view.interface.name,
                    servers = servers.len(),
                    "interface hosts several servers"
                );
            }
            return servers.into_iter().map(Endpoint::Server).collect();
        }

        let reported_name = authoritative.map(|r| r.device_name.clone());
        match candidates.first() {
            Some(mac) => vec![Endpoint::Unknown(UnknownEndpoint {
                mac: Some(*mac),
                reported_name,
            })],
            None if reported_name.is_some() => vec![Endpoint::Unknown(UnknownEndpoint {
                mac: None,
                reported_name,
            })],
            None => Vec::new(),
        }
    }

    fn names_disagree(&self, cdp: &NeighborRecord, lldp: &NeighborRecord) -> bool {
        // an LLDP neighbor without a system name is named by its chassis MAC; nothing to compare
        if lldp.device_name.parse::<MacAddress>().is_ok() {
            return false;
        }
        match (
            self.known.resolve(&cdp.device_name),
            self.known.resolve(&lldp.device_name),
        ) {
            (Some(a), Some(b)) => a != b,
            _ => !same_device_name(&cdp.device_name, &lldp.device_name),
        }
    }

    fn switch_edge(&self, view: &InterfaceView) -> Option<SwitchEdge> {
        let peer = view.endpoints.iter().find_map(|e| match e {
            Endpoint::Switch(switch) => Some(switch.hostname.clone()),
            _ => None,
        })?;
        let authoritative = first_of(view, DiscoveryProtocol::Cdp).or(first_of(view, DiscoveryProtocol::Lldp));
        let mut protocols: Vec<DiscoveryProtocol> = view
            .neighbors
            .iter()
            .filter(|n| self.known.resolve(&n.device_name) == Some(peer.as_str()))
            .map(|n| n.protocol)
            .collect();
        protocols.sort();
        protocols.dedup();
        Some(SwitchEdge {
            local: view.interface.clone(),
            remote_port: authoritative.and_then(|r| r.remote_interface.clone()),
            peer,
            protocols,
        })
    }
}

fn first_of(view: &InterfaceView, protocol: DiscoveryProtocol) -> Option<&NeighborRecord> {
    view.neighbors.iter().find(|n| n.protocol == protocol)
}

fn same_device_name(a: &str, b: &str) -> bool {
    let (a, b) = (normalize_device_name(a), normalize_device_name(b));
    a == b || a.split('.').next() == b.split('.').next()
}

/// Groups one switch's records by interface, keeping table order for MACs.
fn interface_views(hostname: &str, records: SwitchRecords) -> BTreeMap<String, InterfaceView> {
    let mut views: BTreeMap<String, InterfaceView> = BTreeMap::new();
    for status in records.interface_status {
        view_for(&mut views, hostname, &status.interface).status = Some(status.state);
    }
    for neighbor in records.neighbors {
        let name = neighbor.interface.name.clone();
        view_for(&mut views, hostname, &name).neighbors.push(neighbor);
    }
    for entry in records.mac_table {
        let view = view_for(&mut views, hostname, &entry.interface.name);
        if !view.macs.contains(&entry.mac) {
            view.macs.push(entry.mac);
        }
    }
    views
}

fn view_for<'a>(
    views: &'a mut BTreeMap<String, InterfaceView>,
    hostname: &str,
    name: &str,
) -> &'a mut InterfaceView {
    views
        .entry(name.to_string())
        .or_insert_with(|| InterfaceView::new(SwitchInterface::new(hostname, name)))
}

/// Pairs the switch edges reported from both ends into verified links.
///
/// Pairing first follows the remote port a neighbor record reported, then falls back to any
/// unpaired reverse edge in interface order. Edges without a partner become unverified links.
fn reconcile(mut edges: Vec<SwitchEdge>) -> Vec<SwitchLink> {
    edges.sort_by(|a, b| a.local.cmp(&b.local));
    let mut partner: Vec<Option<usize>> = vec![None; edges.len()];

    for i in 0..edges.len() {
        if partner[i].is_some() {
            continue;
        }
        let Some(port) = &edges[i].remote_port else {
            continue;
        };
        let expected = SwitchInterface::new(edges[i].peer.clone(), port);
        let found = (0..edges.len()).find(|&j| {
            j != i
                && partner[j].is_none()
                && edges[j].local == expected
                && edges[j].peer == edges[i].local.switch
        });
        if let Some(j) = found {
            partner[i] = Some(j);
            partner[j] = Some(i);
        }
    }

    for i in 0..edges.len() {
        if partner[i].is_some() {
            continue;
        }
        let found = (0..edges.len()).find(|&j| {
            j != i
                && partner[j].is_none()
                && edges[j].local.switch == edges[i].peer
                && edges[j].peer == edges[i].local.switch
        });
        if let Some(j) = found {
            partner[i] = Some(j);
            partner[j] = Some(i);
        }
    }

    let mut links = Vec::new();
    for (i, edge) in edges.iter().enumerate() {
        match partner[i] {
            Some(j) if j < i => {}
            Some(j) => links.push(SwitchLink::verified(edge.side(), edges[j].side())),
            None => {
                debug!(interface = %edge.local, peer = %edge.peer, "switch link reported from one side only");
                links.push(SwitchLink::unverified(
                    edge.side(),
                    edge.peer.clone(),
                    edge.remote_port.clone(),
                ));
            }
        }
    }
    links.sort_by(|a, b| a.local.interface.cmp(&b.local.interface));
    links
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{
        data_aquisition::core::{CommandOutputs, RawBmcPayload, RawSwitchPayload},
        network::{
            edge::LinkPeer,
            endpoint::{BmcType, MacTableEntry},
        },
        parsers::InterfaceStatus,
        topology::store::PollStore,
    };
    use proptest::prelude::*;

    const N1: &str = "nexus9k-1";
    const N2: &str = "nexus9k-2";

    fn engine() -> CorrelationEngine {
        CorrelationEngine::new(KnownSwitches::new([N1, N2]))
    }

    fn neighbor(switch: &str, intf: &str, protocol: DiscoveryProtocol, name: &str, remote: Option<&str>) -> NeighborRecord {
        NeighborRecord {
            interface: SwitchInterface::new(switch, intf),
            protocol,
            device_name: name.into(),
            mac: None,
            platform: None,
            capabilities: Vec::new(),
            remote_interface: remote.map(str::to_string),
        }
    }

    fn mac_entry(switch: &str, intf: &str, mac: &str) -> MacTableEntry {
        MacTableEntry {
            interface: SwitchInterface::new(switch, intf),
            mac: mac.parse().unwrap(),
            vlan: Some(10),
        }
    }

    fn bmc(mac: &str, hostname: &str, bmc_type: BmcType) -> BmcIdentity {
        BmcIdentity {
            mac: mac.parse().unwrap(),
            hostname: hostname.into(),
            bmc_type,
            source: "192.168.1.100".into(),
        }
    }

    fn polled(hostname: &str, neighbors: Vec<NeighborRecord>, mac_table: Vec<MacTableEntry>) -> SwitchObservation {
        SwitchObservation {
            hostname: hostname.into(),
            records: Some(SwitchRecords {
                neighbors,
                mac_table,
                ..Default::default()
            }),
        }
    }

    fn input(switches: Vec<SwitchObservation>, bmc_identities: Vec<BmcIdentity>) -> CorrelationInput {
        CorrelationInput {
            switches,
            bmc_identities,
            warnings: Warnings::default(),
        }
    }

    fn endpoints(topology: &TopologyGraph, switch: &str, intf: &str) -> Vec<Endpoint> {
        topology.endpoints(&SwitchInterface::new(switch, intf)).to_vec()
    }

    #[test]
    fn test_mac_matching_bmc_is_server() {
        let topology = engine().correlate(input(
            vec![polled(N1, vec![], vec![mac_entry(N1, "Eth1/10", "00:11:22:33:44:55")])],
            vec![bmc("00:11:22:33:44:55", "server1.example.com", BmcType::Ilo)],
        ));
        assert_eq!(
            endpoints(&topology, N1, "Eth1/10"),
            vec![Endpoint::Server(ServerEndpoint {
                hostname: "server1.example.com".into(),
                mac: "00:11:22:33:44:55".parse().unwrap(),
                bmc_type: BmcType::Ilo,
            })]
        );
    }

    #[test]
    fn test_cdp_neighbor_is_switch() {
        let topology = engine().correlate(input(
            vec![polled(
                N1,
                vec![neighbor(N1, "Ethernet1/1", DiscoveryProtocol::Cdp, "nexus9k-2(FDO21120U8N)", Some("Eth1/1"))],
                vec![],
            )],
            vec![],
        ));
        assert_eq!(
            endpoints(&topology, N1, "Eth1/1"),
            vec![Endpoint::Switch(SwitchEndpoint { hostname: N2.into() })]
        );
        // nexus9k-2 was not polled: the link is single-sided
        let links = topology.switch_links();
        assert_eq!(links.len(), 1);
        assert!(!links[0].is_verified());
        assert_eq!(links[0].peer_interface_name(), Some("Eth1/1"));
    }

    #[test]
    fn test_unmatched_mac_is_unknown() {
        let topology = engine().correlate(input(
            vec![polled(N1, vec![], vec![mac_entry(N1, "Eth1/20", "CC:DD:EE:FF:00:11")])],
            vec![bmc("00:11:22:33:44:55", "server1.example.com", BmcType::Ilo)],
        ));
        assert_eq!(
            endpoints(&topology, N1, "Eth1/20"),
            vec![Endpoint::Unknown(UnknownEndpoint {
                mac: Some("CC:DD:EE:FF:00:11".parse().unwrap()),
                reported_name: None,
            })]
        );
        assert_eq!(topology.unknown_edges().len(), 1);
    }

    #[test]
    fn test_interface_without_observations_has_no_endpoint() {
        let mut records = SwitchRecords {
            mac_table: vec![mac_entry(N1, "Eth1/10", "00:11:22:33:44:55")],
            ..Default::default()
        };
        records.interface_status.push(InterfaceStatus {
            interface: "Eth1/48".into(),
            state: "notconnect".into(),
        });
        let topology = engine().correlate(input(
            vec![SwitchObservation { hostname: N1.into(), records: Some(records) }],
            vec![],
        ));
        let idle = topology.interface(&SwitchInterface::new(N1, "Eth1/48")).unwrap();
        assert_eq!(idle.status.as_deref(), Some("notconnect"));
        assert!(idle.endpoints.is_empty());
        assert_eq!(topology.interfaces(N1).count(), 2);
        assert_eq!(topology.edges().count(), 1);
    }

    #[test]
    fn test_neighbor_without_mac_is_named_unknown() {
        let topology = engine().correlate(input(
            vec![polled(N1, vec![neighbor(N1, "Eth1/5", DiscoveryProtocol::Cdp, "esx-host-07", None)], vec![])],
            vec![],
        ));
        assert_eq!(
            endpoints(&topology, N1, "Eth1/5"),
            vec![Endpoint::Unknown(UnknownEndpoint { mac: None, reported_name: Some("esx-host-07".into()) })]
        );
    }

    #[test]
    fn test_bidirectional_link_is_reconciled_once() {
        let topology = engine().correlate(input(
            vec![
                polled(
                    N1,
                    vec![
                        neighbor(N1, "Eth1/1", DiscoveryProtocol::Cdp, "nexus9k-2", Some("Eth1/1")),
                        neighbor(N1, "Eth1/1", DiscoveryProtocol::Lldp, "nexus9k-2", Some("Eth1/1")),
                    ],
                    vec![],
                ),
                polled(N2, vec![neighbor(N2, "Eth1/1", DiscoveryProtocol::Lldp, "nexus9k-1", Some("Eth1/1"))], vec![]),
            ],
            vec![],
        ));
        let links = topology.switch_links();
        assert_eq!(links.len(), 1);
        assert!(links[0].is_verified());
        assert_eq!(links[0].local.interface, SwitchInterface::new(N1, "Eth1/1"));
        assert_eq!(links[0].local.protocols, vec![DiscoveryProtocol::Cdp, DiscoveryProtocol::Lldp]);
        match &links[0].peer {
            LinkPeer::Verified(side) => assert_eq!(side.protocols, vec![DiscoveryProtocol::Lldp]),
            other => panic!("unexpected peer {other:?}"),
        }
        assert_eq!(topology.edges().count(), 1);
        assert!(topology.warnings().is_empty());
    }

    #[test]
    fn test_parallel_links_pair_by_reported_port() {
        // crossed cabling: n1 Eth1/1 <-> n2 Eth1/2 and n1 Eth1/2 <-> n2 Eth1/1
        let topology = engine().correlate(input(
            vec![
                polled(
                    N1,
                    vec![
                        neighbor(N1, "Eth1/1", DiscoveryProtocol::Cdp, N2, Some("Ethernet1/2")),
                        neighbor(N1, "Eth1/2", DiscoveryProtocol::Cdp, N2, Some("Ethernet1/1")),
                    ],
                    vec![],
                ),
                polled(
                    N2,
                    vec![
                        neighbor(N2, "Eth1/1", DiscoveryProtocol::Cdp, N1, Some("Ethernet1/2")),
                        neighbor(N2, "Eth1/2", DiscoveryProtocol::Cdp, N1, Some("Ethernet1/1")),
                    ],
                    vec![],
                ),
            ],
            vec![],
        ));
        let links = topology.switch_links();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(SwitchLink::is_verified));
        let from_n1_eth1 = topology.link_for(&SwitchInterface::new(N1, "Eth1/1")).unwrap();
        assert_eq!(
            from_n1_eth1.far_end_from(&SwitchInterface::new(N1, "Eth1/1")),
            Some((N2, Some("Eth1/2")))
        );
    }

    #[test]
    fn test_protocol_disagreement_cdp_wins() {
        let topology = engine().correlate(input(
            vec![polled(
                N1,
                vec![
                    neighbor(N1, "Eth1/7", DiscoveryProtocol::Lldp, "nexus9k-2", None),
                    neighbor(N1, "Eth1/7", DiscoveryProtocol::Cdp, "appliance-3", None),
                ],
                vec![],
            )],
            vec![],
        ));
        assert_eq!(
            endpoints(&topology, N1, "Eth1/7"),
            vec![Endpoint::Unknown(UnknownEndpoint { mac: None, reported_name: Some("appliance-3".into()) })]
        );
        assert!(topology.switch_links().is_empty());
        assert!(matches!(
            topology.warnings(),
            [Warning::ProtocolDisagreement { cdp, lldp, .. }] if cdp == "appliance-3" && lldp == "nexus9k-2"
        ));
    }

    #[test]
    fn test_lldp_chassis_name_is_not_a_disagreement() {
        let mut lldp = neighbor(N1, "Eth1/9", DiscoveryProtocol::Lldp, "a0b1.c2d3.e4f5", None);
        lldp.mac = Some("a0b1.c2d3.e4f5".parse().unwrap());
        let topology = engine().correlate(input(
            vec![polled(N1, vec![neighbor(N1, "Eth1/9", DiscoveryProtocol::Cdp, "esx-01", None), lldp], vec![])],
            vec![bmc("A0:B1:C2:D3:E4:F5", "esx-01.example.com", BmcType::Idrac)],
        ));
        assert!(topology.warnings().is_empty());
        // the neighbor-reported MAC resolves when the MAC table is silent
        assert!(matches!(
            &endpoints(&topology, N1, "Eth1/9")[..],
            [Endpoint::Server(server)] if server.hostname == "esx-01.example.com"
        ));
    }

    #[test]
    fn test_multi_tenant_port() {
        let topology = engine().correlate(input(
            vec![polled(
                N1,
                vec![],
                vec![
                    mac_entry(N1, "Eth1/30", "00:00:00:00:aa:01"),
                    mac_entry(N1, "Eth1/30", "00:00:00:00:bb:01"),
                    mac_entry(N1, "Eth1/30", "00:00:00:00:aa:02"),
                    mac_entry(N1, "Eth1/30", "00:00:00:00:cc:01"),
                ],
            )],
            vec![
                bmc("00:00:00:00:aa:01", "vm-host-a", BmcType::Ilo),
                bmc("00:00:00:00:aa:02", "vm-host-a", BmcType::Ilo),
                bmc("00:00:00:00:bb:01", "vm-host-b", BmcType::Idrac),
            ],
        ));
        let found = endpoints(&topology, N1, "Eth1/30");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].display_name(), "vm-host-a");
        assert_eq!(found[0].mac(), Some("00:00:00:00:aa:01".parse().unwrap()));
        assert_eq!(found[1].display_name(), "vm-host-b");
        assert_eq!(topology.server_edges().len(), 2);
    }

    #[test]
    fn test_isolated_and_unreachable_switches() {
        let topology = engine().correlate(input(
            vec![
                polled(N1, vec![], vec![]),
                SwitchObservation { hostname: N2.into(), records: None },
            ],
            vec![],
        ));
        assert_eq!(topology.isolated_switches().collect::<Vec<_>>(), vec![N1]);
        assert_eq!(topology.switch(N2).unwrap().status, SwitchStatus::Unreachable);
        assert_eq!(
            topology.warnings(),
            [Warning::IsolatedSwitch { hostname: N1.into() }]
        );
    }

    #[test]
    fn test_fixture_run_end_to_end() {
        let mut store = PollStore::new([N1.to_string(), N2.to_string()], ["192.168.1.100".to_string()]);
        store.record_switch(
            0,
            Ok(RawSwitchPayload::NxApi(CommandOutputs {
                cdp_neighbors: serde_json::from_str(include_str!("../../test_data/nxapi_cdp_detail.json")).unwrap(),
                lldp_neighbors: serde_json::from_str(include_str!("../../test_data/nxapi_lldp_detail.json")).unwrap(),
                mac_table: serde_json::from_str(include_str!("../../test_data/nxapi_mac_table.json")).unwrap(),
                interface_status: Some(
                    serde_json::from_str(include_str!("../../test_data/nxapi_interface_status.json")).unwrap(),
                ),
            })),
            SystemTime::now(),
        );
        store.record_switch(
            1,
            Ok(RawSwitchPayload::Ssh(CommandOutputs {
                cdp_neighbors: include_str!("../../test_data/ssh_cdp_detail.txt").to_string(),
                lldp_neighbors: include_str!("../../test_data/ssh_lldp_detail.txt").to_string(),
                mac_table: include_str!("../../test_data/ssh_mac_table.txt").to_string(),
                interface_status: None,
            })),
            SystemTime::now(),
        );
        store.record_bmc(
            0,
            Ok(RawBmcPayload {
                address: "192.168.1.100".into(),
                bmc_type: BmcType::Ilo,
                system: serde_json::from_str(include_str!("../../test_data/ilo_system.json")).unwrap(),
                interfaces: serde_json::from_str(include_str!("../../test_data/ilo_ethernet_interfaces.json")).unwrap(),
            }),
            SystemTime::now(),
        );

        let topology = engine().correlate(store.into_correlation_input());

        let links = topology.switch_links();
        assert_eq!(links.len(), 1);
        assert!(links[0].is_verified());
        assert_eq!(
            endpoints(&topology, N1, "Eth1/1"),
            vec![Endpoint::Switch(SwitchEndpoint { hostname: N2.into() })]
        );
        assert_eq!(
            endpoints(&topology, N2, "Eth1/1"),
            vec![Endpoint::Switch(SwitchEndpoint { hostname: N1.into() })]
        );

        let servers = topology.server_edges();
        assert_eq!(servers.len(), 2);
        assert!(servers.iter().all(|(_, s)| s.hostname == "server1.example.com"));

        assert_eq!(
            endpoints(&topology, N1, "Eth1/5"),
            vec![Endpoint::Unknown(UnknownEndpoint { mac: None, reported_name: Some("esx-host-07".into()) })]
        );
        assert!(matches!(
            &endpoints(&topology, N1, "Eth1/20")[..],
            [Endpoint::Unknown(UnknownEndpoint { mac: Some(_), .. })]
        ));
        assert!(endpoints(&topology, N1, "Eth1/48").is_empty());

        // 2 skipped on nexus9k-1, 1 skipped on nexus9k-2
        let skipped = topology
            .warnings()
            .iter()
            .filter(|w| matches!(w, Warning::RecordSkipped { .. }))
            .count();
        assert_eq!(skipped, 3);
        // switches, one server, unknown devices on n1 Eth1/5 and Eth1/20, n2 Eth1/5 and Eth1/6
        assert_eq!(topology.nodes().count(), 2 + 1 + 4);
    }

    fn shuffled_fixture() -> (Vec<SwitchObservation>, Vec<BmcIdentity>) {
        let switches = vec![
            polled(
                N1,
                vec![neighbor(N1, "Eth1/1", DiscoveryProtocol::Cdp, N2, Some("Eth1/49"))],
                vec![
                    mac_entry(N1, "Eth1/10", "00:11:22:33:44:55"),
                    mac_entry(N1, "Eth1/11", "00:11:22:33:44:66"),
                    mac_entry(N1, "Eth1/12", "00:11:22:33:44:77"),
                ],
            ),
            polled(
                N2,
                vec![neighbor(N2, "Eth1/49", DiscoveryProtocol::Lldp, N1, Some("Eth1/1"))],
                vec![mac_entry(N2, "Eth1/10", "00:11:22:33:44:88")],
            ),
        ];
        let bmcs = vec![
            bmc("00:11:22:33:44:55", "server1", BmcType::Ilo),
            bmc("00:11:22:33:44:66", "server2", BmcType::Idrac),
            bmc("00:11:22:33:44:88", "server3", BmcType::Idrac),
        ];
        (switches, bmcs)
    }

    fn summary(topology: &TopologyGraph) -> (Vec<(String, String)>, Vec<SwitchLink>) {
        let mut servers: Vec<(String, String)> = topology
            .server_edges()
            .into_iter()
            .map(|(interface, server)| (interface.to_string(), server.hostname.clone()))
            .collect();
        servers.sort();
        (servers, topology.switch_links().to_vec())
    }

    proptest! {
        #[test]
        fn test_result_is_independent_of_polling_order(
            switches in Just(shuffled_fixture().0).prop_shuffle(),
            bmcs in Just(shuffled_fixture().1).prop_shuffle(),
        ) {
            let (base_switches, base_bmcs) = shuffled_fixture();
            let baseline = summary(&engine().correlate(input(base_switches, base_bmcs)));
            let shuffled = summary(&engine().correlate(input(switches, bmcs)));
            prop_assert_eq!(&baseline, &shuffled);
            prop_assert_eq!(baseline.0.len(), 3);
            prop_assert_eq!(baseline.1.len(), 1);
        }
    }
}
