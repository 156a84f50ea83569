use std::collections::{BTreeMap, HashMap};

use petgraph::{
    Directed,
    graph::NodeIndex,
    stable_graph::StableGraph,
    visit::{EdgeRef, IntoEdgeReferences},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    network::{
        edge::{Edge, EdgeKind, LinkPeer, SwitchLink},
        endpoint::{DiscoveryProtocol, Endpoint, NeighborRecord, ServerEndpoint, UnknownEndpoint},
        mac::MacAddress,
        node::{Node, SwitchStatus},
        switch::SwitchInterface,
    },
    topology::warning::Warning,
};

/// Everything known about one switch interface after correlation.
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceView {
    pub interface: SwitchInterface,
    /// Operational state from `show interface status`, if it was collected.
    pub status: Option<String>,
    pub neighbors: Vec<NeighborRecord>,
    pub macs: Vec<MacAddress>,
    /// Empty when nothing was observed. More than one entry only for a port hosting several
    /// servers.
    pub endpoints: Vec<Endpoint>,
}

impl InterfaceView {
    pub fn new(interface: SwitchInterface) -> Self {
        Self {
            interface,
            status: None,
            neighbors: Vec::new(),
            macs: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    pub fn has_observations(&self) -> bool {
        !self.neighbors.is_empty() || !self.macs.is_empty()
    }

    /// Discovery protocols that reported a neighbor here, sorted.
    pub fn protocols(&self) -> Vec<DiscoveryProtocol> {
        let mut protocols: Vec<DiscoveryProtocol> =
            self.neighbors.iter().map(|n| n.protocol).collect();
        protocols.sort();
        protocols.dedup();
        protocols
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchView {
    pub hostname: String,
    pub status: SwitchStatus,
    interfaces: BTreeMap<String, InterfaceView>,
}

impl SwitchView {
    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceView> {
        self.interfaces.values()
    }
}

/// The correlated topology. Built once by the correlation engine, read-only afterwards.
///
/// Nodes are switches, servers and unknown devices; edges run from a switch interface to the
/// far end. A switch-to-switch link has one edge no matter how many sides reported it.
pub struct TopologyGraph {
    graph: StableGraph<Node, Edge, Directed>,
    switches: BTreeMap<String, SwitchView>,
    links: Vec<SwitchLink>,
    warnings: Vec<Warning>,
}

impl TopologyGraph {
    pub fn switches(&self) -> impl Iterator<Item = &SwitchView> {
        self.switches.values()
    }

    pub fn switch(&self, hostname: &str) -> Option<&SwitchView> {
        self.switches.get(hostname)
    }

    /// All interfaces known for a switch, including status-only ones. Empty for an unknown switch.
    pub fn interfaces(&self, hostname: &str) -> impl Iterator<Item = &InterfaceView> {
        self.switches
            .get(hostname)
            .into_iter()
            .flat_map(|switch| switch.interfaces())
    }

    pub fn interface(&self, interface: &SwitchInterface) -> Option<&InterfaceView> {
        self.switches.get(&interface.switch)?.interfaces.get(&interface.name)
    }

    /// Resolved endpoint(s) of an interface. Empty if nothing was observed there.
    pub fn endpoints(&self, interface: &SwitchInterface) -> &[Endpoint] {
        self.interface(interface)
            .map(|view| view.endpoints.as_slice())
            .unwrap_or(&[])
    }

    pub fn switch_links(&self) -> &[SwitchLink] {
        &self.links
    }

    pub fn link_for(&self, interface: &SwitchInterface) -> Option<&SwitchLink> {
        self.links.iter().find(|link| link.touches(interface))
    }

    pub fn server_edges(&self) -> Vec<(&SwitchInterface, &ServerEndpoint)> {
        self.endpoint_pairs()
            .filter_map(|(interface, endpoint)| match endpoint {
                Endpoint::Server(server) => Some((interface, server)),
                _ => None,
            })
            .collect()
    }

    pub fn unknown_edges(&self) -> Vec<(&SwitchInterface, &UnknownEndpoint)> {
        self.endpoint_pairs()
            .filter_map(|(interface, endpoint)| match endpoint {
                Endpoint::Unknown(unknown) => Some((interface, unknown)),
                _ => None,
            })
            .collect()
    }

    pub fn isolated_switches(&self) -> impl Iterator<Item = &str> {
        self.switches
            .values()
            .filter(|switch| switch.status == SwitchStatus::Isolated)
            .map(|switch| switch.hostname.as_str())
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// (source node, target node, edge) triples.
    pub fn edges(&self) -> impl Iterator<Item = (&Node, &Node, &Edge)> {
        self.graph
            .edge_references()
            .map(|edge| (&self.graph[edge.source()], &self.graph[edge.target()], edge.weight()))
    }

    /// Read-only access for renderers that walk the petgraph structure directly.
    pub fn graph(&self) -> &StableGraph<Node, Edge, Directed> {
        &self.graph
    }

    pub fn snapshot(&self) -> TopologySnapshot<'_> {
        TopologySnapshot {
            switches: self.switches.values().collect(),
            links: &self.links,
            nodes: self.graph.node_weights().collect(),
            warnings: &self.warnings,
        }
    }

    fn endpoint_pairs(&self) -> impl Iterator<Item = (&SwitchInterface, &Endpoint)> {
        self.switches
            .values()
            .flat_map(|switch| switch.interfaces.values())
            .flat_map(|view| view.endpoints.iter().map(move |e| (&view.interface, e)))
    }
}

/// Serializable view of the whole topology, for the JSON output.
#[derive(Debug, Serialize)]
pub struct TopologySnapshot<'a> {
    pub switches: Vec<&'a SwitchView>,
    pub links: &'a [SwitchLink],
    pub nodes: Vec<&'a Node>,
    pub warnings: &'a [Warning],
}

/// Assembles a [`TopologyGraph`]. Only the correlation engine builds graphs.
#[derive(Default)]
pub(crate) struct TopologyBuilder {
    switches: BTreeMap<String, SwitchView>,
    links: Vec<SwitchLink>,
    warnings: Vec<Warning>,
}

impl TopologyBuilder {
    pub(crate) fn add_switch(&mut self, hostname: &str, status: SwitchStatus) {
        self.switches
            .entry(hostname.to_string())
            .and_modify(|switch| switch.status = status)
            .or_insert_with(|| SwitchView {
                hostname: hostname.to_string(),
                status,
                interfaces: BTreeMap::new(),
            });
    }

    pub(crate) fn add_interface(&mut self, view: InterfaceView) {
        let hostname = view.interface.switch.clone();
        if !self.switches.contains_key(&hostname) {
            self.add_switch(&hostname, SwitchStatus::Polled);
        }
        if let Some(switch) = self.switches.get_mut(&hostname) {
            switch.interfaces.insert(view.interface.name.clone(), view);
        }
    }

    pub(crate) fn add_link(&mut self, link: SwitchLink) {
        self.links.push(link);
    }

    pub(crate) fn set_warnings(&mut self, warnings: Vec<Warning>) {
        self.warnings = warnings;
    }

    pub(crate) fn build(self) -> TopologyGraph {
        let mut graph = StableGraph::new();
        let mut node_id_to_index_map: HashMap<Uuid, NodeIndex> = HashMap::new();

        let mut index_of = |graph: &mut StableGraph<Node, Edge, Directed>, node: Node| -> NodeIndex {
            *node_id_to_index_map
                .entry(node.id)
                .or_insert_with(|| graph.add_node(node))
        };

        let mut switch_index: HashMap<String, NodeIndex> = HashMap::new();
        for switch in self.switches.values() {
            let index = index_of(&mut graph, Node::switch(&switch.hostname, switch.status));
            switch_index.insert(switch.hostname.clone(), index);
        }

        for view in self.switches.values().flat_map(|s| s.interfaces.values()) {
            let Some(&source) = switch_index.get(&view.interface.switch) else {
                continue;
            };
            for endpoint in &view.endpoints {
                let Some(node) = Node::from_endpoint(endpoint, &view.interface) else {
                    // switch endpoints become edges through the reconciled links
                    continue;
                };
                let kind = match endpoint {
                    Endpoint::Server(_) => EdgeKind::Server,
                    _ => EdgeKind::Unknown,
                };
                let target = index_of(&mut graph, node);
                graph.add_edge(
                    source,
                    target,
                    Edge {
                        interface: view.interface.clone(),
                        kind,
                        protocols: view.protocols(),
                        mac: endpoint.mac(),
                    },
                );
            }
        }

        for link in &self.links {
            let source = match switch_index.get(&link.local.interface.switch) {
                Some(index) => *index,
                None => continue,
            };
            let peer_switch = link.peer_switch().to_string();
            let target = match switch_index.get(&peer_switch) {
                Some(index) => *index,
                None => {
                    let index = index_of(&mut graph, Node::switch(&peer_switch, SwitchStatus::Unreachable));
                    switch_index.insert(peer_switch, index);
                    index
                }
            };
            let (peer, protocols) = match &link.peer {
                LinkPeer::Verified(side) => {
                    let mut protocols = link.local.protocols.clone();
                    protocols.extend(side.protocols.iter().copied());
                    protocols.sort();
                    protocols.dedup();
                    (Some(side.interface.clone()), protocols)
                }
                LinkPeer::Unverified { .. } => (None, link.local.protocols.clone()),
            };
            graph.add_edge(
                source,
                target,
                Edge {
                    interface: link.local.interface.clone(),
                    kind: EdgeKind::SwitchLink {
                        verified: peer.is_some(),
                        peer,
                    },
                    protocols,
                    mac: None,
                },
            );
        }

        TopologyGraph {
            graph,
            switches: self.switches,
            links: self.links,
            warnings: self.warnings,
        }
    }
}
