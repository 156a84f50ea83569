/*
 * This module defines the topology data model shared by the correlation engine and the renderers:
 * MAC addresses, switch interfaces, observations, resolved endpoints and the frozen graph.
 */

pub mod edge;
pub mod endpoint;
pub mod mac;
pub mod network_graph;
pub mod node;
pub mod switch;
