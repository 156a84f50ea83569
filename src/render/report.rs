use crate::network::{
    edge::SwitchLink,
    endpoint::Endpoint,
    network_graph::{InterfaceView, TopologyGraph},
    node::SwitchStatus,
};

/// Plain-text connection report, grouped by switch and then by endpoint kind.
pub fn render_report(topology: &TopologyGraph) -> String {
    let mut report = vec!["Network Connection Report".to_string(), "=".repeat(50)];

    for switch in topology.switches() {
        let heading = match switch.status {
            SwitchStatus::Polled => format!("\nSwitch: {}", switch.hostname),
            SwitchStatus::Isolated => format!("\nSwitch: {} (no connections observed)", switch.hostname),
            SwitchStatus::Unreachable => format!("\nSwitch: {} (unreachable)", switch.hostname),
        };
        report.push(heading);
        report.push("-".repeat(30));

        let mut switches = Vec::new();
        let mut servers = Vec::new();
        let mut unknown = Vec::new();
        for view in topology.interfaces(&switch.hostname) {
            for endpoint in topology.endpoints(&view.interface) {
                let line = connection_line(topology, view, endpoint);
                match endpoint {
                    Endpoint::Switch(_) => switches.push(line),
                    Endpoint::Server(_) => servers.push(line),
                    Endpoint::Unknown(_) => unknown.push(line),
                }
            }
        }
        for (title, lines) in [
            ("Connected Switches", switches),
            ("Connected Servers", servers),
            ("Unknown Devices", unknown),
        ] {
            if !lines.is_empty() {
                report.push(format!("\n  {title}:"));
                report.extend(lines);
            }
        }
    }

    if !topology.switch_links().is_empty() {
        report.push("\nSwitch Links".to_string());
        report.push("-".repeat(30));
        report.extend(topology.switch_links().iter().map(link_line));
    }

    let isolated: Vec<&str> = topology.isolated_switches().collect();
    if !isolated.is_empty() {
        report.push("\nIsolated Switches".to_string());
        report.push("-".repeat(30));
        report.extend(isolated.iter().map(|hostname| format!("  {hostname}")));
    }

    if !topology.warnings().is_empty() {
        report.push("\nWarnings".to_string());
        report.push("-".repeat(30));
        report.extend(topology.warnings().iter().map(|w| format!("  - {w}")));
    }

    let mut text = report.join("\n");
    text.push('\n');
    text
}

fn connection_line(topology: &TopologyGraph, view: &InterfaceView, endpoint: &Endpoint) -> String {
    let name = match endpoint {
        Endpoint::Unknown(unknown) => unknown
            .reported_name
            .clone()
            .unwrap_or_else(|| "Unknown Device".to_string()),
        Endpoint::Switch(_) => {
            let far_port = topology
                .link_for(&view.interface)
                .and_then(|link| link.far_end_from(&view.interface))
                .and_then(|(_, port)| port);
            match far_port {
                Some(port) => format!("{} port {port}", endpoint.display_name()),
                None => endpoint.display_name(),
            }
        }
        _ => endpoint.display_name(),
    };
    let mut line = format!("  {}: {}", view.interface.name, name);
    if let Some(mac) = endpoint.mac() {
        line.push_str(&format!(" (MAC: {mac})"));
    }
    let protocols = view.protocols();
    if !protocols.is_empty() {
        let names: Vec<String> = protocols.iter().map(|p| p.to_string()).collect();
        line.push_str(&format!(" [{}]", names.join("/")));
    }
    line
}

fn link_line(link: &SwitchLink) -> String {
    let far_port = link.peer_interface_name().unwrap_or("?");
    let verified = if link.is_verified() { "" } else { " (unverified)" };
    format!(
        "  {} <-> {} {}{}",
        link.local.interface,
        link.peer_switch(),
        far_port,
        verified
    )
}
