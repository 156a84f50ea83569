/*!
Diagram output.

The topology is laid out in three rows (switches, servers, unknown devices) and written as SVG.
The same SVG is rasterized to PNG with resvg, and a Graphviz DOT file is produced straight from
the petgraph structure for anyone who prefers their own layout engine.
*/

use std::{
    collections::HashMap,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use petgraph::{
    dot::Dot,
    stable_graph::{EdgeReference, NodeIndex, StableGraph},
};
use thiserror::Error;
use tiny_skia::Pixmap;
use tracing::debug;
use usvg::Tree;
use uuid::Uuid;

use crate::{
    network::{
        edge::{Edge, EdgeKind},
        network_graph::TopologyGraph,
        node::{Node, NodeInfo, SwitchStatus},
    },
    render::suffixed,
};

const BOX_WIDTH: f32 = 180.0;
const COLUMN_SPACING: f32 = 220.0;
const ROW_SPACING: f32 = 220.0;
const LINE_HEIGHT: f32 = 16.0;
const MARGIN: f32 = 40.0;

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("invalid SVG: {0}")]
    Svg(#[from] usvg::Error),
    #[error("cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy)]
struct Placed {
    x: f32,
    y: f32,
    height: f32,
}

impl Placed {
    fn bottom(&self) -> f32 {
        self.y + self.height / 2.0
    }

    fn top(&self) -> f32 {
        self.y - self.height / 2.0
    }
}

fn row_of(node: &Node) -> usize {
    match node.info {
        NodeInfo::Switch { .. } => 0,
        NodeInfo::Server { .. } => 1,
        NodeInfo::Unknown { .. } => 2,
    }
}

fn box_height(node: &Node) -> f32 {
    20.0 + LINE_HEIGHT * node.caption().lines().count() as f32
}

/// Places every node. Rows are sorted by caption so the picture is stable across runs.
fn layout(topology: &TopologyGraph) -> (HashMap<Uuid, Placed>, f32, f32) {
    let mut rows: [Vec<&Node>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for node in topology.nodes() {
        rows[row_of(node)].push(node);
    }

    let mut placed = HashMap::new();
    let widest = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let width = MARGIN * 2.0 + widest as f32 * COLUMN_SPACING;
    for (row, nodes) in rows.iter_mut().enumerate() {
        nodes.sort_by_key(|node| node.caption());
        // centre short rows under the widest one
        let offset = (widest - nodes.len()) as f32 * COLUMN_SPACING / 2.0;
        for (column, node) in nodes.iter().enumerate() {
            placed.insert(
                node.id,
                Placed {
                    x: MARGIN + offset + column as f32 * COLUMN_SPACING + COLUMN_SPACING / 2.0,
                    y: MARGIN + 80.0 + row as f32 * ROW_SPACING,
                    height: box_height(node),
                },
            );
        }
    }
    let height = MARGIN * 2.0 + 160.0 + 2.0 * ROW_SPACING;
    (placed, width, height)
}

fn fill(node: &Node) -> &'static str {
    match node.info {
        NodeInfo::Switch { .. } => "#add8e6",
        NodeInfo::Server { .. } => "#90ee90",
        NodeInfo::Unknown { .. } => "#d3d3d3",
    }
}

fn is_unreachable(node: &Node) -> bool {
    matches!(
        node.info,
        NodeInfo::Switch {
            status: SwitchStatus::Unreachable,
            ..
        }
    )
}

fn text_block(out: &mut String, x: f32, y: f32, text: &str, size: u32) {
    let lines: Vec<&str> = text.lines().collect();
    let first = y - (lines.len().saturating_sub(1)) as f32 * LINE_HEIGHT / 2.0;
    let _ = write!(
        out,
        r#"<text x="{x:.1}" y="{first:.1}" font-family="sans-serif" font-size="{size}" text-anchor="middle" dominant-baseline="middle">"#
    );
    for (i, line) in lines.iter().enumerate() {
        let dy = if i == 0 { 0.0 } else { LINE_HEIGHT };
        let _ = write!(
            out,
            r#"<tspan x="{x:.1}" dy="{dy:.1}">{}</tspan>"#,
            html_escape::encode_text(line)
        );
    }
    out.push_str("</text>\n");
}

fn edge_svg(out: &mut String, from: Placed, to: Placed, edge: &Edge) {
    let dashed = matches!(edge.kind, EdgeKind::SwitchLink { verified: false, .. });
    let dash = if dashed { r#" stroke-dasharray="6,4""# } else { "" };
    let (label_x, label_y);
    if (from.y - to.y).abs() < f32::EPSILON {
        // same row: arc above the boxes
        let mid_x = (from.x + to.x) / 2.0;
        let lift = from.top() - 60.0 - (from.x - to.x).abs() / 10.0;
        let _ = writeln!(
            out,
            r##"<path d="M {:.1} {:.1} Q {mid_x:.1} {lift:.1} {:.1} {:.1}" fill="none" stroke="#555555" stroke-width="1.5"{dash}/>"##,
            from.x,
            from.top(),
            to.x,
            to.top()
        );
        label_x = mid_x;
        label_y = (from.top() + lift) / 2.0;
    } else {
        let (start, end) = if from.y < to.y { (from.bottom(), to.top()) } else { (from.top(), to.bottom()) };
        let _ = writeln!(
            out,
            r##"<line x1="{:.1}" y1="{start:.1}" x2="{:.1}" y2="{end:.1}" stroke="#555555" stroke-width="1.5"{dash}/>"##,
            from.x, to.x
        );
        label_x = (from.x + to.x) / 2.0;
        label_y = (start + end) / 2.0;
    }
    text_block(out, label_x, label_y, &edge.label(), 10);
}

/// Renders the topology as a standalone SVG document.
pub fn render_svg(topology: &TopologyGraph) -> String {
    let (placed, width, height) = layout(topology);
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}" viewBox="0 0 {width:.0} {height:.0}">"#
    );
    out.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");

    for (source, target, edge) in topology.edges() {
        let (Some(from), Some(to)) = (placed.get(&source.id), placed.get(&target.id)) else {
            continue;
        };
        edge_svg(&mut out, *from, *to, edge);
    }

    for node in topology.nodes() {
        let Some(at) = placed.get(&node.id) else {
            continue;
        };
        let dash = if is_unreachable(node) { r#" stroke-dasharray="5,3""# } else { "" };
        let _ = writeln!(
            out,
            r#"<rect x="{:.1}" y="{:.1}" width="{BOX_WIDTH:.1}" height="{:.1}" rx="6" fill="{}" stroke="black" stroke-width="1"{dash}/>"#,
            at.x - BOX_WIDTH / 2.0,
            at.top(),
            at.height,
            fill(node)
        );
        text_block(&mut out, at.x, at.y, &node.caption(), 12);
    }

    out.push_str("</svg>\n");
    out
}

/// Rasterizes an SVG document to PNG bytes.
pub fn render_png(svg: &str) -> Result<Vec<u8>, DiagramError> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = Tree::from_str(svg, &options)?;

    let size = tree.size().to_int_size();
    let (width, height) = (size.width(), size.height());
    let mut pixmap = Pixmap::new(width, height).ok_or(DiagramError::Canvas { width, height })?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| DiagramError::Encode(e.to_string()))
}

/// Graphviz rendering of the graph with the same colours as the SVG.
pub fn render_dot(topology: &TopologyGraph) -> String {
    let graph = topology.graph();
    let edge_attributes = |_: &StableGraph<Node, Edge>, edge: EdgeReference<'_, Edge>| match edge.weight().kind {
        EdgeKind::SwitchLink { verified: false, .. } => "style=dashed".to_string(),
        _ => String::new(),
    };
    let node_attributes = |_: &StableGraph<Node, Edge>, (_, node): (NodeIndex, &Node)| {
        let style = if is_unreachable(node) { "\"filled,dashed\"" } else { "filled" };
        format!("shape=box style={style} fillcolor=\"{}\"", fill(node))
    };
    format!(
        "{}",
        Dot::with_attr_getters(graph, &[], &edge_attributes, &node_attributes)
    )
}

/// Writes `<base>.svg`, `<base>.dot` and `<base>.png` and returns the paths written.
pub fn write_diagrams(topology: &TopologyGraph, base: &Path) -> Result<Vec<PathBuf>, DiagramError> {
    let svg = render_svg(topology);
    let svg_path = suffixed(base, ".svg");
    fs::write(&svg_path, &svg)?;

    let dot_path = suffixed(base, ".dot");
    fs::write(&dot_path, render_dot(topology))?;

    let png_path = suffixed(base, ".png");
    fs::write(&png_path, render_png(&svg)?)?;

    debug!(base = %base.display(), "diagrams written");
    Ok(vec![svg_path, dot_path, png_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        network::{
            endpoint::{BmcIdentity, BmcType, DiscoveryProtocol, MacTableEntry, NeighborRecord},
            switch::{KnownSwitches, SwitchInterface},
        },
        parsers::SwitchRecords,
        topology::{
            correlation::{CorrelationEngine, CorrelationInput, SwitchObservation},
            warning::Warnings,
        },
    };

    fn topology() -> TopologyGraph {
        let records = SwitchRecords {
            neighbors: vec![NeighborRecord {
                interface: SwitchInterface::new("nexus9k-1", "Eth1/1"),
                protocol: DiscoveryProtocol::Lldp,
                device_name: "nexus9k-2".into(),
                mac: None,
                platform: None,
                capabilities: Vec::new(),
                remote_interface: Some("Eth1/1".into()),
            }],
            mac_table: vec![
                MacTableEntry {
                    interface: SwitchInterface::new("nexus9k-1", "Eth1/10"),
                    mac: "00:11:22:33:44:55".parse().unwrap(),
                    vlan: None,
                },
                MacTableEntry {
                    interface: SwitchInterface::new("nexus9k-1", "Eth1/11"),
                    mac: "aa:bb:cc:00:00:01".parse().unwrap(),
                    vlan: None,
                },
            ],
            ..Default::default()
        };
        CorrelationEngine::new(KnownSwitches::new(["nexus9k-1", "nexus9k-2"])).correlate(CorrelationInput {
            switches: vec![
                SwitchObservation { hostname: "nexus9k-1".into(), records: Some(records) },
                SwitchObservation { hostname: "nexus9k-2".into(), records: None },
            ],
            bmc_identities: vec![BmcIdentity {
                mac: "00:11:22:33:44:55".parse().unwrap(),
                hostname: "db<01>&co".into(),
                bmc_type: BmcType::Idrac,
                source: "192.168.1.101".into(),
            }],
            warnings: Warnings::default(),
        })
    }

    #[test]
    fn test_svg_escapes_names_and_styles_nodes() {
        let svg = render_svg(&topology());
        assert!(svg.contains("db&lt;01&gt;&amp;co"));
        assert!(!svg.contains("db<01>"));
        assert!(svg.contains("#90ee90"));
        assert!(svg.contains("#d3d3d3"));
        // unreachable switch box and unverified link are both dashed
        assert!(svg.contains(r#"stroke-dasharray="5,3""#));
        assert!(svg.contains(r#"stroke-dasharray="6,4""#));
        assert!(Tree::from_str(&svg, &usvg::Options::default()).is_ok());
    }

    #[test]
    fn test_png_signature() {
        let png = render_png(&render_svg(&topology())).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_dot_output() {
        let dot = render_dot(&topology());
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("fillcolor=\"#add8e6\""));
        assert!(dot.contains("style=dashed"));
    }

    #[test]
    fn test_write_diagrams() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_diagrams(&topology(), &dir.path().join("network_diagram")).unwrap();
        assert_eq!(written.len(), 3);
        for path in written {
            assert!(path.exists(), "{}", path.display());
        }
    }

    #[test]
    fn test_dotted_base_name_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_diagrams(&topology(), &dir.path().join("net.v2")).unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["net.v2.svg", "net.v2.dot", "net.v2.png"]);
    }
}
