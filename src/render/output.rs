use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{error, info};

use crate::{
    network::network_graph::TopologyGraph,
    render::{diagram::write_diagrams, report::render_report, suffixed},
};

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot serialize topology: {0}")]
    Json(#[from] serde_json::Error),
}

fn write(path: PathBuf, contents: impl AsRef<[u8]>) -> Result<PathBuf, OutputError> {
    fs::write(&path, contents).map_err(|source| OutputError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Writes every output next to `base` and returns the paths written.
///
/// The report is written first. A failed report or JSON write is an error; a diagram that
/// cannot be rendered or written is logged and skipped.
pub fn write_outputs(topology: &TopologyGraph, base: &Path, json: bool) -> Result<Vec<PathBuf>, OutputError> {
    let mut written = vec![write(suffixed(base, "_report.txt"), render_report(topology))?];
    info!(path = %written[0].display(), "report written");

    match write_diagrams(topology, base) {
        Ok(paths) => {
            for path in &paths {
                info!(path = %path.display(), "diagram written");
            }
            written.extend(paths);
        }
        Err(e) => error!(error = %e, "diagram rendering failed"),
    }

    if json {
        let snapshot = serde_json::to_string_pretty(&topology.snapshot())?;
        let path = write(suffixed(base, ".json"), snapshot)?;
        info!(path = %path.display(), "topology JSON written");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        network::switch::KnownSwitches,
        topology::correlation::{CorrelationEngine, CorrelationInput, SwitchObservation},
    };

    fn topology() -> TopologyGraph {
        CorrelationEngine::new(KnownSwitches::new(["nexus9k-1"])).correlate(CorrelationInput {
            switches: vec![SwitchObservation {
                hostname: "nexus9k-1".into(),
                records: None,
            }],
            ..Default::default()
        })
    }

    #[test]
    fn test_report_survives_diagram_failure() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("net");
        // a directory where the SVG should go makes the diagram write fail
        fs::create_dir(dir.path().join("net.svg")).unwrap();

        let written = write_outputs(&topology(), &base, true).unwrap();
        let report = dir.path().join("net_report.txt");
        assert!(report.is_file());
        assert!(fs::read_to_string(&report).unwrap().contains("Switch: nexus9k-1 (unreachable)"));
        assert_eq!(written, vec![report, dir.path().join("net.json")]);
        assert!(!dir.path().join("net.png").exists());
    }

    #[test]
    fn test_every_output_keeps_the_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_outputs(&topology(), &dir.path().join("net.v2"), true).unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            ["net.v2_report.txt", "net.v2.svg", "net.v2.dot", "net.v2.png", "net.v2.json"]
        );
    }

    #[test]
    fn test_unwritable_report_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("missing").join("net");
        assert!(matches!(
            write_outputs(&topology(), &base, false),
            Err(OutputError::Io { .. })
        ));
    }
}
