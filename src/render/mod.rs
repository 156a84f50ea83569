//! Output formats for a correlated topology: the text report, the diagram files and the JSON
//! snapshot.

pub mod diagram;
pub mod output;
pub mod report;

use std::path::{Path, PathBuf};

pub use output::write_outputs;

/// `<base><suffix>`. Unlike `Path::with_extension` this never eats a dot already in `base`.
pub fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
