//! Fixture file parsing
//!
//! Turns CSV and YAML fixture files into [`Test`]s, in file order.

pub mod tabular;
pub mod tree;
pub mod yaml;

use std::path::{Path, PathBuf};

use crate::common::{Error, Result};
use crate::engine::Test;

/// Load the tests declared in a fixture file, picking the parser by extension
pub fn load(path: &Path) -> Result<Vec<Test>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => tabular::parse_file(path),
        Some("yaml") | Some("yml") => yaml::parse_file(path),
        _ => Err(Error::Config(format!(
            "Unsupported spec file format: {}",
            path.display()
        ))),
    }
}

/// Directory containing `path`, `.` for bare file names
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
