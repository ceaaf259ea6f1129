#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Four-role input shared by the pipeline and CLI tests: one row per
/// assembly shape plus one row with nothing usable.
pub const PLACES_CSV: &str = "\
Village,Street,Town,County
Borki,Polna 7,Nysa,Nyski
Opole,,,opole
,Krucza 3,Prudnik,Prudnicki
,,,
";

/// Renders a run configuration for [`PLACES_CSV`]-shaped inputs.
pub fn places_config_yaml(input: &Path, mode: &str, endpoint: &str, output_dir: &Path) -> String {
    format!(
        "input:\n  path: {input}\ncolumns:\n  street: 2\n  secondary_place: 1\n  primary_place: 3\n  county: 4\nsearch:\n  mode: {mode}\n  delay_ms: 0\n  endpoint: {endpoint}\noutput:\n  dir: {output_dir}\n",
        input = input.display(),
        output_dir = output_dir.display(),
    )
}
