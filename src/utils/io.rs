//! Reads and writes of the files pairci owns. Every error names the kind of
//! file and its path.

use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    CiMap,
    HostConfig,
    Settings,
    JobLog,
    Summary,
}

impl FileKind {
    pub fn label(self) -> &'static str {
        match self {
            FileKind::CiMap => "CI map",
            FileKind::HostConfig => "host config",
            FileKind::Settings => "pairci.json",
            FileKind::JobLog => "job log",
            FileKind::Summary => "pipeline summary",
        }
    }

    fn missing_hint(self) -> Option<&'static str> {
        match self {
            FileKind::CiMap => Some(
                "Pass --ci-map, or run 'pairci config set /defaults/ci_map_path <path>'",
            ),
            FileKind::JobLog | FileKind::Summary => {
                Some("The log directory was removed while the pipeline was running")
            }
            FileKind::HostConfig | FileKind::Settings => None,
        }
    }
}

fn io_error(kind: FileKind, action: &str, path: &Path, err: std::io::Error) -> Error {
    let not_found = err.kind() == ErrorKind::NotFound;
    let error = Error::internal_io(
        err.to_string(),
        Some(format!("{} {} {}", action, kind.label(), path.display())),
    );
    match kind.missing_hint() {
        Some(hint) if not_found => error.with_hint(hint),
        _ => error,
    }
}

pub fn read_file(path: &Path, kind: FileKind) -> Result<String> {
    fs::read_to_string(path).map_err(|e| io_error(kind, "read", path, e))
}

pub fn write_file(path: &Path, content: &str, kind: FileKind) -> Result<()> {
    fs::write(path, content).map_err(|e| io_error(kind, "write", path, e))
}

/// Write through `<name>.tmp` and rename, so readers never see a partial file.
pub fn write_file_atomic(path: &Path, content: &str, kind: FileKind) -> Result<()> {
    let (Some(parent), Some(filename)) = (path.parent(), path.file_name()) else {
        return Err(Error::internal_io(
            format!("Invalid path: {}", path.display()),
            Some(format!("write {}", kind.label())),
        ));
    };

    let tmp_path = parent.join(format!("{}.tmp", filename.to_string_lossy()));
    fs::write(&tmp_path, content).map_err(|e| io_error(kind, "write", &tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| io_error(kind, "replace", path, e))
}
