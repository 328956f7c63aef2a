//! Local record of a pipeline run.

use std::path::{Path, PathBuf};

use chrono::{Local, SecondsFormat};

use crate::command;
use crate::error::{Error, Result};
use crate::io::{self, FileKind};
use crate::pipeline::PipelineResult;

pub const SUMMARY_FILE: &str = "summary.json";

/// Current local time in RFC 3339.
pub fn timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Commit checked out in the working directory, if it is a git checkout.
pub fn local_commit() -> Option<String> {
    command::run_in_optional(".", "git", &["rev-parse", "HEAD"])
}

/// Write `summary.json` into the log directory.
pub fn write_summary(log_directory: &Path, result: &PipelineResult) -> Result<PathBuf> {
    let path = log_directory.join(SUMMARY_FILE);
    let content = serde_json::to_string_pretty(result)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize summary".to_string())))?;
    io::write_file_atomic(&path, &content, FileKind::Summary)?;
    Ok(path)
}
