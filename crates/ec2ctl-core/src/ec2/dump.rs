//! JSON dumps of provider responses
//!
//! Files are named after the resource they describe: `<instance-id>.json`
//! for one instance, `all_instances.json` for a full listing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CoreError, Result};

/// File name used when every instance is dumped
pub const ALL_INSTANCES_FILE: &str = "all_instances.json";

/// Envelope written around every dump
#[derive(Debug, Serialize, Deserialize)]
pub struct DumpFile<T> {
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub region: String,
    pub data: T,
}

/// `<id>.json`, or `all_instances.json` when no id is given
pub fn dump_file_name(resource_id: Option<&str>) -> String {
    match resource_id {
        Some(id) => format!("{id}.json"),
        None => ALL_INSTANCES_FILE.to_string(),
    }
}

/// Write `data` as pretty JSON to `<dir>/<file_name>`, replacing any previous dump
pub fn write_dump<T: Serialize>(
    dir: &Path,
    file_name: &str,
    region: &str,
    data: &T,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| CoreError::io(dir.display().to_string(), e))?;

    let dump = DumpFile {
        generated_at: Utc::now().to_rfc3339(),
        region: region.to_string(),
        data,
    };
    let content = serde_json::to_string_pretty(&dump)?;

    let path = dir.join(file_name);
    fs::write(&path, content).map_err(|e| CoreError::io(path.display().to_string(), e))?;
    debug!(path = %path.display(), "Wrote dump");
    Ok(path)
}

/// Dump one resource (named by id) or a full listing
pub fn dump_resources<T: Serialize>(
    dir: &Path,
    resource_id: Option<&str>,
    region: &str,
    data: &T,
) -> Result<PathBuf> {
    write_dump(dir, &dump_file_name(resource_id), region, data)
}
