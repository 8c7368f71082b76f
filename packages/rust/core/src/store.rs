//! JSON file helpers shared by the partition, manifest, and index writers.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use skillsync_shared::{Result, SyncError};
use tracing::debug;

/// Render a value the way every registry file is stored: pretty JSON plus a
/// trailing newline.
pub(crate) fn render_json<T: Serialize>(data: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(data)
        .map_err(|e| SyncError::validation(format!("JSON serialization failed: {e}")))?;
    json.push('\n');
    Ok(json)
}

/// Read and parse a JSON file. `Ok(None)` when the file does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SyncError::io(path, e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| SyncError::validation(format!("invalid JSON in {}: {e}", path.display())))
}

/// Write a file atomically (write to a sibling temp file, then rename).
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| SyncError::validation(format!("{} has no parent", path.display())))?;
    std::fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dir.join(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| SyncError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| SyncError::io(path, e))?;

    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

/// SHA-256 of content, lowercase hex.
pub(crate) fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
