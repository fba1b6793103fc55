use std::{fs, path::Path};

use anyhow::{Context, Result};

use super::models::RunReport;

pub const PREVIEW_BYTES: usize = 256;

/// Writes the machine-readable report as pretty JSON, creating parent
/// directories as needed.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }

    let rendered = serde_json::to_string_pretty(report).context("serializing report")?;
    fs::write(path, rendered).with_context(|| format!("writing report to {}", path.display()))?;
    Ok(())
}

pub(super) fn create_preview(bytes: &[u8], limit: usize) -> String {
    let slice = if bytes.len() > limit {
        &bytes[..limit]
    } else {
        bytes
    };
    match std::str::from_utf8(slice) {
        Ok(text) => text.to_string(),
        Err(err) if err.error_len().is_none() && err.valid_up_to() > 0 => {
            // cut through a multi-byte character
            String::from_utf8_lossy(&slice[..err.valid_up_to()]).into_owned()
        }
        Err(_) => hex::encode(slice),
    }
}
