use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

pub const CONFIG_FILE_NAME: &str = "specpit.json";

/// Settings shared by the root of `specpit.json` and each of its profiles.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileConfig {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_in_flight: Option<usize>,
    pub report: Option<String>,
    pub env: Option<String>,
    pub preflight: Option<bool>,
    pub variables: HashMap<String, String>,
    pub default_headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecpitConfig {
    pub profiles: HashMap<String, ProfileConfig>,
    pub default_profile: Option<String>,
    #[serde(flatten)]
    pub root: ProfileConfig,
    /// Root keys that matched neither a setting nor `profiles`.
    #[serde(flatten)]
    unknown: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SpecpitConfig,
    pub path: PathBuf,
    pub dir: PathBuf,
}

/// Loads `specpit.json` from a directory, or the given file. A missing file
/// is not an error.
pub fn load_config(target: &Path) -> Result<Option<LoadedConfig>> {
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        std::env::current_dir()?.join(target)
    };

    let (file_path, dir) = if resolved.is_dir() {
        (resolved.join(CONFIG_FILE_NAME), resolved)
    } else {
        let dir = match resolved.parent() {
            Some(parent) => parent.to_path_buf(),
            None => std::env::current_dir()?,
        };
        (resolved, dir)
    };

    if !file_path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&file_path)
        .with_context(|| format!("reading config {}", file_path.display()))?;

    let config: SpecpitConfig = serde_json::from_str(&contents)
        .with_context(|| format!("parsing config {}", file_path.display()))?;
    if !config.unknown.is_empty() {
        let keys: Vec<&str> = config.unknown.keys().map(String::as_str).collect();
        bail!(
            "parsing config {}: unknown field(s) {}",
            file_path.display(),
            keys.join(", ")
        );
    }

    Ok(Some(LoadedConfig {
        config,
        path: file_path,
        dir,
    }))
}
