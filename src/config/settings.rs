use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};

use crate::env::{load_env_file, EnvMap};

use super::loader::{LoadedConfig, ProfileConfig, SpecpitConfig};

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

fn resolve_relative(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

/// Values given on the command line; they win over every config layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_in_flight: Option<usize>,
    pub report: Option<PathBuf>,
    pub no_preflight: bool,
}

/// Run-wide settings. Suite files fill in whatever is still unset when they
/// are prepared for execution.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub max_in_flight: usize,
    pub report_path: Option<PathBuf>,
    pub preflight: bool,
    pub variables: EnvMap,
    pub default_headers: BTreeMap<String, String>,
    pub profile_name: Option<String>,
    pub env_files: Vec<PathBuf>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: None,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            report_path: None,
            preflight: true,
            variables: EnvMap::new(),
            default_headers: BTreeMap::new(),
            profile_name: None,
            env_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsBuilder {
    base_dir: PathBuf,
    config_dir: PathBuf,
    config: Option<LoadedConfig>,
    requested_profile: Option<String>,
    explicit_env: Option<PathBuf>,
    overrides: CliOverrides,
}

impl SettingsBuilder {
    pub fn new(
        base_dir: PathBuf,
        config_dir: PathBuf,
        config: Option<LoadedConfig>,
        requested_profile: Option<String>,
        explicit_env: Option<PathBuf>,
        overrides: CliOverrides,
    ) -> Self {
        Self {
            base_dir,
            config_dir,
            config,
            requested_profile,
            explicit_env,
            overrides,
        }
    }

    pub fn build(&self) -> Result<RunSettings> {
        let mut settings = RunSettings::default();
        let mut env_path: Option<PathBuf> = None;

        if let Some(cfg) = &self.config {
            let root = &cfg.config.root;
            self.apply_layer(&mut settings, root, &mut env_path);

            if let Some(profile) =
                resolve_profile(&cfg.config, self.requested_profile.as_deref())?
            {
                settings.profile_name = Some(profile.name);
                self.apply_layer(&mut settings, profile.config, &mut env_path);
            }
        } else if let Some(name) = &self.requested_profile {
            bail!("Unknown profile: {} (no configuration file found)", name);
        }

        if let Some(explicit) = &self.explicit_env {
            env_path = Some(explicit.clone());
        }

        if let Some(path) = env_path {
            let loaded = load_env_file(&path)?;
            settings.variables.extend(loaded);
            settings.env_files.push(path);
        }

        let overrides = &self.overrides;
        if let Some(url) = &overrides.base_url {
            settings.base_url = Some(url.clone());
        }
        if let Some(ms) = overrides.timeout_ms {
            settings.timeout = Some(Duration::from_millis(ms));
        }
        if let Some(limit) = overrides.max_in_flight {
            settings.max_in_flight = limit;
        }
        if let Some(report) = &overrides.report {
            settings.report_path = Some(resolve_relative(&self.base_dir, report));
        }
        if overrides.no_preflight {
            settings.preflight = false;
        }

        if settings.max_in_flight == 0 {
            bail!("maxInFlight must be at least 1");
        }
        if settings.timeout == Some(Duration::ZERO) {
            bail!("timeout must be greater than zero");
        }

        Ok(settings)
    }

    fn apply_layer(
        &self,
        settings: &mut RunSettings,
        layer: &ProfileConfig,
        env_path: &mut Option<PathBuf>,
    ) {
        if let Some(url) = &layer.base_url {
            settings.base_url = Some(url.clone());
        }
        if let Some(ms) = layer.timeout_ms {
            settings.timeout = Some(Duration::from_millis(ms));
        }
        if let Some(limit) = layer.max_in_flight {
            settings.max_in_flight = limit;
        }
        if let Some(report) = &layer.report {
            settings.report_path = Some(resolve_relative(&self.config_dir, Path::new(report)));
        }
        if let Some(env) = &layer.env {
            *env_path = Some(resolve_relative(&self.config_dir, Path::new(env)));
        }
        if let Some(preflight) = layer.preflight {
            settings.preflight = preflight;
        }
        settings.variables.extend(layer.variables.clone());
        settings.default_headers.extend(layer.default_headers.clone());
    }
}

struct ResolvedProfile<'a> {
    name: String,
    config: &'a ProfileConfig,
}

fn resolve_profile<'a>(
    config: &'a SpecpitConfig,
    requested: Option<&str>,
) -> Result<Option<ResolvedProfile<'a>>> {
    if let Some(name) = requested {
        let profile = config
            .profiles
            .get(name)
            .with_context(|| format!("Unknown profile: {}", name))?;
        return Ok(Some(ResolvedProfile {
            name: name.to_string(),
            config: profile,
        }));
    }

    if let Some(default) = &config.default_profile {
        let profile = config
            .profiles
            .get(default)
            .with_context(|| format!("Default profile {} is not defined", default))?;
        return Ok(Some(ResolvedProfile {
            name: default.to_string(),
            config: profile,
        }));
    }

    Ok(None)
}
