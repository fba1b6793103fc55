mod loader;
mod settings;

pub use loader::{load_config, LoadedConfig, ProfileConfig, SpecpitConfig, CONFIG_FILE_NAME};
pub use settings::{
    CliOverrides, RunSettings, SettingsBuilder, DEFAULT_MAX_IN_FLIGHT, DEFAULT_TIMEOUT_MS,
};
