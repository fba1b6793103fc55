use std::collections::HashMap;

pub type EnvMap = HashMap<String, String>;

mod generators;
mod loader;
mod placeholders;

pub use generators::generate;
pub use loader::load_env_file;
pub use placeholders::{expand_json, expand_placeholders, PlaceholderError, Scope};
