use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use jsonschema::{Draft, Validator};
use once_cell::sync::Lazy;
use serde_json::Value;
use tokio::fs;
use walkdir::WalkDir;

use super::model::{Scenario, Suite};

pub const SUITE_SUFFIX: &str = ".suite.json";

static HTTP_METHODS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "HEAD", "TRACE",
    ]
    .into_iter()
    .collect()
});

pub async fn load_suite(path: &Path) -> Result<Suite> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading suite file {}", path.display()))?;

    let mut suite: Suite = serde_json::from_str(&raw)
        .with_context(|| format!("parsing suite file {}", path.display()))?;
    suite.source = Some(path.to_path_buf());

    validate_suite(&suite).with_context(|| format!("validating suite {}", path.display()))?;
    Ok(suite)
}

/// Expands a suite path: a file is used as is, a directory is walked for
/// `*.suite.json` files in sorted order.
pub fn discover_suites(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        bail!("suite path {} does not exist", path.display());
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", path.display()))?;
        let is_suite = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(SUITE_SUFFIX));
        if entry.file_type().is_file() && is_suite {
            found.push(entry.into_path());
        }
    }

    if found.is_empty() {
        bail!(
            "no *{} files found under {}",
            SUITE_SUFFIX,
            path.display()
        );
    }
    Ok(found)
}

pub(crate) fn compile_schema(schema: &Value) -> Result<Validator> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| anyhow!("invalid schema: {err}"))
}

/// Rejects definitions that cannot run as declared. Called before anything is
/// sent so that a malformed suite aborts the whole run.
pub fn validate_suite(suite: &Suite) -> Result<()> {
    if suite.name.trim().is_empty() {
        bail!("suite name must not be empty");
    }
    if suite.timeout_ms == Some(0) {
        bail!("suite timeoutMs must be greater than zero");
    }
    if suite.scenario_count() == 0 {
        bail!("suite {} declares no scenarios", suite.name);
    }

    let mut available: HashSet<&str> = HashSet::new();
    for scenario in &suite.setup {
        validate_scenario("setup", scenario, &available)?;
        available.extend(scenario.capture.keys().map(String::as_str));
    }
    for scenario in &suite.before_each {
        validate_scenario("beforeEach", scenario, &available)?;
        available.extend(scenario.capture.keys().map(String::as_str));
    }

    let mut names = HashSet::new();
    for sequence in &suite.sequences {
        if sequence.name.trim().is_empty() {
            bail!("sequence name must not be empty");
        }
        if !names.insert(sequence.name.as_str()) {
            bail!("duplicate sequence name: {}", sequence.name);
        }
        if sequence.scenarios.is_empty() {
            bail!("sequence {} declares no scenarios", sequence.name);
        }

        let mut sequence_available = available.clone();
        for scenario in &sequence.scenarios {
            validate_scenario(&sequence.name, scenario, &sequence_available)?;
            sequence_available.extend(scenario.capture.keys().map(String::as_str));
        }
    }

    Ok(())
}

fn validate_scenario(group: &str, scenario: &Scenario, available: &HashSet<&str>) -> Result<()> {
    let label = format!("{} › {}", group, scenario.name);

    if scenario.name.trim().is_empty() {
        bail!("{group}: scenario name must not be empty");
    }
    if scenario.path.trim().is_empty() {
        bail!("{label}: path must not be empty");
    }
    if !HTTP_METHODS.contains(scenario.method.to_ascii_uppercase().as_str()) {
        bail!("{label}: unsupported HTTP method {}", scenario.method);
    }
    if !(100..=599).contains(&scenario.expect.status) {
        bail!(
            "{label}: expected status {} is not a valid HTTP status",
            scenario.expect.status
        );
    }
    if scenario.timeout_ms == Some(0) {
        bail!("{label}: timeoutMs must be greater than zero");
    }
    if let Some(schema) = &scenario.expect.schema {
        compile_schema(schema).with_context(|| format!("{label}: schema"))?;
    }
    for (name, path) in &scenario.capture {
        if !is_capture_name(name) {
            bail!("{label}: invalid capture name {name:?}");
        }
        if path.trim().is_empty() {
            bail!("{label}: capture {name} has an empty field path");
        }
    }
    for name in &scenario.requires {
        if !available.contains(name.as_str()) {
            bail!("{label}: requires capture {name:?}, which no earlier scenario provides");
        }
    }
    Ok(())
}

fn is_capture_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
}
