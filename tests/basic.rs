use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde_json::json;
use specpit::config::{load_config, CliOverrides, SettingsBuilder};
use specpit::env::{expand_json, expand_placeholders, Scope};
use specpit::executor::Runner;
use specpit::suite::{discover_suites, load_suite};
use tempfile::tempdir;

#[test]
fn expand_placeholders_respects_escapes() -> Result<()> {
    let mut captures = HashMap::new();
    captures.insert("NAME".to_string(), "specpit".to_string());
    let variables = HashMap::new();

    let rendered = expand_placeholders(
        r"Hello \{literal\} {NAME}!",
        &Scope::new(&captures, &variables),
    )?;
    assert_eq!(rendered, "Hello {literal} specpit!");
    Ok(())
}

#[test]
fn expand_json_generates_fresh_values_per_leaf() -> Result<()> {
    let empty = HashMap::new();
    let scope = Scope::new(&empty, &empty);
    let body = json!({"first": "{$email}", "second": "{$email}", "digits": "{$numeric:5}"});

    let expanded = expand_json(&body, &scope)?;
    assert_ne!(expanded["first"], expanded["second"]);
    assert_eq!(expanded["digits"].as_str().map(str::len), Some(5));
    Ok(())
}

#[tokio::test]
async fn shipped_serverest_suite_is_valid() -> Result<()> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("suites/serverest.suite.json");
    let suite = load_suite(&path).await?;

    assert_eq!(suite.name, "ServeRest API");
    assert_eq!(suite.setup.len(), 2);
    assert_eq!(suite.before_each.len(), 1);
    assert_eq!(suite.sequences.len(), 3);
    assert_eq!(suite.headers.get("monitor").map(String::as_str), Some("false"));
    Ok(())
}

#[tokio::test]
async fn config_profile_overrides_suite_defaults() -> Result<()> {
    let temp = tempdir()?;
    let base = temp.path();

    write_file(
        base.join("specpit.json"),
        r#"{
  "defaultProfile": "local",
  "profiles": {
    "local": {
      "baseUrl": "http://localhost:3000",
      "env": "local.env",
      "preflight": false,
      "defaultHeaders": {"monitor": "false"}
    }
  }
}
"#,
    )?;
    write_file(base.join("local.env"), "PASSWORD=from-env\n")?;
    write_file(
        base.join("suites/login.suite.json"),
        r#"{
  "name": "login",
  "baseUrl": "https://serverest.dev",
  "variables": {"PASSWORD": "123456789"},
  "sequences": [
    {"name": "login", "scenarios": [
      {"name": "login", "method": "POST", "path": "/login",
       "json": {"password": "{PASSWORD}"}, "expect": {"status": 200}}
    ]}
  ]
}
"#,
    )?;

    let config = load_config(base)?.expect("config should load");
    let settings = SettingsBuilder::new(
        base.to_path_buf(),
        base.to_path_buf(),
        Some(config),
        None,
        None,
        CliOverrides::default(),
    )
    .build()?;

    let paths = discover_suites(&base.join("suites"))?;
    assert_eq!(paths.len(), 1);

    let runner = Runner::new(settings)?;
    let prepared = runner.prepare(load_suite(&paths[0]).await?).await?;

    assert_eq!(
        prepared.base_url.as_ref().map(|u| u.as_str()),
        Some("http://localhost:3000/")
    );
    assert_eq!(prepared.variables["PASSWORD"], "from-env");
    assert_eq!(prepared.headers["monitor"], "false");
    Ok(())
}

fn write_file(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}
