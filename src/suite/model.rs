use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};

use serde::Deserialize;
use serde_json::Value;

fn default_method() -> String {
    "GET".to_string()
}

/// A suite file: shared defaults, hooks and independent sequences.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Suite {
    pub name: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Runs once, before any sequence; captures seed every sequence.
    #[serde(default)]
    pub setup: Vec<Scenario>,
    /// Runs inside each sequence before every one of its scenarios.
    #[serde(default)]
    pub before_each: Vec<Scenario>,
    #[serde(default)]
    pub sequences: Vec<Sequence>,
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Scenarios that share one execution context and run strictly in order.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Sequence {
    pub name: String,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub json: Option<Value>,
    pub expect: Expectation,
    /// Capture name to field path (`_id`, `data.items.0.id` or `/data/id`).
    #[serde(default)]
    pub capture: BTreeMap<String, String>,
    /// Captures that must already exist before the request is built.
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Expectation {
    pub status: u16,
    #[serde(default)]
    pub body_contains: Option<String>,
    #[serde(default)]
    pub schema: Option<Value>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: None,
            headers: BTreeMap::new(),
            variables: HashMap::new(),
            timeout_ms: None,
            setup: Vec::new(),
            before_each: Vec::new(),
            sequences: Vec::new(),
            source: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_setup(mut self, scenario: Scenario) -> Self {
        self.setup.push(scenario);
        self
    }

    pub fn with_before_each(mut self, scenario: Scenario) -> Self {
        self.before_each.push(scenario);
        self
    }

    pub fn with_sequence(mut self, name: impl Into<String>, scenarios: Vec<Scenario>) -> Self {
        self.sequences.push(Sequence {
            name: name.into(),
            scenarios,
        });
        self
    }

    pub fn scenario_count(&self) -> usize {
        self.setup.len() + self.sequences.iter().map(|s| s.scenarios.len()).sum::<usize>()
    }

    pub fn display_name(&self) -> String {
        match &self.source {
            Some(path) => format!("{} ({})", self.name, path.display()),
            None => self.name.clone(),
        }
    }
}

impl Scenario {
    pub fn is_absolute(&self) -> bool {
        is_absolute_url(&self.path)
    }
}

/// True for paths carrying their own `http://` or `https://` scheme, in any
/// letter case.
pub(crate) fn is_absolute_url(raw: &str) -> bool {
    let has_prefix = |prefix: &str| {
        raw.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    has_prefix("http://") || has_prefix("https://")
}
