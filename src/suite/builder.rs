use std::collections::BTreeMap;

use serde_json::Value;

use super::model::{Expectation, Scenario};

/// Builds a [`Scenario`] in code. Every step consumes the builder, so the
/// finished scenario is a plain value with no shared state.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl Scenario {
    pub fn builder(
        name: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> ScenarioBuilder {
        ScenarioBuilder {
            scenario: Scenario {
                name: name.into(),
                method: method.into().to_ascii_uppercase(),
                path: path.into(),
                headers: BTreeMap::new(),
                json: None,
                expect: Expectation {
                    status: 200,
                    body_contains: None,
                    schema: None,
                },
                capture: BTreeMap::new(),
                requires: Vec::new(),
                timeout_ms: None,
            },
        }
    }

    pub fn get(name: impl Into<String>, path: impl Into<String>) -> ScenarioBuilder {
        Self::builder(name, "GET", path)
    }

    pub fn post(name: impl Into<String>, path: impl Into<String>) -> ScenarioBuilder {
        Self::builder(name, "POST", path)
    }

    pub fn delete(name: impl Into<String>, path: impl Into<String>) -> ScenarioBuilder {
        Self::builder(name, "DELETE", path)
    }
}

impl ScenarioBuilder {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.scenario.headers.insert(name.into(), value.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.scenario.json = Some(body);
        self
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.scenario.expect.status = status;
        self
    }

    pub fn expect_body_contains(mut self, needle: impl Into<String>) -> Self {
        self.scenario.expect.body_contains = Some(needle.into());
        self
    }

    pub fn expect_schema(mut self, schema: Value) -> Self {
        self.scenario.expect.schema = Some(schema);
        self
    }

    pub fn capture(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.scenario.capture.insert(name.into(), path.into());
        self
    }

    pub fn requires(mut self, capture: impl Into<String>) -> Self {
        self.scenario.requires.push(capture.into());
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.scenario.timeout_ms = Some(ms);
        self
    }

    pub fn build(self) -> Scenario {
        self.scenario
    }
}
