use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use futures_util::future::join_all;
use jsonschema::Validator;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::{RunSettings, DEFAULT_TIMEOUT_MS},
    env::{expand_json, expand_placeholders, EnvMap, PlaceholderError, Scope},
    suite::{compile_schema, is_absolute_url, Scenario, Sequence, Suite},
};

use super::{
    assertions::evaluate,
    context::ExecutionContext,
    models::{Phase, RunReport, ScenarioFailure, ScenarioResult, SequenceReport, SuiteReport},
    writer::{create_preview, PREVIEW_BYTES},
};

const SETUP_SEQUENCE: &str = "setup";

/// A suite merged with the run settings, checked and ready to execute.
#[derive(Debug, Clone)]
pub struct PreparedSuite {
    pub suite: Suite,
    pub base_url: Option<Url>,
    pub headers: BTreeMap<String, String>,
    pub variables: EnvMap,
    pub timeout: Duration,
    /// Compiled response schemas keyed by their JSON text.
    pub schemas: HashMap<String, Validator>,
}

impl PreparedSuite {
    fn validator(&self, schema: &serde_json::Value) -> Result<&Validator, ScenarioFailure> {
        self.schemas
            .get(&schema.to_string())
            .ok_or_else(|| ScenarioFailure::InvalidRequest {
                message: "response schema was not compiled for this suite".to_string(),
            })
    }
}

/// Executes prepared suites. Sequences of a suite run concurrently; the
/// number of requests on the wire at once is capped by `max_in_flight`.
#[derive(Debug, Clone)]
pub struct Runner {
    client: Client,
    limiter: Arc<Semaphore>,
    settings: RunSettings,
}

impl Runner {
    pub fn new(settings: RunSettings) -> Result<Self> {
        if settings.max_in_flight == 0 {
            bail!("maxInFlight must be at least 1");
        }
        let client = Client::builder()
            .user_agent(concat!("specpit/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            client,
            limiter: Arc::new(Semaphore::new(settings.max_in_flight)),
            settings,
        })
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Layers run settings over the suite's own defaults and checks what can
    /// only be checked once both are known. Errors here abort the run.
    pub async fn prepare(&self, suite: Suite) -> Result<PreparedSuite> {
        let raw_base = self.settings.base_url.clone().or_else(|| suite.base_url.clone());
        let base_url = raw_base
            .as_deref()
            .map(parse_base_url)
            .transpose()
            .with_context(|| format!("suite {}", suite.display_name()))?;

        if base_url.is_none() {
            let relative = all_scenarios(&suite)
                .find(|scenario| !scenario.is_absolute() && !scenario.path.starts_with('{'));
            if let Some(scenario) = relative {
                bail!(
                    "suite {}: scenario {} uses relative path {} but no base URL is configured",
                    suite.display_name(),
                    scenario.name,
                    scenario.path
                );
            }
        }

        let timeout = self
            .settings
            .timeout
            .or_else(|| suite.timeout_ms.map(Duration::from_millis))
            .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS));

        let headers: BTreeMap<String, String> = suite
            .headers
            .iter()
            .chain(self.settings.default_headers.iter())
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();

        let mut schemas = HashMap::new();
        for scenario in all_scenarios(&suite) {
            let Some(schema) = &scenario.expect.schema else {
                continue;
            };
            let key = schema.to_string();
            if !schemas.contains_key(&key) {
                let validator = compile_schema(schema).with_context(|| {
                    format!("suite {}: scenario {}", suite.display_name(), scenario.name)
                })?;
                schemas.insert(key, validator);
            }
        }

        let mut variables: EnvMap = suite.variables.clone();
        variables.extend(self.settings.variables.clone());

        if let (Some(url), true) = (&base_url, self.settings.preflight) {
            self.preflight(url, timeout).await?;
        }

        Ok(PreparedSuite {
            suite,
            base_url,
            headers,
            variables,
            timeout,
            schemas,
        })
    }

    async fn preflight(&self, url: &Url, timeout: Duration) -> Result<()> {
        debug!(%url, "checking base URL");
        match self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => {
                debug!(%url, status = response.status().as_u16(), "base URL reachable");
                Ok(())
            }
            Err(err) => bail!("base URL {} is unreachable: {}", url, err),
        }
    }

    pub async fn run(&self, suites: &[PreparedSuite]) -> RunReport {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(suites.len());
        for suite in suites {
            reports.push(self.run_suite(suite).await);
        }
        RunReport::new(started_at, reports)
    }

    pub async fn run_suite(&self, prepared: &PreparedSuite) -> SuiteReport {
        let started_at = Utc::now();
        let start = Instant::now();
        info!(suite = %prepared.suite.name, "running suite");

        let mut seed = ExecutionContext::new();
        let mut setup = Vec::with_capacity(prepared.suite.setup.len());
        for scenario in &prepared.suite.setup {
            let result = self
                .execute_scenario(prepared, SETUP_SEQUENCE, Phase::Setup, scenario, &mut seed)
                .await;
            setup.push(result);
        }

        let sequences = join_all(
            prepared
                .suite
                .sequences
                .iter()
                .map(|sequence| self.run_sequence(prepared, sequence, &seed)),
        )
        .await;

        SuiteReport {
            name: prepared.suite.name.clone(),
            source: prepared.suite.source.clone(),
            base_url: prepared.base_url.as_ref().map(Url::to_string),
            started_at,
            duration_ms: elapsed_ms(start),
            setup,
            sequences,
        }
    }

    /// Runs one sequence serially in a context of its own, seeded with the
    /// setup captures. A failed scenario does not stop the sequence.
    pub async fn run_sequence(
        &self,
        prepared: &PreparedSuite,
        sequence: &Sequence,
        seed: &ExecutionContext,
    ) -> SequenceReport {
        let start = Instant::now();
        let mut context = seed.clone();
        let mut results = Vec::new();
        info!(sequence = %sequence.name, "running sequence");

        for scenario in &sequence.scenarios {
            for hook in &prepared.suite.before_each {
                let result = self
                    .execute_scenario(prepared, &sequence.name, Phase::BeforeEach, hook, &mut context)
                    .await;
                results.push(result);
            }
            let result = self
                .execute_scenario(prepared, &sequence.name, Phase::Test, scenario, &mut context)
                .await;
            results.push(result);
        }

        SequenceReport {
            name: sequence.name.clone(),
            duration_ms: elapsed_ms(start),
            results,
        }
    }

    pub async fn execute_scenario(
        &self,
        prepared: &PreparedSuite,
        sequence: &str,
        phase: Phase,
        scenario: &Scenario,
        context: &mut ExecutionContext,
    ) -> ScenarioResult {
        let start = Instant::now();
        let mut result = ScenarioResult {
            name: scenario.name.clone(),
            sequence: sequence.to_string(),
            phase,
            method: scenario.method.to_ascii_uppercase(),
            url: None,
            status: None,
            duration_ms: 0.0,
            failure: None,
            message: None,
            captured: BTreeMap::new(),
            body_preview: None,
        };

        let outcome = self
            .exchange(prepared, scenario, context, &mut result)
            .await;
        result.duration_ms = elapsed_ms(start);

        match outcome {
            Ok(captured) => {
                for (name, value) in &captured {
                    context.insert(name.clone(), value.clone());
                }
                result.captured = captured;
                debug!(sequence, scenario = %scenario.name, "scenario passed");
            }
            Err(failure) => {
                warn!(sequence, scenario = %scenario.name, %failure, "scenario failed");
                for name in scenario.capture.keys() {
                    context.remove(name);
                }
                result.message = Some(failure.to_string());
                result.failure = Some(failure);
            }
        }
        result
    }

    async fn exchange(
        &self,
        prepared: &PreparedSuite,
        scenario: &Scenario,
        context: &ExecutionContext,
        result: &mut ScenarioResult,
    ) -> Result<BTreeMap<String, String>, ScenarioFailure> {
        if let Some(name) = scenario.requires.iter().find(|name| !context.contains(name)) {
            return Err(ScenarioFailure::MissingDependency { name: name.clone() });
        }

        let request = build_request(prepared, scenario, context)?;
        result.url = Some(request.url.to_string());
        let schema = scenario
            .expect
            .schema
            .as_ref()
            .map(|schema| prepared.validator(schema))
            .transpose()?;

        let method = Method::from_bytes(result.method.as_bytes()).map_err(|err| {
            ScenarioFailure::InvalidRequest {
                message: format!("invalid HTTP method {}: {err}", result.method),
            }
        })?;

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }

        let timeout = scenario
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(prepared.timeout);

        let permit = self
            .limiter
            .acquire()
            .await
            .map_err(|err| ScenarioFailure::Transport {
                message: err.to_string(),
            })?;

        debug!(method = %result.method, url = %request.url, "sending request");
        let (status, body) = match tokio::time::timeout(timeout, read_body(builder)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) if err.is_timeout() => {
                return Err(ScenarioFailure::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Ok(Err(err)) => {
                return Err(ScenarioFailure::Transport {
                    message: err.to_string(),
                })
            }
            Err(_) => {
                return Err(ScenarioFailure::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };
        drop(permit);

        result.status = Some(status.as_u16());
        let outcome = evaluate(
            &scenario.expect,
            schema,
            &scenario.capture,
            status.as_u16(),
            &body,
        );
        if outcome.is_err() && !body.is_empty() {
            result.body_preview = Some(create_preview(&body, PREVIEW_BYTES));
        }
        outcome
    }
}

struct BuiltRequest {
    url: Url,
    headers: Vec<(String, String)>,
    json: Option<serde_json::Value>,
}

fn build_request(
    prepared: &PreparedSuite,
    scenario: &Scenario,
    context: &ExecutionContext,
) -> Result<BuiltRequest, ScenarioFailure> {
    let scope = Scope::new(context.captures(), &prepared.variables);

    let path = expand_placeholders(&scenario.path, &scope).map_err(placeholder_failure)?;
    let url = resolve_url(prepared.base_url.as_ref(), &path)?;

    let mut merged: HashMap<String, (String, String)> = HashMap::new();
    for (name, value) in prepared.headers.iter().chain(scenario.headers.iter()) {
        merged.insert(name.to_ascii_lowercase(), (name.clone(), value.clone()));
    }
    let mut headers = Vec::with_capacity(merged.len());
    for (name, value) in merged.into_values() {
        let expanded = expand_placeholders(&value, &scope).map_err(placeholder_failure)?;
        headers.push((name, expanded));
    }
    headers.sort();

    let json = scenario
        .json
        .as_ref()
        .map(|body| expand_json(body, &scope))
        .transpose()
        .map_err(placeholder_failure)?;

    Ok(BuiltRequest { url, headers, json })
}

fn resolve_url(base: Option<&Url>, path: &str) -> Result<Url, ScenarioFailure> {
    let invalid = |message: String| ScenarioFailure::InvalidRequest { message };

    if is_absolute_url(path) {
        return Url::parse(path).map_err(|err| invalid(format!("invalid URL {path}: {err}")));
    }

    let Some(base) = base else {
        return Err(invalid(format!(
            "relative path {path} requires a base URL"
        )));
    };
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|err| invalid(format!("invalid URL {joined}: {err}")))
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid base URL {raw}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("base URL {} must use http or https", raw);
    }
    Ok(url)
}

fn placeholder_failure(err: PlaceholderError) -> ScenarioFailure {
    match err {
        PlaceholderError::Missing(name) => ScenarioFailure::MissingDependency { name },
        other => ScenarioFailure::InvalidRequest {
            message: other.to_string(),
        },
    }
}

fn all_scenarios(suite: &Suite) -> impl Iterator<Item = &Scenario> {
    suite
        .setup
        .iter()
        .chain(suite.before_each.iter())
        .chain(suite.sequences.iter().flat_map(|s| s.scenarios.iter()))
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Sends the request and waits for the whole body, so a slow body counts
/// against the same timeout as the headers.
async fn read_body(builder: RequestBuilder) -> Result<(StatusCode, Vec<u8>), reqwest::Error> {
    let response = builder.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;
    Ok((status, bytes.to_vec()))
}
