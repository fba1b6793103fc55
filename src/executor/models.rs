use std::{collections::BTreeMap, path::PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Why a single scenario failed. Every variant is local to its scenario; the
/// run carries on with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScenarioFailure {
    #[error("transport failure: {message}")]
    Transport { message: String },
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("unexpected status: got {actual} want {expected}")]
    StatusMismatch { actual: u16, expected: u16 },
    #[error("body did not contain expected substring {expected:?}")]
    BodyMismatch { expected: String },
    #[error("schema violation: {}", .violations.join("; "))]
    SchemaViolation { violations: Vec<String> },
    #[error("capture field not found: {path} (capture {name})")]
    CaptureNotFound { name: String, path: String },
    #[error("missing dependency: {name} was never captured")]
    MissingDependency { name: String },
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Setup,
    BeforeEach,
    Test,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::BeforeEach => "beforeEach",
            Phase::Test => "test",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub name: String,
    pub sequence: String,
    pub phase: Phase,
    pub method: String,
    pub url: Option<String>,
    pub status: Option<u16>,
    pub duration_ms: f64,
    pub failure: Option<ScenarioFailure>,
    pub message: Option<String>,
    pub captured: BTreeMap<String, String>,
    pub body_preview: Option<String>,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    /// True when the request never left the runner.
    pub fn was_sent(&self) -> bool {
        !matches!(
            self.failure,
            Some(ScenarioFailure::MissingDependency { .. })
                | Some(ScenarioFailure::InvalidRequest { .. })
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceReport {
    pub name: String,
    pub duration_ms: f64,
    pub results: Vec<ScenarioResult>,
}

impl SequenceReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(ScenarioResult::passed)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub name: String,
    pub source: Option<PathBuf>,
    pub base_url: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: f64,
    pub setup: Vec<ScenarioResult>,
    pub sequences: Vec<SequenceReport>,
}

impl SuiteReport {
    pub fn results(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.setup
            .iter()
            .chain(self.sequences.iter().flat_map(|s| s.results.iter()))
    }

    pub fn summary(&self) -> Summary {
        Summary::from_results(self.results())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl Summary {
    fn from_results<'a>(results: impl Iterator<Item = &'a ScenarioResult>) -> Self {
        results.fold(Summary::default(), |mut acc, result| {
            acc.total += 1;
            if result.passed() {
                acc.passed += 1;
            } else {
                acc.failed += 1;
            }
            acc
        })
    }

    fn merge(self, other: Summary) -> Self {
        Summary {
            total: self.total + other.total,
            passed: self.passed + other.passed,
            failed: self.failed + other.failed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: Summary,
    pub suites: Vec<SuiteReport>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, suites: Vec<SuiteReport>) -> Self {
        let summary = suites
            .iter()
            .map(SuiteReport::summary)
            .fold(Summary::default(), Summary::merge);
        Self {
            started_at,
            finished_at: Utc::now(),
            summary,
            suites,
        }
    }

    pub fn success(&self) -> bool {
        self.summary.failed == 0
    }
}
