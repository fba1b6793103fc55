use std::collections::BTreeMap;

use jsonschema::Validator;
use serde_json::Value;

use crate::suite::Expectation;

use super::models::ScenarioFailure;

/// Runs the checks of one scenario against a response in a fixed order
/// (status, body, schema, captures) and returns the captured values.
/// `schema` is the compiled form of `expect.schema`.
pub(super) fn evaluate(
    expect: &Expectation,
    schema: Option<&Validator>,
    captures: &BTreeMap<String, String>,
    status: u16,
    body: &[u8],
) -> Result<BTreeMap<String, String>, ScenarioFailure> {
    check_status(expect.status, status)?;

    if let Some(expected) = &expect.body_contains {
        check_body_contains(&String::from_utf8_lossy(body), expected)?;
    }

    let json = serde_json::from_slice::<Value>(body).ok();
    if let Some(validator) = schema {
        check_schema(validator, json.as_ref())?;
    }

    extract_captures(captures, json.as_ref())
}

pub(super) fn check_status(expected: u16, actual: u16) -> Result<(), ScenarioFailure> {
    if expected == actual {
        Ok(())
    } else {
        Err(ScenarioFailure::StatusMismatch { actual, expected })
    }
}

pub(super) fn check_body_contains(body: &str, expected: &str) -> Result<(), ScenarioFailure> {
    if body.contains(expected) {
        Ok(())
    } else {
        Err(ScenarioFailure::BodyMismatch {
            expected: expected.to_string(),
        })
    }
}

pub(super) fn check_schema(
    validator: &Validator,
    body: Option<&Value>,
) -> Result<(), ScenarioFailure> {
    let Some(instance) = body else {
        return Err(ScenarioFailure::SchemaViolation {
            violations: vec!["response body is not valid JSON".to_string()],
        });
    };

    let violations: Vec<String> = validator
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ScenarioFailure::SchemaViolation { violations })
    }
}

pub(super) fn extract_captures(
    captures: &BTreeMap<String, String>,
    body: Option<&Value>,
) -> Result<BTreeMap<String, String>, ScenarioFailure> {
    let mut extracted = BTreeMap::new();
    for (name, path) in captures {
        let value = body
            .and_then(|json| resolve_field(json, path))
            .and_then(capture_text)
            .ok_or_else(|| ScenarioFailure::CaptureNotFound {
                name: name.clone(),
                path: path.clone(),
            })?;
        extracted.insert(name.clone(), value);
    }
    Ok(extracted)
}

/// Resolves `_id`, `data.items.0.id`, `items[0].id` or a JSON pointer.
pub(super) fn resolve_field<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
    if path.starts_with('/') {
        return json.pointer(path);
    }

    let normalized = path.replace('[', ".").replace(']', "");
    normalized
        .split('.')
        .try_fold(json, |current, segment| match current {
            _ if segment.is_empty() => None,
            Value::Object(fields) => fields.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

fn capture_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
