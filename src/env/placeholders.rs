use serde_json::{Map, Value};
use thiserror::Error;

use crate::env::{generate, EnvMap};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
    #[error("Invalid template variable: {0}")]
    InvalidKey(String),
    #[error("Missing template variable: {0}")]
    Missing(String),
    #[error("Unterminated template placeholder: {{{0}")]
    Unterminated(String),
    #[error("Unknown generator: ${0}")]
    UnknownGenerator(String),
}

/// Lookup chain used while interpolating a scenario: captures first, then
/// configured variables, then the process environment.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    captures: &'a EnvMap,
    variables: &'a EnvMap,
}

impl<'a> Scope<'a> {
    pub fn new(captures: &'a EnvMap, variables: &'a EnvMap) -> Self {
        Self {
            captures,
            variables,
        }
    }

    pub fn lookup(&self, key: &str) -> Option<String> {
        self.captures
            .get(key)
            .or_else(|| self.variables.get(key))
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }
}

pub fn expand_placeholders(input: &str, scope: &Scope<'_>) -> Result<String, PlaceholderError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(&next) = chars.peek() {
                    match next {
                        '{' | '}' => {
                            output.push(next);
                            chars.next();
                        }
                        _ => {
                            output.push('\\');
                            output.push(next);
                            chars.next();
                        }
                    }
                } else {
                    output.push('\\');
                }
            }
            '{' => {
                let Some(&next_char) = chars.peek() else {
                    output.push('{');
                    continue;
                };
                if !is_start_char(next_char) && next_char != '$' {
                    output.push('{');
                    continue;
                }

                let mut key = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    key.push(next);
                }

                if !closed {
                    return Err(PlaceholderError::Unterminated(key));
                }

                if let Some(spec) = key.strip_prefix('$') {
                    output.push_str(&generate(spec)?);
                    continue;
                }

                if !is_valid_key(&key) {
                    return Err(PlaceholderError::InvalidKey(key));
                }

                let value = scope
                    .lookup(&key)
                    .ok_or(PlaceholderError::Missing(key))?;
                output.push_str(&value);
            }
            _ => output.push(ch),
        }
    }

    Ok(output)
}

/// Interpolates every string leaf and object key of a JSON document.
pub fn expand_json(value: &Value, scope: &Scope<'_>) -> Result<Value, PlaceholderError> {
    Ok(match value {
        Value::String(text) => Value::String(expand_placeholders(text, scope)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| expand_json(item, scope))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(fields) => {
            let mut expanded = Map::with_capacity(fields.len());
            for (key, field) in fields {
                expanded.insert(
                    expand_placeholders(key, scope)?,
                    expand_json(field, scope)?,
                );
            }
            Value::Object(expanded)
        }
        other => other.clone(),
    })
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if is_start_char(c) => {}
        _ => return false,
    }

    chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
}

fn is_start_char(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct EnvVarGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            if let Some(ref value) = self.original {
                std::env::set_var(&self.key, value);
            } else {
                std::env::remove_var(&self.key);
            }
        }
    }

    fn maps() -> (EnvMap, EnvMap) {
        let mut captures = EnvMap::new();
        captures.insert("productId".to_string(), "BeeJh5lz3k6kSIzA".to_string());
        let mut variables = EnvMap::new();
        variables.insert("PASSWORD".to_string(), "123456789".to_string());
        variables.insert("productId".to_string(), "shadowed".to_string());
        (captures, variables)
    }

    #[test]
    fn captures_shadow_variables() {
        let (captures, variables) = maps();
        let scope = Scope::new(&captures, &variables);
        let rendered = expand_placeholders("/produtos/{productId}?p={PASSWORD}", &scope).unwrap();
        assert_eq!(rendered, "/produtos/BeeJh5lz3k6kSIzA?p=123456789");
    }

    #[test]
    fn falls_back_to_process_environment() {
        let _guard = EnvVarGuard::set("SPECPIT_PLACEHOLDER_OS", "value");
        let (captures, variables) = maps();
        let scope = Scope::new(&captures, &variables);
        let rendered = expand_placeholders("token={SPECPIT_PLACEHOLDER_OS}", &scope).unwrap();
        assert_eq!(rendered, "token=value");
    }

    #[test]
    fn escapes_and_json_text_stay_literal() {
        let (captures, variables) = maps();
        let scope = Scope::new(&captures, &variables);
        let rendered =
            expand_placeholders(r#"\{literal\} {"ok":true} { spaced }"#, &scope).unwrap();
        assert_eq!(rendered, r#"{literal} {"ok":true} { spaced }"#);
    }

    #[test]
    fn reports_missing_values() {
        let (captures, variables) = maps();
        let scope = Scope::new(&captures, &variables);
        let err = expand_placeholders("{token}", &scope).unwrap_err();
        assert_eq!(err, PlaceholderError::Missing("token".to_string()));
    }

    #[test]
    fn rejects_invalid_keys_and_unterminated_placeholders() {
        let (captures, variables) = maps();
        let scope = Scope::new(&captures, &variables);
        let err = expand_placeholders("{BAD!}", &scope).unwrap_err();
        assert!(err.to_string().contains("Invalid template variable"));

        let err = expand_placeholders("/usuarios/{userId", &scope).unwrap_err();
        assert_eq!(err, PlaceholderError::Unterminated("userId".to_string()));
    }

    #[test]
    fn generators_produce_fresh_values() {
        let (captures, variables) = maps();
        let scope = Scope::new(&captures, &variables);
        let first = expand_placeholders("{$uuid}", &scope).unwrap();
        let second = expand_placeholders("{$uuid}", &scope).unwrap();
        assert_ne!(first, second);

        let err = expand_placeholders("{$nope}", &scope).unwrap_err();
        assert_eq!(err, PlaceholderError::UnknownGenerator("nope".to_string()));
    }

    #[test]
    fn expand_json_walks_nested_values() {
        let (captures, variables) = maps();
        let scope = Scope::new(&captures, &variables);
        let body = json!({
            "produtos": [{ "idProduto": "{productId}", "quantidade": 10 }],
            "password": "{PASSWORD}",
            "administrador": true
        });

        let expanded = expand_json(&body, &scope).unwrap();
        assert_eq!(
            expanded,
            json!({
                "produtos": [{ "idProduto": "BeeJh5lz3k6kSIzA", "quantidade": 10 }],
                "password": "123456789",
                "administrador": true
            })
        );
    }
}
