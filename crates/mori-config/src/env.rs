//! `${NAME}` interpolation over YAML trees.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;

use crate::error::{ConfigError, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex"));

/// Source of environment variables
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// Replace every `${NAME}` in `input`. Single pass: substituted values are
/// not scanned again.
pub fn interpolate(input: &str, env: &impl EnvSource) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(input) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str();
        let value = env
            .var(name)
            .ok_or_else(|| ConfigError::MissingEnvironmentVariable(name.to_string()))?;
        out.push_str(&input[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }

    out.push_str(&input[last..]);
    Ok(out)
}

/// True if `s` is a single `${NAME}` with nothing around it
fn is_whole_placeholder(s: &str) -> bool {
    PLACEHOLDER
        .find(s)
        .is_some_and(|m| m.start() == 0 && m.end() == s.len())
}

/// Type a value that replaced a whole scalar the way YAML would have typed it
/// in the file. Numbers are kept only if they print back unchanged, so no
/// digits are lost; everything else stays a string.
fn typed_scalar(raw: String) -> Value {
    match serde_yaml::from_str::<Value>(&raw) {
        Ok(Value::Bool(b)) => Value::Bool(b),
        Ok(Value::Number(n)) if n.to_string() == raw => Value::Number(n),
        _ => Value::String(raw),
    }
}

/// Resolve placeholders in every string scalar of a YAML tree. Keys are left
/// untouched.
///
/// A scalar that is exactly `${NAME}` takes the YAML type of its value
/// (`45` becomes a number, `true` a bool). Placeholders embedded in longer
/// text always produce strings.
pub fn resolve_env(value: Value, env: &impl EnvSource) -> Result<Value> {
    match value {
        Value::String(s) => {
            let whole = is_whole_placeholder(&s);
            let resolved = interpolate(&s, env)?;
            Ok(if whole { typed_scalar(resolved) } else { Value::String(resolved) })
        }
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| resolve_env(item, env))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence),
        Value::Mapping(map) => {
            let mut resolved = serde_yaml::Mapping::with_capacity(map.len());
            for (key, item) in map {
                resolved.insert(key, resolve_env(item, env)?);
            }
            Ok(Value::Mapping(resolved))
        }
        Value::Tagged(mut tagged) => {
            tagged.value = resolve_env(std::mem::replace(&mut tagged.value, Value::Null), env)?;
            Ok(Value::Tagged(tagged))
        }
        scalar @ (Value::Null | Value::Bool(_) | Value::Number(_)) => Ok(scalar),
    }
}

/// True if any string scalar still holds a `${NAME}` placeholder
pub fn has_placeholders(value: &Value) -> bool {
    match value {
        Value::String(s) => PLACEHOLDER.is_match(s),
        Value::Sequence(items) => items.iter().any(has_placeholders),
        Value::Mapping(map) => map.values().any(has_placeholders),
        Value::Tagged(tagged) => has_placeholders(&tagged.value),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_whole_and_embedded_placeholders() {
        let env = env(&[("API_KEY", "sk-123"), ("HOST", "example.com")]);
        assert_eq!(interpolate("${API_KEY}", &env).unwrap(), "sk-123");
        assert_eq!(interpolate("https://${HOST}/v1", &env).unwrap(), "https://example.com/v1");
        assert_eq!(interpolate("no vars", &env).unwrap(), "no vars");
    }

    #[test]
    fn test_missing_variable_fails() {
        let err = interpolate("${NOT_SET}", &env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvironmentVariable(ref n) if n == "NOT_SET"));
    }

    #[test]
    fn test_nested_tree() {
        let tree: Value = serde_yaml::from_str(
            "models:\n  - name: a\n    api_key: ${KEY}\n    client_args:\n      base_url: ${URL}\n    tags: [x, '${KEY}']\n    n: 3\n",
        )
        .unwrap();
        let out = resolve_env(tree, &env(&[("KEY", "k"), ("URL", "u")])).unwrap();

        assert_eq!(out["models"][0]["api_key"], Value::from("k"));
        assert_eq!(out["models"][0]["client_args"]["base_url"], Value::from("u"));
        assert_eq!(out["models"][0]["tags"][1], Value::from("k"));
        assert_eq!(out["models"][0]["n"], Value::from(3));
        assert!(!has_placeholders(&out));
    }

    #[test]
    fn test_whole_placeholder_takes_yaml_type() {
        let tree: Value =
            serde_yaml::from_str("timeout: ${TIMEOUT}\nparallel: ${PAR}\nurl: http://${HOST}:${PORT}\nid: ${ID}\nkey: ${KEY}\n")
                .unwrap();
        let env = env(&[
            ("TIMEOUT", "45"),
            ("PAR", "true"),
            ("HOST", "localhost"),
            ("PORT", "8000"),
            ("ID", "007"),
            ("KEY", "sk-1"),
        ]);
        let out = resolve_env(tree, &env).unwrap();

        assert_eq!(out["timeout"], Value::from(45));
        assert_eq!(out["parallel"], Value::Bool(true));
        assert_eq!(out["url"], Value::from("http://localhost:8000"));
        assert_eq!(out["id"], Value::from("007"));
        assert_eq!(out["key"], Value::from("sk-1"));
    }

    #[test]
    fn test_substituted_value_not_rescanned() {
        let env = env(&[("A", "${B}")]);
        assert_eq!(interpolate("${A}", &env).unwrap(), "${B}");
    }

    fn tree_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            "[a-z ]{0,8}".prop_map(Value::from),
            ("[a-z]{0,4}", prop::sample::select(vec!["ONE", "TWO", "THREE"]))
                .prop_map(|(prefix, var)| Value::from(format!("{prefix}${{{var}}}"))),
            any::<i64>().prop_map(Value::from),
            Just(Value::Null),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Sequence),
                prop::collection::btree_map("[a-z]{1,5}", inner, 0..4).prop_map(|m| {
                    Value::Mapping(m.into_iter().map(|(k, v)| (Value::from(k), v)).collect())
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_resolution_is_complete_and_idempotent(tree in tree_strategy()) {
            let env = env(&[("ONE", "1"), ("TWO", "two"), ("THREE", "drei")]);
            let once = resolve_env(tree, &env).unwrap();
            prop_assert!(!has_placeholders(&once));
            let twice = resolve_env(once.clone(), &env).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
