//! Flattening of nested configuration documents into dotted keys.
//!
//! `{"server": {"port": 8080}}` becomes `server.port = 8080` regardless of
//! whether the document was YAML or JSON. Sequences are kept whole at their
//! flattened key rather than expanded further.

use crate::errors::ParseError;
use crate::properties;
use indexmap::IndexMap;
use serde_json::Value;

pub type PropertyMap = IndexMap<String, Value>;

/// Parse and flatten one candidate file according to its extension
/// (`.yaml`, `.yml`, `.json` or `.properties`).
pub fn parse_file(data: &[u8], extension: &str) -> Result<PropertyMap, ParseError> {
    match extension {
        ".yaml" | ".yml" => {
            let doc: serde_yaml::Value = serde_yaml::from_slice(data)?;
            flatten_yaml(doc)
        }
        ".json" => {
            let doc: Value = serde_json::from_slice(data)?;
            flatten_json(doc)
        }
        ".properties" => Ok(properties::parse(data)),
        other => Err(ParseError::UnsupportedExtension(other.to_string())),
    }
}

fn flatten_yaml(doc: serde_yaml::Value) -> Result<PropertyMap, ParseError> {
    let mut out = PropertyMap::new();
    match doc {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                flatten_yaml_into(&yaml_key(&key), value, &mut out);
            }
            Ok(out)
        }
        // An empty document parses as null; treat it as an empty mapping.
        serde_yaml::Value::Null => Ok(out),
        _ => Err(ParseError::NotAMapping),
    }
}

fn flatten_yaml_into(prefix: &str, value: serde_yaml::Value, out: &mut PropertyMap) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, nested) in map {
                let joined = join_key(prefix, &yaml_key(&key));
                flatten_yaml_into(&joined, nested, out);
            }
        }
        serde_yaml::Value::Tagged(tagged) => flatten_yaml_into(prefix, tagged.value, out),
        other => {
            out.insert(prefix.to_string(), yaml_to_json(other));
        }
    }
}

fn flatten_json(doc: Value) -> Result<PropertyMap, ParseError> {
    let Value::Object(map) = doc else {
        return Err(ParseError::NotAMapping);
    };
    let mut out = PropertyMap::new();
    for (key, value) in map {
        flatten_json_into(&key, value, &mut out);
    }
    Ok(out)
}

fn flatten_json_into(prefix: &str, value: Value, out: &mut PropertyMap) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let joined = join_key(prefix, &key);
                flatten_json_into(&joined, nested, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other);
        }
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// YAML allows non-string mapping keys; stringify them the way they would
/// print.
fn yaml_key(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (yaml_key(&k), yaml_to_json(v)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}
