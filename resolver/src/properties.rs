//! `.properties` parsing.
//!
//! Properties files are already flat (`a.b.c=value`), so no flattening
//! applies; values get a best-effort scalar coercion so `port=8080` comes
//! out as a number and `enabled=true` as a boolean.

use crate::flatten::PropertyMap;
use serde_json::Value;

/// Parse `key=value` / `key:value` lines. Blank lines and lines starting
/// with `#` or `!` are comments; lines without a separator are ignored.
pub fn parse(data: &[u8]) -> PropertyMap {
    let text = String::from_utf8_lossy(data);
    let mut out = PropertyMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((key, value)) = split_pair(line) else {
            continue;
        };
        out.insert(key.trim().to_string(), coerce_scalar(value.trim()));
    }
    out
}

// '=' wins over ':' when both appear, matching common properties dialects.
fn split_pair(line: &str) -> Option<(&str, &str)> {
    if line.contains('=') {
        line.split_once('=')
    } else {
        line.split_once(':')
    }
}

/// Integer, then float, then case-insensitive boolean, else string.
fn coerce_scalar(raw: &str) -> Value {
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
