use compact_str::CompactString;
use serde_json::{Map, Value};

use crate::result::{IsrenError, Result};

/// Normalize loosely typed format input into lowercase tokens
///
/// Accepts nothing, a comma separated string or a list of values; order is
/// kept and empty tokens are dropped.
pub fn normalize_output(input: Option<&Value>) -> Vec<CompactString> {
    match input {
        None | Some(Value::Null) => vec![],
        Some(Value::String(s)) => normalize_tokens(s.split(',')),
        Some(Value::Array(items)) => normalize_tokens(items.iter().map(token_of)),
        Some(other) => normalize_tokens([other.to_string()]),
    }
}

/// Lowercase, trim and drop empty tokens
pub fn normalize_tokens<I, S>(tokens: I) -> Vec<CompactString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|t| CompactString::from(t.as_ref().trim().to_lowercase()))
        .filter(|t| !t.is_empty())
        .collect()
}

fn token_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a JSON object given on the command line or in the environment
pub fn parse_json_options(option: &'static str, input: Option<&str>) -> Result<Map<String, Value>> {
    let input = match input.map(str::trim) {
        None | Some("") => return Ok(Map::new()),
        Some(input) => input,
    };

    match serde_json::from_str::<Value>(input) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(IsrenError::MalformedOptions {
            option,
            message: format!("expected a JSON object, got {other}"),
        }),
        Err(e) => Err(IsrenError::MalformedOptions { option, message: e.to_string() }),
    }
}
