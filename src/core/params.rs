//! Pipeline run parameters, loaded from a YAML file.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::config::EnvKeys;
use crate::error::{Error, Result};

/// Parameter name to value, passed unmodified to the run triggers.
pub type Params = BTreeMap<String, Value>;

/// Load the parameter mapping at `path`.
///
/// Every failure (unset path, missing file, malformed YAML, a document that
/// is not a mapping) is reported as `config.invalid_params`.
pub fn load_params(path: Option<&Path>) -> Result<Params> {
    let path = path.ok_or_else(|| {
        Error::config_invalid_params(
            format!("{} must be specified", EnvKeys::PIPELINE_PARAMETERS_PATH),
            None,
            "path is not set",
        )
    })?;
    let display = path.display().to_string();

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config_invalid_params(
            format!("{} must be specified", EnvKeys::PIPELINE_PARAMETERS_PATH),
            Some(display.clone()),
            e.to_string(),
        )
    })?;

    parse_params(&content).map_err(|cause| {
        Error::config_invalid_params("Invalid yaml parameters format", Some(display), cause)
    })
}

fn parse_params(content: &str) -> std::result::Result<Params, String> {
    if content.trim().is_empty() {
        return Ok(Params::new());
    }

    let document: Value = serde_yml::from_str(content).map_err(|e| e.to_string())?;

    match document {
        Value::Null => Ok(Params::new()),
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(format!(
            "expected a mapping of parameter names to values, found {}",
            kind_of(&other)
        )),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Wire form of a parameter value: strings as-is, everything else as JSON.
pub fn wire_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
