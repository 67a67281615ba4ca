//! Pipeline definition loading.
//!
//! A definition file is a YAML document with a top-level `pipelines` map.
//! Each key is the symbol a CI step refers to by name:
//!
//! ```yaml
//! pipelines:
//!   path_csv_pipeline:
//!     name: Sample pipeline
//!     description: Make a csv file and read it.
//!     parameters:
//!       - name: n_cols
//!         type: int
//!         default: 5
//!     workflow:
//!       entrypoint: sample-pipeline
//!       templates:
//!         - name: make-csv
//!           container:
//!             image: "gcr.io/acme/make-csv:{{version}}"
//! ```
//!
//! Loading a symbol yields a [`PipelineFunction`]; invoking it with a
//! version tag substitutes `{{version}}` throughout the workflow body.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::utils::template::{self, TemplateVars};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A concrete pipeline definition, ready to compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    pub workflow: Value,
}

#[derive(Debug, Deserialize)]
struct DefinitionFile {
    #[serde(default)]
    pipelines: BTreeMap<String, PipelineDefinition>,
}

/// The contract every loadable pipeline definition satisfies.
pub trait PipelineFunction {
    /// Symbol the definition was loaded under. Names the compiled package
    /// and the registered pipeline.
    fn function_name(&self) -> &str;

    /// Produce the definition, parameterized by `version` when given.
    fn invoke(&self, version: Option<&str>) -> Result<PipelineDefinition>;
}

/// Pipeline declared in a YAML definition file.
#[derive(Debug, Clone)]
pub struct DeclaredPipeline {
    symbol: String,
    definition: PipelineDefinition,
}

impl DeclaredPipeline {
    pub fn new(symbol: impl Into<String>, definition: PipelineDefinition) -> Self {
        Self {
            symbol: symbol.into(),
            definition,
        }
    }

    /// Spellings of `{{version}}` in the workflow that invocation will not
    /// substitute.
    pub fn version_near_misses(&self) -> Vec<String> {
        let mut found = Vec::new();
        collect_strings(&self.definition.workflow, &mut |s| {
            for token in template::near_misses(s, TemplateVars::VERSION) {
                if !found.contains(&token) {
                    found.push(token);
                }
            }
        });
        found
    }
}

impl PipelineFunction for DeclaredPipeline {
    fn function_name(&self) -> &str {
        &self.symbol
    }

    fn invoke(&self, version: Option<&str>) -> Result<PipelineDefinition> {
        let mut definition = self.definition.clone();
        if let Some(version) = version {
            if version.trim().is_empty() {
                return Err(Error::validation_invalid_argument(
                    "version",
                    "Version tag cannot be empty",
                    Some(self.symbol.clone()),
                ));
            }
            render_strings(
                &mut definition.workflow,
                &[(TemplateVars::VERSION, version)],
            );
        }
        Ok(definition)
    }
}

/// Load the pipeline declared under `symbol` in the file at `path`.
pub fn load_pipeline_from_path(path: &Path, symbol: &str) -> Result<Box<dyn PipelineFunction>> {
    let display = path.display().to_string();

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::plugin_load_failed(&display, e.to_string()))?;

    let file: DefinitionFile = serde_yml::from_str(&content)
        .map_err(|e| Error::plugin_load_failed(&display, e.to_string()))?;

    let mut pipelines = file.pipelines;
    match pipelines.remove(symbol) {
        Some(definition) => {
            let declared = DeclaredPipeline::new(symbol, definition);
            let near_misses = declared.version_near_misses();
            if !near_misses.is_empty() {
                log_status!(
                    "plugin",
                    "Pipeline '{}' has version placeholders that are never substituted: {}",
                    symbol,
                    near_misses.join(", ")
                );
            }
            Ok(Box::new(declared))
        }
        None => {
            let mut available: Vec<String> = pipelines.into_keys().collect();
            available.sort();
            Err(Error::plugin_symbol_not_found(display, symbol, available))
        }
    }
}

fn render_strings(value: &mut Value, variables: &[(&str, &str)]) {
    match value {
        Value::String(s) => *s = template::render(s, variables),
        Value::Array(items) => {
            for item in items {
                render_strings(item, variables);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                render_strings(item, variables);
            }
        }
        _ => {}
    }
}

fn collect_strings(value: &Value, visit: &mut dyn FnMut(&str)) {
    match value {
        Value::String(s) => visit(s),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, visit)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, visit)),
        _ => {}
    }
}
