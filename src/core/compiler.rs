//! Compiles a pipeline definition into an uploadable package.
//!
//! The package is a zip archive holding a single `pipeline.yaml`: an Argo
//! workflow whose metadata carries the pipeline spec annotation Kubeflow
//! Pipelines reads its parameter list from.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::core::slugify::slugify_name;
use crate::error::{Error, Result};
use crate::params::wire_value;
use crate::plugin::PipelineDefinition;
use crate::utils::io;

pub const PACKAGE_ENTRY: &str = "pipeline.yaml";
const SPEC_ANNOTATION: &str = "pipelines.kubeflow.org/pipeline_spec";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPackage {
    pub path: PathBuf,
    pub pipeline_name: String,
    pub size: u64,
    pub sha256: String,
}

/// Compile `definition` into a zip package at `package_path`.
pub fn compile(definition: &PipelineDefinition, package_path: &Path) -> Result<CompiledPackage> {
    let document = workflow_document(definition)?;
    let yaml = serde_yml::to_string(&document).map_err(|e| {
        Error::compile_failed(
            format!("Failed to serialize workflow: {}", e),
            Some(definition.name.clone()),
        )
    })?;

    let bytes = zip_single_entry(PACKAGE_ENTRY, yaml.as_bytes())?;

    if let Some(parent) = package_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::internal_io(e.to_string(), Some("create package directory".to_string()))
            })?;
        }
    }
    io::write_bytes_atomic(package_path, &bytes, "write pipeline package")?;

    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    log_status!(
        "compiler",
        "Compiled '{}' to {} ({} bytes)",
        definition.name,
        package_path.display(),
        bytes.len()
    );

    Ok(CompiledPackage {
        path: package_path.to_path_buf(),
        pipeline_name: definition.name.clone(),
        size: bytes.len() as u64,
        sha256,
    })
}

/// Build the Argo workflow document for `definition`.
pub fn workflow_document(definition: &PipelineDefinition) -> Result<Value> {
    let mut spec = match &definition.workflow {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        _ => {
            return Err(Error::compile_failed(
                "Workflow body must be a mapping",
                Some(definition.name.clone()),
            ))
        }
    };

    if !definition.parameters.is_empty() {
        if spec.contains_key("arguments") {
            return Err(Error::compile_failed(
                "Declare parameters either under `parameters` or `workflow.arguments`, not both",
                Some(definition.name.clone()),
            ));
        }

        let arguments: Vec<Value> = definition
            .parameters
            .iter()
            .map(|p| match &p.default {
                Some(default) => json!({ "name": p.name, "value": wire_value(default) }),
                None => json!({ "name": p.name }),
            })
            .collect();
        spec.insert("arguments".to_string(), json!({ "parameters": arguments }));
    }

    let inputs: Vec<Value> = definition
        .parameters
        .iter()
        .map(|p| {
            let mut input = Map::new();
            input.insert("name".to_string(), json!(p.name));
            if let Some(kind) = &p.kind {
                input.insert("type".to_string(), json!(kind));
            }
            if let Some(default) = &p.default {
                input.insert("default".to_string(), json!(wire_value(default)));
            }
            Value::Object(input)
        })
        .collect();

    let pipeline_spec = json!({
        "name": definition.name,
        "description": definition.description,
        "inputs": inputs,
    });

    Ok(json!({
        "apiVersion": "argoproj.io/v1alpha1",
        "kind": "Workflow",
        "metadata": {
            "generateName": format!("{}-", slugify_name(&definition.name, "pipeline name")?),
            "annotations": {
                SPEC_ANNOTATION: pipeline_spec.to_string(),
            },
        },
        "spec": Value::Object(spec),
    }))
}

fn zip_single_entry(name: &str, content: &[u8]) -> Result<Vec<u8>> {
    let zip_error = |e: zip::result::ZipError| {
        Error::compile_failed(format!("Failed to write package: {}", e), None)
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        writer.start_file(name, options).map_err(zip_error)?;
        writer.write_all(content).map_err(|e| {
            Error::internal_io(e.to_string(), Some("write package entry".to_string()))
        })?;
        writer.finish().map_err(zip_error)?;
    }
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::ParameterSpec;
    use std::fs::File;
    use std::io::Read;
    use tempfile::TempDir;

    fn definition() -> PipelineDefinition {
        PipelineDefinition {
            name: "Sample pipeline".to_string(),
            description: Some("Make a csv file and read it.".to_string()),
            parameters: vec![
                ParameterSpec {
                    name: "n_cols".to_string(),
                    kind: Some("int".to_string()),
                    default: Some(json!(5)),
                },
                ParameterSpec {
                    name: "bucket".to_string(),
                    kind: None,
                    default: None,
                },
            ],
            workflow: json!({ "entrypoint": "sample-pipeline", "templates": [] }),
        }
    }

    #[test]
    fn document_carries_arguments_and_spec_annotation() {
        let doc = workflow_document(&definition()).unwrap();

        assert_eq!(doc["kind"], "Workflow");
        assert_eq!(doc["metadata"]["generateName"], "sample-pipeline-");
        assert_eq!(doc["spec"]["entrypoint"], "sample-pipeline");
        assert_eq!(
            doc["spec"]["arguments"]["parameters"],
            json!([{ "name": "n_cols", "value": "5" }, { "name": "bucket" }])
        );

        let annotation = doc["metadata"]["annotations"][SPEC_ANNOTATION]
            .as_str()
            .unwrap();
        let spec: Value = serde_json::from_str(annotation).unwrap();
        assert_eq!(spec["name"], "Sample pipeline");
        assert_eq!(spec["inputs"][0], json!({"name": "n_cols", "type": "int", "default": "5"}));
    }

    #[test]
    fn conflicting_argument_declarations_fail() {
        let mut def = definition();
        def.workflow = json!({ "arguments": { "parameters": [] } });

        let err = workflow_document(&def).unwrap_err();
        assert_eq!(err.code.as_str(), "compile.failed");
    }

    #[test]
    fn non_mapping_workflow_fails() {
        let mut def = definition();
        def.workflow = json!(["not", "a", "mapping"]);

        assert!(workflow_document(&def).is_err());
    }

    #[test]
    fn package_is_a_zip_with_pipeline_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("path_csv_pipeline.zip");

        let package = compile(&definition(), &path).unwrap();
        assert_eq!(package.path, path);
        assert_eq!(package.sha256.len(), 64);
        assert_eq!(package.size, std::fs::metadata(&path).unwrap().len());

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_name(PACKAGE_ENTRY).unwrap();
        let mut yaml = String::new();
        entry.read_to_string(&mut yaml).unwrap();

        let doc: Value = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(doc["apiVersion"], "argoproj.io/v1alpha1");
        assert_eq!(doc["spec"]["arguments"]["parameters"][0]["name"], "n_cols");
    }
}
