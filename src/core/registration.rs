//! Idempotent registration of pipelines and experiments.

use std::path::Path;

use serde::Serialize;

use crate::config::DEFAULT_EXPERIMENT;
use crate::error::Result;
use crate::kubeflow::PipelineService;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredPipeline {
    pub id: String,
    pub name: String,
    /// True when this call created the pipeline.
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedExperiment {
    pub id: String,
    pub name: String,
    pub created: bool,
}

/// Register the package at `package_path` under `name`.
///
/// The first registration creates the pipeline and nothing else; every
/// later one uploads the package as a new version tagged `version_tag`.
/// Exactly one write happens per call.
pub fn register_pipeline(
    service: &mut dyn PipelineService,
    name: &str,
    package_path: &Path,
    version_tag: &str,
) -> Result<RegisteredPipeline> {
    match service.get_pipeline_id(name)? {
        None => {
            let pipeline = service.upload_pipeline(package_path, name)?;
            log_status!("registration", "The pipeline is newly registered: {}", name);
            Ok(RegisteredPipeline {
                id: pipeline.id,
                name: name.to_string(),
                created: true,
                version_id: None,
                version_name: None,
            })
        }
        Some(pipeline_id) => {
            let version =
                service.upload_pipeline_version(package_path, version_tag, &pipeline_id)?;
            log_status!(
                "registration",
                "Uploaded version {} of pipeline {}",
                version_tag,
                name
            );
            Ok(RegisteredPipeline {
                id: pipeline_id,
                name: name.to_string(),
                created: false,
                version_id: Some(version.id),
                version_name: Some(version_tag.to_string()),
            })
        }
    }
}

/// Name an experiment is registered under.
pub fn experiment_display_name(pipeline_name: &str, experiment_name: &str) -> String {
    if experiment_name == DEFAULT_EXPERIMENT {
        experiment_name.to_string()
    } else {
        format!("{}-{}", pipeline_name, experiment_name)
    }
}

/// Find the experiment for this pipeline, creating it when absent.
pub fn resolve_experiment(
    service: &mut dyn PipelineService,
    pipeline_name: &str,
    experiment_name: &str,
) -> Result<ResolvedExperiment> {
    let name = experiment_display_name(pipeline_name, experiment_name);

    if let Some(existing) = service.get_experiment(&name)? {
        return Ok(ResolvedExperiment {
            id: existing.id,
            name,
            created: false,
        });
    }

    let experiment = service.create_experiment(&name)?;
    log_status!("registration", "The experiment is newly registered: {}", name);
    Ok(ResolvedExperiment {
        id: experiment.id,
        name,
        created: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubeflow::mock::{Call, MockService};

    const PACKAGE: &str = "demo.zip";

    #[test]
    fn first_registration_creates_without_versioning() {
        let mut service = MockService::new();

        let registered =
            register_pipeline(&mut service, "demo", Path::new(PACKAGE), "sha1").unwrap();

        assert!(registered.created);
        assert!(registered.version_id.is_none());
        assert_eq!(service.write_count(), 1);
        assert!(!service
            .calls
            .iter()
            .any(|c| matches!(c, Call::UploadPipelineVersion { .. })));
    }

    #[test]
    fn repeated_registration_keeps_id_and_adds_version() {
        let mut service = MockService::new();

        let first = register_pipeline(&mut service, "demo", Path::new(PACKAGE), "sha1").unwrap();
        let second = register_pipeline(&mut service, "demo", Path::new(PACKAGE), "sha2").unwrap();

        assert_eq!(first.id, second.id);
        assert!(!second.created);
        assert_eq!(second.version_name.as_deref(), Some("sha2"));
        assert_eq!(service.pipelines.len(), 1);
        assert_eq!(service.pipelines["demo"].versions, vec!["demo", "sha2"]);
        assert_eq!(service.write_count(), 2);
    }

    #[test]
    fn existing_pipeline_is_versioned_under_its_known_id() {
        let mut service = MockService::new().with_pipeline("demo", "known-id");

        let registered =
            register_pipeline(&mut service, "demo", Path::new(PACKAGE), "abc123").unwrap();

        assert_eq!(registered.id, "known-id");
        assert_eq!(
            service.calls[1],
            Call::UploadPipelineVersion {
                pipeline_id: "known-id".to_string(),
                version_name: "abc123".to_string(),
                package: Path::new(PACKAGE).to_path_buf(),
            }
        );
    }

    #[test]
    fn failed_pipeline_lookup_uploads_nothing() {
        let mut service = MockService::new().with_failing_lookups();

        let err = register_pipeline(&mut service, "demo", Path::new(PACKAGE), "sha1").unwrap_err();

        assert_eq!(err.code.as_str(), "remote.api_failed");
        assert_eq!(service.write_count(), 0);
        assert!(service.pipelines.is_empty());
    }

    #[test]
    fn display_name_prefixes_non_default_experiments() {
        assert_eq!(experiment_display_name("demo", "nightly"), "demo-nightly");
        assert_eq!(experiment_display_name("demo", "Default"), "Default");
    }

    #[test]
    fn experiment_resolution_creates_once() {
        let mut service = MockService::new();

        let first = resolve_experiment(&mut service, "demo", "nightly").unwrap();
        let second = resolve_experiment(&mut service, "demo", "nightly").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.name, "demo-nightly");
        assert!(first.created);
        assert!(!second.created);
        let creates = service
            .calls
            .iter()
            .filter(|c| matches!(c, Call::CreateExperiment(_)))
            .count();
        assert_eq!(creates, 1);
    }

    #[test]
    fn failed_experiment_lookup_is_not_treated_as_missing() {
        let mut service = MockService::new().with_failing_lookups();

        let err = resolve_experiment(&mut service, "demo", "nightly").unwrap_err();

        assert_eq!(err.code.as_str(), "remote.api_failed");
        assert_eq!(err.retryable, Some(true));
        assert!(!service
            .calls
            .iter()
            .any(|c| matches!(c, Call::CreateExperiment(_))));
        assert!(service.experiments.is_empty());
    }

    #[test]
    fn lookup_precedes_create() {
        let mut service = MockService::new();

        resolve_experiment(&mut service, "demo", "Default").unwrap();

        assert_eq!(
            service.calls,
            vec![
                Call::GetExperiment("Default".to_string()),
                Call::CreateExperiment("Default".to_string()),
            ]
        );
    }
}
