//! Run configuration, read once from the environment at startup.
//!
//! Every other module receives a `&Config`; nothing below `main` reads
//! process environment on its own.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Error, Result};

/// Experiment name that is registered as-is instead of being prefixed with
/// the pipeline name.
pub const DEFAULT_EXPERIMENT: &str = "Default";

/// Environment variable names consumed by [`Config::from_lookup`].
pub struct EnvKeys;

impl EnvKeys {
    pub const GITHUB_SHA: &'static str = "GITHUB_SHA";
    pub const SA_EMAIL: &'static str = "SA_EMAIL";
    pub const GCP_PROJECT: &'static str = "GCP_PROJECT";
    pub const CREDENTIALS: &'static str = "GOOGLE_APPLICATION_CREDENTIALS";
    pub const PIPELINE_FUNCTION_NAME: &'static str = "INPUT_PIPELINE_FUNCTION_NAME";
    pub const PIPELINE_FILE_PATH: &'static str = "INPUT_PIPELINE_FILE_PATH";
    pub const VERSIONING_WITH_GITHUB_SHA: &'static str =
        "INPUT_ARTIFACT_VERSIONING_WITH_GITHUB_SHA";
    pub const KUBEFLOW_URL: &'static str = "INPUT_KUBEFLOW_URL";
    pub const NAMESPACE: &'static str = "INPUT_NAMESPACE";
    pub const EXPERIMENT_NAME: &'static str = "INPUT_EXPERIMENT_NAME";
    pub const PIPELINE_PARAMETERS_PATH: &'static str = "INPUT_PIPELINE_PARAMETERS_PATH";
    pub const RUN_PIPELINE: &'static str = "INPUT_RUN_PIPELINE";
    pub const RUN_RECURRING_PIPELINE: &'static str = "INPUT_RUN_RECURRING_PIPELINE";
    pub const RECURRING_CRON_EXPRESSION: &'static str = "INPUT_RECURRING_CRON_EXPRESSION";
}

/// Service-account credentials handed to `gcloud`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    pub email: String,
    pub project: String,
    pub key_file: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub github_sha: Option<String>,
    pub service_account: Option<ServiceAccount>,
    pub pipeline_function_name: String,
    pub pipeline_file_path: PathBuf,
    pub version_with_github_sha: bool,
    pub kubeflow_url: Option<String>,
    pub namespace: Option<String>,
    pub experiment_name: String,
    pub parameters_path: Option<PathBuf>,
    pub run_pipeline: bool,
    pub run_recurring_pipeline: bool,
    pub recurring_cron_expression: Option<String>,
    /// Directory the compiled package is written to.
    pub package_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset: CI runners pass unset action inputs as
    /// empty strings.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| Error::config_missing_key(key));
        let toggle = |key: &str| lookup(key).as_deref() == Some("true");

        let github_sha = get(EnvKeys::GITHUB_SHA);
        let version_with_github_sha = toggle(EnvKeys::VERSIONING_WITH_GITHUB_SHA);
        if version_with_github_sha && github_sha.is_none() {
            return Err(Error::config_missing_key(EnvKeys::GITHUB_SHA));
        }

        let service_account = match get(EnvKeys::SA_EMAIL) {
            Some(email) => Some(ServiceAccount {
                email,
                project: require(EnvKeys::GCP_PROJECT)?,
                key_file: PathBuf::from(require(EnvKeys::CREDENTIALS)?),
            }),
            None => None,
        };

        Ok(Self {
            github_sha,
            service_account,
            pipeline_function_name: require(EnvKeys::PIPELINE_FUNCTION_NAME)?,
            pipeline_file_path: PathBuf::from(require(EnvKeys::PIPELINE_FILE_PATH)?),
            version_with_github_sha,
            kubeflow_url: get(EnvKeys::KUBEFLOW_URL)
                .map(|url| url.trim_end_matches('/').to_string()),
            namespace: get(EnvKeys::NAMESPACE),
            experiment_name: get(EnvKeys::EXPERIMENT_NAME)
                .unwrap_or_else(|| DEFAULT_EXPERIMENT.to_string()),
            parameters_path: get(EnvKeys::PIPELINE_PARAMETERS_PATH).map(PathBuf::from),
            run_pipeline: toggle(EnvKeys::RUN_PIPELINE),
            run_recurring_pipeline: toggle(EnvKeys::RUN_RECURRING_PIPELINE),
            recurring_cron_expression: get(EnvKeys::RECURRING_CRON_EXPRESSION),
            package_dir: PathBuf::from("."),
        })
    }

    pub fn with_package_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.package_dir = dir.into();
        self
    }

    /// Checks the keys only the remote half of a deploy needs.
    pub fn require_remote(&self) -> Result<&str> {
        if self.github_sha.is_none() {
            return Err(Error::config_missing_key(EnvKeys::GITHUB_SHA));
        }
        self.require_schedule()?;
        self.kubeflow_url
            .as_deref()
            .ok_or_else(|| Error::config_missing_key(EnvKeys::KUBEFLOW_URL))
    }

    /// A recurring run needs a cron expression.
    pub fn require_schedule(&self) -> Result<()> {
        if self.run_recurring_pipeline && self.recurring_cron_expression.is_none() {
            return Err(Error::config_missing_key(EnvKeys::RECURRING_CRON_EXPRESSION)
                .with_hint(format!(
                    "{} is enabled but no cron expression was given",
                    EnvKeys::RUN_RECURRING_PIPELINE
                )));
        }
        Ok(())
    }

    /// Version tag passed into pipeline construction, when enabled.
    pub fn construction_version(&self) -> Option<&str> {
        if self.version_with_github_sha {
            self.github_sha.as_deref()
        } else {
            None
        }
    }

    pub fn package_path(&self) -> PathBuf {
        self.package_dir
            .join(format!("{}.zip", self.pipeline_function_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            (EnvKeys::PIPELINE_FUNCTION_NAME, "demo"),
            (EnvKeys::PIPELINE_FILE_PATH, "pipelines/demo.yaml"),
        ]
    }

    #[test]
    fn minimal_environment_uses_defaults() {
        let config = Config::from_lookup(lookup(&base())).unwrap();

        assert_eq!(config.pipeline_function_name, "demo");
        assert_eq!(config.experiment_name, DEFAULT_EXPERIMENT);
        assert!(!config.run_pipeline);
        assert!(!config.run_recurring_pipeline);
        assert!(config.service_account.is_none());
        assert_eq!(config.package_path(), PathBuf::from("./demo.zip"));
    }

    #[test]
    fn missing_function_name_is_reported_by_key() {
        let err = Config::from_lookup(lookup(&[(EnvKeys::PIPELINE_FILE_PATH, "p.yaml")]))
            .unwrap_err();
        assert_eq!(err.code.as_str(), "config.missing_key");
        assert_eq!(err.details["key"], EnvKeys::PIPELINE_FUNCTION_NAME);
    }

    #[test]
    fn toggles_require_the_exact_string_true() {
        let mut pairs = base();
        pairs.push((EnvKeys::RUN_PIPELINE, "True"));
        pairs.push((EnvKeys::VERSIONING_WITH_GITHUB_SHA, "1"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert!(!config.run_pipeline);
        assert!(!config.version_with_github_sha);

        let mut pairs = base();
        pairs.push((EnvKeys::RUN_PIPELINE, "true"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert!(config.run_pipeline);
    }

    #[test]
    fn recurring_run_without_cron_fails_the_remote_check() {
        let mut pairs = base();
        pairs.push((EnvKeys::GITHUB_SHA, "abc123"));
        pairs.push((EnvKeys::KUBEFLOW_URL, "https://kfp.example.com"));
        pairs.push((EnvKeys::RUN_RECURRING_PIPELINE, "true"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        let err = config.require_remote().unwrap_err();
        assert_eq!(err.details["key"], EnvKeys::RECURRING_CRON_EXPRESSION);

        pairs.push((EnvKeys::RECURRING_CRON_EXPRESSION, "0 0 * * *"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert!(config.require_schedule().is_ok());
    }

    #[test]
    fn empty_inputs_count_as_unset() {
        let mut pairs = base();
        pairs.push((EnvKeys::EXPERIMENT_NAME, ""));
        pairs.push((EnvKeys::SA_EMAIL, ""));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.experiment_name, DEFAULT_EXPERIMENT);
        assert!(config.service_account.is_none());
    }

    #[test]
    fn service_account_needs_project_and_key_file() {
        let mut pairs = base();
        pairs.push((EnvKeys::SA_EMAIL, "ci@project.iam.gserviceaccount.com"));
        pairs.push((EnvKeys::GCP_PROJECT, "project"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err.details["key"], EnvKeys::CREDENTIALS);
    }

    #[test]
    fn construction_version_follows_toggle() {
        let mut pairs = base();
        pairs.push((EnvKeys::GITHUB_SHA, "abc123"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.construction_version(), None);

        pairs.push((EnvKeys::VERSIONING_WITH_GITHUB_SHA, "true"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.construction_version(), Some("abc123"));
    }

    #[test]
    fn remote_requirements_checked_separately() {
        let mut pairs = base();
        pairs.push((EnvKeys::GITHUB_SHA, "abc123"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        let err = config.require_remote().unwrap_err();
        assert_eq!(err.details["key"], EnvKeys::KUBEFLOW_URL);

        pairs.push((EnvKeys::KUBEFLOW_URL, "https://kfp.example.com/"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.require_remote().unwrap(), "https://kfp.example.com");
    }
}
