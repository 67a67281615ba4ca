//! Kubeflow Pipelines service seam.
//!
//! Registration and triggering only talk to [`PipelineService`]. The HTTP
//! implementation lives in [`client`]; [`mock`] is an in-memory stand-in
//! that records every call.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::params::Params;

pub mod client;
pub mod mock;

pub use client::KubeflowClient;
pub use mock::MockService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineVersion {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A cron-scheduled run. Kubeflow calls these "jobs".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringRun {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cron: String,
}

/// Everything a one-off or recurring run submission references.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub pipeline_id: &'a str,
    pub experiment_id: &'a str,
    pub job_name: &'a str,
    pub params: &'a Params,
}

/// Remote operations of the pipeline orchestration service.
///
/// Lookups return `Ok(None)` when nothing matches; `Err` is reserved for
/// transport and server failures.
pub trait PipelineService {
    fn get_pipeline_id(&mut self, name: &str) -> Result<Option<String>>;

    fn upload_pipeline(&mut self, package: &Path, name: &str) -> Result<Pipeline>;

    fn upload_pipeline_version(
        &mut self,
        package: &Path,
        version_name: &str,
        pipeline_id: &str,
    ) -> Result<PipelineVersion>;

    fn get_experiment(&mut self, name: &str) -> Result<Option<Experiment>>;

    fn create_experiment(&mut self, name: &str) -> Result<Experiment>;

    fn run_pipeline(&mut self, request: &RunRequest<'_>) -> Result<Run>;

    fn create_recurring_run(&mut self, request: &RunRequest<'_>, cron: &str)
        -> Result<RecurringRun>;
}
