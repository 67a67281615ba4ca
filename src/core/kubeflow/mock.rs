//! In-memory pipeline service for testing.
//!
//! Keeps pipelines and experiments in maps, assigns sequential IDs and
//! records every call, so registration and trigger logic can be checked
//! without a cluster.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{
    Experiment, Pipeline, PipelineService, PipelineVersion, RecurringRun, Run, RunRequest,
};
use crate::error::{Error, RemoteApiFailedDetails, Result};
use crate::params::Params;

/// One recorded call against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetPipelineId(String),
    UploadPipeline { name: String, package: PathBuf },
    UploadPipelineVersion { pipeline_id: String, version_name: String, package: PathBuf },
    GetExperiment(String),
    CreateExperiment(String),
    RunPipeline { job_name: String },
    CreateRecurringRun { job_name: String, cron: String },
}

/// A run submission as the service received it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedRun {
    pub pipeline_id: String,
    pub experiment_id: String,
    pub job_name: String,
    pub params: Params,
    pub cron: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MockPipeline {
    pub id: String,
    pub versions: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MockService {
    /// All calls made against this service, in order.
    pub calls: Vec<Call>,
    /// Registered pipelines, keyed by name.
    pub pipelines: BTreeMap<String, MockPipeline>,
    /// Registered experiment IDs, keyed by name.
    pub experiments: BTreeMap<String, String>,
    pub runs: Vec<SubmittedRun>,
    pub recurring_runs: Vec<SubmittedRun>,
    /// When set, name lookups fail as a server error would.
    pub fail_lookups: bool,
    next_id: u32,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register a pipeline under a known ID.
    pub fn with_pipeline(mut self, name: &str, id: &str) -> Self {
        self.pipelines.insert(
            name.to_string(),
            MockPipeline {
                id: id.to_string(),
                versions: Vec::new(),
            },
        );
        self
    }

    /// Pre-register an experiment under a known ID.
    pub fn with_experiment(mut self, name: &str, id: &str) -> Self {
        self.experiments.insert(name.to_string(), id.to_string());
        self
    }

    /// Make every name lookup fail with an HTTP 503.
    pub fn with_failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    /// Number of recorded calls that create or upload something.
    pub fn write_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| {
                !matches!(call, Call::GetPipelineId(_) | Call::GetExperiment(_))
            })
            .count()
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn lookup_failure(&self, endpoint: &str) -> Result<()> {
        if !self.fail_lookups {
            return Ok(());
        }
        Err(Error::remote_api_failed(RemoteApiFailedDetails {
            method: "GET".to_string(),
            url: format!("mock://apis/v1beta1/{}", endpoint),
            status: Some(503),
            body: "service unavailable".to_string(),
        }))
    }

    fn submitted(request: &RunRequest<'_>, cron: Option<&str>) -> SubmittedRun {
        SubmittedRun {
            pipeline_id: request.pipeline_id.to_string(),
            experiment_id: request.experiment_id.to_string(),
            job_name: request.job_name.to_string(),
            params: request.params.clone(),
            cron: cron.map(str::to_string),
        }
    }
}

impl PipelineService for MockService {
    fn get_pipeline_id(&mut self, name: &str) -> Result<Option<String>> {
        self.calls.push(Call::GetPipelineId(name.to_string()));
        self.lookup_failure("pipelines")?;
        Ok(self.pipelines.get(name).map(|p| p.id.clone()))
    }

    fn upload_pipeline(&mut self, package: &Path, name: &str) -> Result<Pipeline> {
        self.calls.push(Call::UploadPipeline {
            name: name.to_string(),
            package: package.to_path_buf(),
        });
        if self.pipelines.contains_key(name) {
            return Err(Error::validation_invalid_argument(
                "name",
                format!("Pipeline '{}' already exists", name),
                None,
            ));
        }

        let id = self.next_id("pipeline");
        self.pipelines.insert(
            name.to_string(),
            MockPipeline {
                id: id.clone(),
                versions: vec![name.to_string()],
            },
        );
        Ok(Pipeline {
            id,
            name: name.to_string(),
        })
    }

    fn upload_pipeline_version(
        &mut self,
        package: &Path,
        version_name: &str,
        pipeline_id: &str,
    ) -> Result<PipelineVersion> {
        self.calls.push(Call::UploadPipelineVersion {
            pipeline_id: pipeline_id.to_string(),
            version_name: version_name.to_string(),
            package: package.to_path_buf(),
        });

        let id = self.next_id("version");
        let pipeline = self
            .pipelines
            .values_mut()
            .find(|p| p.id == pipeline_id)
            .ok_or_else(|| Error::remote_not_found("Pipeline", pipeline_id))?;
        pipeline.versions.push(version_name.to_string());

        Ok(PipelineVersion {
            id,
            name: version_name.to_string(),
        })
    }

    fn get_experiment(&mut self, name: &str) -> Result<Option<Experiment>> {
        self.calls.push(Call::GetExperiment(name.to_string()));
        self.lookup_failure("experiments")?;
        Ok(self.experiments.get(name).map(|id| Experiment {
            id: id.clone(),
            name: name.to_string(),
        }))
    }

    fn create_experiment(&mut self, name: &str) -> Result<Experiment> {
        self.calls.push(Call::CreateExperiment(name.to_string()));
        let id = self.next_id("experiment");
        self.experiments.insert(name.to_string(), id.clone());
        Ok(Experiment {
            id,
            name: name.to_string(),
        })
    }

    fn run_pipeline(&mut self, request: &RunRequest<'_>) -> Result<Run> {
        self.calls.push(Call::RunPipeline {
            job_name: request.job_name.to_string(),
        });
        self.runs.push(Self::submitted(request, None));
        Ok(Run {
            id: self.next_id("run"),
            name: request.job_name.to_string(),
        })
    }

    fn create_recurring_run(
        &mut self,
        request: &RunRequest<'_>,
        cron: &str,
    ) -> Result<RecurringRun> {
        self.calls.push(Call::CreateRecurringRun {
            job_name: request.job_name.to_string(),
            cron: cron.to_string(),
        });
        self.recurring_runs.push(Self::submitted(request, Some(cron)));
        Ok(RecurringRun {
            id: self.next_id("job"),
            name: request.job_name.to_string(),
            cron: cron.to_string(),
        })
    }
}
