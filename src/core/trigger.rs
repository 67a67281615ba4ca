//! One-off and recurring run submission.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::EnvKeys;
use crate::error::{Error, Result};
use crate::kubeflow::{PipelineService, RecurringRun, Run, RunRequest};
use crate::params::Params;

const JOB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which runs to submit.
#[derive(Debug, Clone, Default)]
pub struct TriggerOptions {
    pub run_once: bool,
    pub recurring: bool,
    pub cron_expression: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<Run>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_run: Option<RecurringRun>,
}

pub fn run_job_name(pipeline_name: &str, at: &DateTime<Local>) -> String {
    format!("Run_{}_on_{}", pipeline_name, at.format(JOB_TIME_FORMAT))
}

pub fn recurring_job_name(pipeline_name: &str, at: &DateTime<Local>) -> String {
    format!(
        "Recurring_run_{}_on_{}",
        pipeline_name,
        at.format(JOB_TIME_FORMAT)
    )
}

/// Submit the runs enabled in `options`. The two gates are independent.
pub fn trigger_run(
    service: &mut dyn PipelineService,
    pipeline_name: &str,
    pipeline_id: &str,
    experiment_id: &str,
    params: &Params,
    options: &TriggerOptions,
) -> Result<TriggerOutcome> {
    let mut outcome = TriggerOutcome::default();

    if options.run_once {
        let job_name = run_job_name(pipeline_name, &Local::now());
        let run = service.run_pipeline(&RunRequest {
            pipeline_id,
            experiment_id,
            job_name: &job_name,
            params,
        })?;
        log_status!("trigger", "Submitted run {}", job_name);
        outcome.run = Some(run);
    }

    if options.recurring {
        let cron = options
            .cron_expression
            .as_deref()
            .ok_or_else(|| Error::config_missing_key(EnvKeys::RECURRING_CRON_EXPRESSION))?;
        let job_name = recurring_job_name(pipeline_name, &Local::now());
        let recurring = service.create_recurring_run(
            &RunRequest {
                pipeline_id,
                experiment_id,
                job_name: &job_name,
                params,
            },
            cron,
        )?;
        log_status!("trigger", "Scheduled recurring run {} ({})", job_name, cron);
        outcome.recurring_run = Some(recurring);
    }

    Ok(outcome)
}
