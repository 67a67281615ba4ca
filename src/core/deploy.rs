//! The deploy sequence: load, compile, register, resolve, trigger.
//!
//! Steps run strictly in order and the first failure aborts the rest.
//! Nothing already registered is rolled back.

use serde::Serialize;

use crate::compiler::{self, CompiledPackage};
use crate::config::{Config, EnvKeys};
use crate::error::{Error, Result};
use crate::kubeflow::PipelineService;
use crate::params::{load_params, Params};
use crate::plugin::load_pipeline_from_path;
use crate::registration::{
    register_pipeline, resolve_experiment, RegisteredPipeline, ResolvedExperiment,
};
use crate::trigger::{trigger_run, TriggerOptions, TriggerOutcome};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub function_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub package: CompiledPackage,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutput {
    pub package: CompiledPackage,
    pub pipeline: RegisteredPipeline,
    pub experiment: ResolvedExperiment,
    pub params: Params,
    #[serde(flatten)]
    pub triggers: TriggerOutcome,
}

/// Load the configured pipeline definition and compile it to a package.
pub fn compile_pipeline(config: &Config) -> Result<CompileOutput> {
    let function = load_pipeline_from_path(
        &config.pipeline_file_path,
        &config.pipeline_function_name,
    )?;

    let version = config.construction_version();
    let definition = function.invoke(version)?;
    let package = compiler::compile(&definition, &config.package_path())?;

    Ok(CompileOutput {
        function_name: function.function_name().to_string(),
        version: version.map(str::to_string),
        package,
    })
}

/// Run the whole deploy sequence against `service`.
pub fn deploy(config: &Config, service: &mut dyn PipelineService) -> Result<DeployOutput> {
    let github_sha = config
        .github_sha
        .as_deref()
        .ok_or_else(|| Error::config_missing_key(EnvKeys::GITHUB_SHA))?;
    config.require_schedule()?;

    let compiled = compile_pipeline(config)?;
    let pipeline_name = compiled.function_name.as_str();

    let pipeline = register_pipeline(service, pipeline_name, &compiled.package.path, github_sha)?;
    let experiment = resolve_experiment(service, pipeline_name, &config.experiment_name)?;

    let params = load_params(config.parameters_path.as_deref())?;
    log_status!(
        "deploy",
        "The pipeline parameters are: {}",
        serde_json::to_string(&params).unwrap_or_default()
    );

    let options = TriggerOptions {
        run_once: config.run_pipeline,
        recurring: config.run_recurring_pipeline,
        cron_expression: config.recurring_cron_expression.clone(),
    };
    let triggers = trigger_run(
        service,
        pipeline_name,
        &pipeline.id,
        &experiment.id,
        &params,
        &options,
    )?;

    Ok(DeployOutput {
        package: compiled.package,
        pipeline,
        experiment,
        params,
        triggers,
    })
}
