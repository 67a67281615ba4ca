//! Blocking HTTP client for the Kubeflow Pipelines REST API (`v1beta1`).

use std::path::Path;

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    Experiment, Pipeline, PipelineService, PipelineVersion, RecurringRun, Run, RunRequest,
};
use crate::error::{Error, RemoteApiFailedDetails, Result};
use crate::params::wire_value;

const API_PREFIX: &str = "/apis/v1beta1";
const UPLOAD_FIELD: &str = "uploadfile";
const RECURRING_MAX_CONCURRENCY: &str = "1";

#[derive(Debug, Deserialize)]
struct ListPipelinesResponse {
    #[serde(default)]
    pipelines: Vec<Pipeline>,
}

#[derive(Debug, Deserialize)]
struct ListExperimentsResponse {
    #[serde(default)]
    experiments: Vec<Experiment>,
}

#[derive(Debug, Deserialize)]
struct RunDetail {
    run: Run,
}

#[derive(Debug, Deserialize)]
struct Job {
    id: String,
    #[serde(default)]
    name: String,
}

/// HTTP client for one Kubeflow Pipelines endpoint.
pub struct KubeflowClient {
    client: Client,
    base_url: String,
    namespace: Option<String>,
}

impl KubeflowClient {
    pub fn new(base_url: &str, namespace: Option<String>) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        if base_url.is_empty() {
            return Err(Error::config_invalid_value(
                "INPUT_KUBEFLOW_URL",
                None,
                "Kubeflow URL cannot be empty",
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::config_invalid_value(
                "INPUT_KUBEFLOW_URL",
                Some(base_url.to_string()),
                "Kubeflow URL must start with http:// or https://",
            ));
        }

        Ok(Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            namespace,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, endpoint)
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(endpoint);
        let request = self.client.get(&url).query(query);
        send("GET", &url, request)
    }

    fn post<T: DeserializeOwned>(&self, endpoint: &str, body: &Value) -> Result<T> {
        let url = self.url(endpoint);
        let request = self.client.post(&url).json(body);
        send("POST", &url, request)
    }

    fn upload<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        package: &Path,
    ) -> Result<T> {
        let url = self.url(endpoint);
        let form = multipart::Form::new()
            .file(UPLOAD_FIELD, package)
            .map_err(|e| {
                Error::internal_io(e.to_string(), Some(format!("read {}", package.display())))
            })?;
        let request = self.client.post(&url).query(query).multipart(form);
        send("POST", &url, request)
    }
}

impl PipelineService for KubeflowClient {
    fn get_pipeline_id(&mut self, name: &str) -> Result<Option<String>> {
        let response: ListPipelinesResponse = self.get(
            "/pipelines",
            &[("filter", name_filter(name)), ("page_size", "1".to_string())],
        )?;
        Ok(response.pipelines.into_iter().next().map(|p| p.id))
    }

    fn upload_pipeline(&mut self, package: &Path, name: &str) -> Result<Pipeline> {
        self.upload(
            "/pipelines/upload",
            &[("name", name.to_string())],
            package,
        )
    }

    fn upload_pipeline_version(
        &mut self,
        package: &Path,
        version_name: &str,
        pipeline_id: &str,
    ) -> Result<PipelineVersion> {
        self.upload(
            "/pipelines/upload_version",
            &[
                ("name", version_name.to_string()),
                ("pipelineid", pipeline_id.to_string()),
            ],
            package,
        )
    }

    fn get_experiment(&mut self, name: &str) -> Result<Option<Experiment>> {
        let mut query = vec![("filter", name_filter(name)), ("page_size", "1".to_string())];
        if let Some(namespace) = &self.namespace {
            query.push(("resource_reference_key.type", "NAMESPACE".to_string()));
            query.push(("resource_reference_key.id", namespace.clone()));
        }

        let response: ListExperimentsResponse = self.get("/experiments", &query)?;
        Ok(response.experiments.into_iter().next())
    }

    fn create_experiment(&mut self, name: &str) -> Result<Experiment> {
        self.post("/experiments", &experiment_body(name, self.namespace.as_deref()))
    }

    fn run_pipeline(&mut self, request: &RunRequest<'_>) -> Result<Run> {
        let detail: RunDetail = self.post("/runs", &run_body(request))?;
        Ok(detail.run)
    }

    fn create_recurring_run(
        &mut self,
        request: &RunRequest<'_>,
        cron: &str,
    ) -> Result<RecurringRun> {
        let job: Job = self.post("/jobs", &recurring_run_body(request, cron))?;
        Ok(RecurringRun {
            id: job.id,
            name: job.name,
            cron: cron.to_string(),
        })
    }
}

/// List filter matching resources whose name equals `name`.
pub(crate) fn name_filter(name: &str) -> String {
    json!({
        "predicates": [{
            "key": "name",
            "op": "EQUALS",
            "string_value": name,
        }]
    })
    .to_string()
}

pub(crate) fn experiment_body(name: &str, namespace: Option<&str>) -> Value {
    let mut body = json!({ "name": name });
    if let Some(namespace) = namespace {
        body["resource_references"] = json!([{
            "key": { "type": "NAMESPACE", "id": namespace },
            "relationship": "OWNER",
        }]);
    }
    body
}

fn pipeline_spec(request: &RunRequest<'_>) -> Value {
    let parameters: Vec<Value> = request
        .params
        .iter()
        .map(|(name, value)| json!({ "name": name, "value": wire_value(value) }))
        .collect();

    json!({
        "pipeline_id": request.pipeline_id,
        "parameters": parameters,
    })
}

fn experiment_reference(experiment_id: &str) -> Value {
    json!([{
        "key": { "type": "EXPERIMENT", "id": experiment_id },
        "relationship": "OWNER",
    }])
}

pub(crate) fn run_body(request: &RunRequest<'_>) -> Value {
    json!({
        "name": request.job_name,
        "pipeline_spec": pipeline_spec(request),
        "resource_references": experiment_reference(request.experiment_id),
    })
}

pub(crate) fn recurring_run_body(request: &RunRequest<'_>, cron: &str) -> Value {
    json!({
        "name": request.job_name,
        "pipeline_spec": pipeline_spec(request),
        "resource_references": experiment_reference(request.experiment_id),
        "max_concurrency": RECURRING_MAX_CONCURRENCY,
        "trigger": { "cron_schedule": { "cron": cron } },
        "enabled": true,
    })
}

fn send<T: DeserializeOwned>(method: &str, url: &str, request: RequestBuilder) -> Result<T> {
    let response = request.send().map_err(|e| {
        Error::remote_api_failed(RemoteApiFailedDetails {
            method: method.to_string(),
            url: url.to_string(),
            status: None,
            body: e.to_string(),
        })
    })?;
    parse_json_response(method, url, response)
}

fn parse_json_response<T: DeserializeOwned>(
    method: &str,
    url: &str,
    response: Response,
) -> Result<T> {
    let status = response.status();
    let body = response.text().map_err(|e| {
        Error::remote_api_failed(RemoteApiFailedDetails {
            method: method.to_string(),
            url: url.to_string(),
            status: Some(status.as_u16()),
            body: e.to_string(),
        })
    })?;

    if !status.is_success() {
        return Err(Error::remote_api_failed(RemoteApiFailedDetails {
            method: method.to_string(),
            url: url.to_string(),
            status: Some(status.as_u16()),
            body,
        }));
    }

    let value: Value = serde_json::from_str(&body)
        .map_err(|e| Error::internal_json(e.to_string(), Some(format!("parse {} response", url))))?;

    serde_json::from_value(value.clone()).map_err(|e| {
        Error::remote_invalid_response(format!("Unexpected response from {}: {}", url, e), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;

    fn params() -> Params {
        let mut params = Params::new();
        params.insert("n_cols".to_string(), json!(5));
        params.insert("bucket".to_string(), json!("gs://data"));
        params
    }

    #[test]
    fn rejects_urls_without_scheme() {
        let err = KubeflowClient::new("kfp.example.com", None).err().unwrap();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert!(KubeflowClient::new("https://kfp.example.com/", None).is_ok());
    }

    #[test]
    fn endpoints_are_rooted_at_the_api_prefix() {
        let client = KubeflowClient::new("https://kfp.example.com/", None).unwrap();
        assert_eq!(
            client.url("/pipelines"),
            "https://kfp.example.com/apis/v1beta1/pipelines"
        );
    }

    #[test]
    fn name_filter_matches_by_equality() {
        let filter: Value = serde_json::from_str(&name_filter("demo-nightly")).unwrap();
        assert_eq!(filter["predicates"][0]["key"], "name");
        assert_eq!(filter["predicates"][0]["op"], "EQUALS");
        assert_eq!(filter["predicates"][0]["string_value"], "demo-nightly");
    }

    #[test]
    fn experiment_body_references_namespace_only_when_set() {
        assert_eq!(experiment_body("Default", None), json!({ "name": "Default" }));

        let body = experiment_body("demo-nightly", Some("team-a"));
        assert_eq!(body["resource_references"][0]["key"]["id"], "team-a");
        assert_eq!(body["resource_references"][0]["key"]["type"], "NAMESPACE");
    }

    #[test]
    fn run_body_stringifies_parameters() {
        let params = params();
        let request = RunRequest {
            pipeline_id: "p-1",
            experiment_id: "e-1",
            job_name: "Run_demo_on_2026-10-19 12:00:00",
            params: &params,
        };

        let body = run_body(&request);
        assert_eq!(body["name"], "Run_demo_on_2026-10-19 12:00:00");
        assert_eq!(body["pipeline_spec"]["pipeline_id"], "p-1");
        assert_eq!(
            body["pipeline_spec"]["parameters"],
            json!([
                { "name": "bucket", "value": "gs://data" },
                { "name": "n_cols", "value": "5" },
            ])
        );
        assert_eq!(body["resource_references"][0]["key"]["id"], "e-1");
        assert!(body.get("trigger").is_none());
    }

    #[test]
    fn recurring_body_carries_cron_verbatim() {
        let params = params();
        let request = RunRequest {
            pipeline_id: "p-1",
            experiment_id: "e-1",
            job_name: "Recurring_run_demo_on_2026-10-19 12:00:00",
            params: &params,
        };

        let body = recurring_run_body(&request, "0 0 * * *");
        assert_eq!(body["trigger"]["cron_schedule"]["cron"], "0 0 * * *");
        assert_eq!(body["enabled"], true);
        assert_eq!(body["max_concurrency"], "1");
    }

    fn response(status: u16, body: &str) -> Response {
        Response::from(
            http::Response::builder()
                .status(status)
                .body(body.to_string())
                .unwrap(),
        )
    }

    const URL: &str = "https://kfp.example.com/apis/v1beta1/experiments";

    #[test]
    fn empty_list_body_parses_as_no_match() {
        let parsed: ListExperimentsResponse =
            parse_json_response("GET", URL, response(200, "{}")).unwrap();
        assert!(parsed.experiments.is_empty());
    }

    #[test]
    fn listed_experiment_is_returned() {
        let parsed: ListExperimentsResponse = parse_json_response(
            "GET",
            URL,
            response(200, r#"{"experiments":[{"id":"e-1","name":"Default"}]}"#),
        )
        .unwrap();
        assert_eq!(parsed.experiments[0].id, "e-1");
    }

    #[test]
    fn server_error_status_is_a_retryable_api_failure() {
        let err = parse_json_response::<Experiment>("POST", URL, response(503, "unavailable"))
            .unwrap_err();
        assert_eq!(err.code.as_str(), "remote.api_failed");
        assert_eq!(err.retryable, Some(true));
        assert_eq!(err.details["status"], 503);
        assert_eq!(err.details["body"], "unavailable");
    }

    #[test]
    fn client_error_status_is_not_retryable() {
        let err = parse_json_response::<Experiment>("POST", URL, response(400, "{}"))
            .unwrap_err();
        assert_eq!(err.code.as_str(), "remote.api_failed");
        assert_eq!(err.retryable, Some(false));
    }

    #[test]
    fn success_body_without_id_is_an_invalid_response() {
        let err = parse_json_response::<Experiment>("POST", URL, response(200, r#"{"name":"x"}"#))
            .unwrap_err();
        assert_eq!(err.code.as_str(), "remote.invalid_response");
        assert_eq!(err.details["body"]["name"], "x");
    }

    #[test]
    fn non_json_success_body_is_a_json_error() {
        let err = parse_json_response::<Experiment>("GET", URL, response(200, "<html>"))
            .unwrap_err();
        assert_eq!(err.code.as_str(), "internal.json_error");
    }
}
