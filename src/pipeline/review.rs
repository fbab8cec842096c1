//! T2 Verification portal: submit captured data for human review and read
//! reviewed tasks back.
//!
//! A submitted task carries the document itself (base64 PNG, see
//! [`crate::pipeline::encode`]) so reviewers can compare the captured fields
//! with the page. New tasks always start as `unassigned`.

use crate::config::PipelineConfig;
use crate::error::{ExtractorError, ServiceStage};
use crate::pipeline::encode;
use crate::pipeline::http::{self, RetryPolicy};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Status assigned to every newly submitted task.
pub const INITIAL_STATUS: &str = "unassigned";

/// Review priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    #[default]
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" | "baixa" => Ok(Priority::Low),
            "medium" | "média" | "media" => Ok(Priority::Medium),
            "high" | "alta" => Ok(Priority::High),
            _ => Err(format!("unknown priority '{s}'. Valid options: low, medium, high")),
        }
    }
}

/// Task record posted to the portal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewTask {
    pub project: String,
    #[serde(rename = "t2layout")]
    pub layout: String,
    #[serde(rename = "t2priority")]
    pub priority: Priority,
    #[serde(rename = "t2document")]
    pub document: String,
    #[serde(rename = "t2status")]
    pub status: String,
    #[serde(rename = "t2verification")]
    pub verification: Value,
}

/// Task record as returned by the portal's project listing.
///
/// Values are passed through as the portal sends them, so a number or
/// `null` is accepted in any field. Every key must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewedTask {
    pub id: Value,
    pub project: Value,
    #[serde(rename = "t2layout")]
    pub layout: Value,
    #[serde(rename = "t2priority")]
    pub priority: Value,
    #[serde(rename = "t2document")]
    pub document: Value,
    #[serde(rename = "t2status")]
    pub status: Value,
    #[serde(rename = "t2verification")]
    pub verification: Value,
    #[serde(rename = "t2modified")]
    pub modified: Value,
    #[serde(rename = "t2observation")]
    pub observation: Value,
    pub tasks_without_user: Value,
    pub tasks_assigned_to_user: Value,
    #[serde(rename = "t2date")]
    pub requested_at: Value,
    #[serde(rename = "t2user")]
    pub user: Value,
}

/// Reshape a nested JSON completion into `key → first value`.
///
/// Accepted shapes:
/// * an object whose values are all non-empty arrays or objects,
///   e.g. `{"name": ["ACME", "ACME LTDA"]}` → `{"name": "ACME"}`;
/// * an array of single-key objects, merged left to right,
///   e.g. `[{"name": "ACME"}, {"cnpj": "12"}]` → `{"name": "ACME", "cnpj": "12"}`.
///
/// Anything else, including text that is not JSON, comes back unchanged as
/// a JSON string.
pub fn flatten_verification(completion: &str) -> Value {
    let fallback = || Value::String(completion.to_string());
    let Ok(parsed) = serde_json::from_str::<Value>(completion.trim()) else {
        return fallback();
    };

    let flattened = match &parsed {
        Value::Object(map) => flatten_object(map),
        Value::Array(items) => flatten_array(items),
        _ => None,
    };
    flattened.map(Value::Object).unwrap_or_else(fallback)
}

fn first_value(v: &Value) -> Option<&Value> {
    match v {
        Value::Array(items) => items.first(),
        Value::Object(map) => map.values().next(),
        _ => None,
    }
}

fn flatten_object(map: &Map<String, Value>) -> Option<Map<String, Value>> {
    if map.is_empty() {
        return None;
    }
    map.iter()
        .map(|(k, v)| first_value(v).map(|first| (k.clone(), first.clone())))
        .collect()
}

fn flatten_array(items: &[Value]) -> Option<Map<String, Value>> {
    if items.is_empty() {
        return None;
    }
    let mut out = Map::new();
    for item in items {
        let map = item.as_object()?;
        if map.len() != 1 {
            return None;
        }
        let (key, value) = map.iter().next()?;
        out.insert(key.clone(), value.clone());
    }
    Some(out)
}

/// Client for the T2 Verification portal.
#[derive(Debug, Clone)]
pub struct ReviewClient {
    client: Client,
    tasks_url: String,
    list_url: String,
    dpi: u32,
    flatten: bool,
    retry: RetryPolicy,
}

impl ReviewClient {
    /// Build a review client from the pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ExtractorError> {
        let (Some(tasks_url), Some(list_url)) = (&config.review_tasks_url, &config.review_list_url)
        else {
            return Err(ExtractorError::InvalidConfig(
                "review portal endpoints are not configured".into(),
            ));
        };
        Ok(Self {
            client: http::build_client(config.http_timeout_secs)?,
            tasks_url: tasks_url.clone(),
            list_url: list_url.clone(),
            dpi: config.dpi,
            flatten: config.flatten_verification,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_ms: config.retry_backoff_ms,
            },
        })
    }

    /// Build the task record for a document without sending it.
    pub async fn build_task(
        &self,
        path: &Path,
        completion: &str,
        layout: &str,
        project: &str,
        priority: Priority,
    ) -> Result<ReviewTask, ExtractorError> {
        let document = encode::document_to_base64(path, self.dpi).await?;
        let verification = if self.flatten {
            flatten_verification(completion)
        } else {
            Value::String(completion.to_string())
        };

        Ok(ReviewTask {
            project: project.to_string(),
            layout: layout.to_string(),
            priority,
            document,
            status: INITIAL_STATUS.to_string(),
            verification,
        })
    }

    /// Submit a document and its captured data for review.
    ///
    /// # Errors
    /// [`ExtractorError::ExternalService`] for any status other than 200/201,
    /// with the status and response body in the message.
    pub async fn submit_for_review(
        &self,
        path: impl AsRef<Path>,
        completion: &str,
        layout: &str,
        token: &str,
        project: &str,
        priority: Priority,
    ) -> Result<(), ExtractorError> {
        let path = path.as_ref();
        info!("Submitting {} to project {} for review", path.display(), project);

        let task = self
            .build_task(path, completion, layout, project, priority)
            .await?;
        self.post_task(&task, token).await
    }

    /// POST a prepared task.
    pub async fn post_task(&self, task: &ReviewTask, token: &str) -> Result<(), ExtractorError> {
        let response = http::send_with_retry(ServiceStage::Review, self.retry, || {
            self.client
                .post(&self.tasks_url)
                .bearer_auth(token)
                .json(task)
        })
        .await?;

        let (status, body) = http::error_body(response).await;
        if status == StatusCode::OK || status == StatusCode::CREATED {
            debug!("Portal accepted task: {}", body);
            Ok(())
        } else {
            Err(ExtractorError::service(
                ServiceStage::Review,
                format!("status code {}, message: {}", status.as_u16(), body),
            ))
        }
    }

    /// URL listing the tasks of `project_id`.
    pub fn list_url_for(&self, project_id: &str) -> String {
        format!("{}{}/", self.list_url, project_id)
    }

    /// List every task of a project.
    ///
    /// # Errors
    /// - [`ExtractorError::ExternalService`] when the status is not 200
    /// - [`ExtractorError::MalformedResponse`] when the body is not an array
    ///   of task records
    pub async fn list_reviewed_tasks(
        &self,
        project_id: &str,
        token: &str,
    ) -> Result<Vec<ReviewedTask>, ExtractorError> {
        info!("Fetching reviewed tasks for project {}", project_id);
        let url = self.list_url_for(project_id);

        let response = http::send_with_retry(ServiceStage::Review, self.retry, || {
            self.client.get(&url).bearer_auth(token)
        })
        .await?;

        if response.status() != StatusCode::OK {
            let (status, body) = http::error_body(response).await;
            return Err(ExtractorError::service(
                ServiceStage::Review,
                format!("failed to fetch tasks: status code {}, message: {}", status.as_u16(), body),
            ));
        }

        let raw = response.text().await.map_err(|e| {
            ExtractorError::service(ServiceStage::Review, format!("reading body: {}", e))
        })?;
        let tasks: Vec<ReviewedTask> = serde_json::from_str(&raw)
            .map_err(|e| ExtractorError::malformed(ServiceStage::Review, e.to_string()))?;

        info!("Received {} tasks for project {}", tasks.len(), project_id);
        Ok(tasks)
    }
}
