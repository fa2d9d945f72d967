//! Downstream workflow enqueue
//!
//! Fire-and-forget handoff of long-running work to the workflow service.
//! Nothing here is awaited for correctness: a failed enqueue is logged and
//! the sync run continues.

use crate::config::WorkflowConfig;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// A workflow start request
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowJob {
    pub workflow: &'static str,
    /// Defaults to the configured task queue when unset
    pub task_queue: Option<String>,
    pub payload: Value,
}

pub struct WorkflowClient {
    http: reqwest::Client,
    base_url: String,
    namespace: String,
    task_queue: String,
}

impl WorkflowClient {
    pub fn new(config: &WorkflowConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            task_queue: config.task_queue.clone(),
        }
    }

    /// Enqueue a workflow. Errors are logged, never propagated.
    pub async fn enqueue(&self, job: WorkflowJob) {
        let task_queue = job
            .task_queue
            .clone()
            .unwrap_or_else(|| self.task_queue.clone());
        let url = format!(
            "{}/api/v1/namespaces/{}/workflows",
            self.base_url, self.namespace
        );
        let body = serde_json::json!({
            "workflow": job.workflow,
            "taskQueue": task_queue,
            "payload": job.payload,
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(workflow = job.workflow, task_queue, "workflow enqueued");
            }
            Ok(resp) => {
                warn!(
                    workflow = job.workflow,
                    status = %resp.status(),
                    "workflow service rejected enqueue; continuing"
                );
            }
            Err(err) => {
                warn!(
                    workflow = job.workflow,
                    error = %err,
                    "workflow enqueue failed; continuing"
                );
            }
        }
    }
}
