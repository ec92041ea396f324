//! Task-status poller.
//!
//! Asynchronous cluster operations (create, start, shutdown, delete) return a
//! UPID. The poller queries the task until it is stopped, backing off
//! exponentially between queries, and gives up once the configured deadline
//! has passed.

use std::sync::Arc;

use pve_client::{ProxmoxApi, Upid};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::PollSettings;
use crate::error::{ProviderError, Result};

/// Exit status reported by successful tasks.
pub const EXIT_OK: &str = "OK";

/// Terminal result of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub exit_status: Option<String>,
}

impl TaskOutcome {
    /// Success is an exit status of exactly `OK`.
    pub fn is_success(&self) -> bool {
        self.exit_status.as_deref() == Some(EXIT_OK)
    }

    /// Turn a non-`OK` outcome into [`ProviderError::TaskFailed`].
    pub fn into_result(self, node: &str, upid: &Upid) -> Result<()> {
        if self.is_success() {
            return Ok(());
        }
        Err(ProviderError::TaskFailed {
            node: node.to_string(),
            upid: upid.clone(),
            exit_status: self.exit_status.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

/// Waits for cluster tasks to finish.
#[derive(Clone)]
pub struct TaskPoller {
    api: Arc<dyn ProxmoxApi>,
    settings: PollSettings,
}

impl TaskPoller {
    pub fn new(api: Arc<dyn ProxmoxApi>, settings: PollSettings) -> Self {
        Self { api, settings }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Poll until the task stops and return its outcome.
    ///
    /// Transport errors are returned immediately. A task still running at
    /// the deadline yields [`ProviderError::TaskTimeout`].
    pub async fn wait(&self, node: &str, upid: &Upid) -> Result<TaskOutcome> {
        let deadline = Instant::now() + self.settings.timeout;
        let mut interval = self.settings.initial_interval;
        let mut polls = 0u32;

        loop {
            let status = self.api.task_status(node, upid).await?;
            polls += 1;

            if status.is_terminal() {
                debug!(
                    node = %node,
                    upid = %upid,
                    exit_status = ?status.exitstatus,
                    polls,
                    "Task finished"
                );
                return Ok(TaskOutcome {
                    exit_status: status.exitstatus,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(node = %node, upid = %upid, polls, "Timed out waiting for task");
                return Err(ProviderError::TaskTimeout {
                    node: node.to_string(),
                    upid: upid.clone(),
                    timeout: self.settings.timeout,
                });
            }

            tokio::time::sleep(interval.min(deadline - now)).await;
            interval = self.settings.next_interval(interval);
        }
    }

    /// Wait for the task and fail unless it exited `OK`.
    pub async fn run(&self, node: &str, upid: &Upid) -> Result<()> {
        self.wait(node, upid).await?.into_result(node, upid)
    }
}
