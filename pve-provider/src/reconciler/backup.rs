//! Backup reconciler.
//!
//! The backup endpoint answers without any identifier for the job it
//! schedules, so nothing can be read, updated or deleted afterwards. Only
//! create talks to the cluster.

use std::sync::Arc;

use async_trait::async_trait;
use pve_client::{NewBackupRequest, ProxmoxApi};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::Reconciler;
use crate::changeset::Changeset;
use crate::error::Result;

/// Declared state of a `proxmox_backup`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Locally generated, the cluster has no handle for the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Time of day, `HH:MM`.
    pub start_time: String,
    /// Back up every guest on the node.
    #[serde(default)]
    pub all: Option<bool>,
    #[serde(default)]
    pub compress: Option<String>,
    #[serde(default)]
    pub mail_notification: Option<String>,
    #[serde(default)]
    pub mail_to: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
}

/// Backup reconciler.
pub struct BackupReconciler {
    api: Arc<dyn ProxmoxApi>,
}

impl BackupReconciler {
    pub fn new(api: Arc<dyn ProxmoxApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Reconciler for BackupReconciler {
    type Record = BackupRecord;

    async fn create(&self, record: &mut BackupRecord) -> Result<()> {
        record.id = None;
        info!(start_time = %record.start_time, node = ?record.node, "Creating backup job");

        self.api
            .create_backup(&NewBackupRequest {
                starttime: record.start_time.clone(),
                all: record.all,
                compress: record.compress.clone(),
                mailnotification: record.mail_notification.clone(),
                mailto: record.mail_to.clone(),
                mode: record.mode.clone(),
                node: record.node.clone(),
            })
            .await?;

        record.id = Some(Uuid::new_v4().to_string());
        Ok(())
    }

    async fn read(&self, _record: &mut BackupRecord) -> Result<()> {
        Ok(())
    }

    async fn apply(
        &self,
        state: &mut BackupRecord,
        planned: &BackupRecord,
        _changes: &mut Changeset,
    ) -> Result<()> {
        debug!(id = ?state.id, "Backup jobs cannot be updated, keeping planned values locally");
        let id = state.id.take();
        *state = planned.clone();
        state.id = id;
        Ok(())
    }

    async fn delete(&self, _record: &BackupRecord) -> Result<()> {
        Ok(())
    }
}
