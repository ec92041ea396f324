//! Group reconciler.

use std::sync::Arc;

use async_trait::async_trait;
use pve_client::{NewGroupRequest, ProxmoxApi, UpdateGroupRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ensure_unchanged, Reconciler};
use crate::changeset::Changeset;
use crate::error::Result;

const KIND: &str = "group";

/// Declared state of a `proxmox_group`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub group_id: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Group reconciler. Group operations are synchronous, no tasks involved.
pub struct GroupReconciler {
    api: Arc<dyn ProxmoxApi>,
}

impl GroupReconciler {
    pub fn new(api: Arc<dyn ProxmoxApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Reconciler for GroupReconciler {
    type Record = GroupRecord;

    async fn create(&self, record: &mut GroupRecord) -> Result<()> {
        record.id = None;
        info!(group_id = %record.group_id, "Creating group");

        self.api
            .create_group(&NewGroupRequest {
                groupid: record.group_id.clone(),
                comment: record.comment.clone(),
            })
            .await?;

        record.id = Some(record.group_id.clone());
        Ok(())
    }

    async fn read(&self, record: &mut GroupRecord) -> Result<()> {
        debug!(group_id = %record.group_id, "Reading group");
        let config = self.api.group_config(&record.group_id).await?;
        record.comment = config.comment;
        Ok(())
    }

    async fn apply(
        &self,
        state: &mut GroupRecord,
        planned: &GroupRecord,
        changes: &mut Changeset,
    ) -> Result<()> {
        ensure_unchanged(KIND, "group_id", &state.group_id, &planned.group_id)?;

        if !changes.track("comment", &state.comment, &planned.comment) {
            return Ok(());
        }

        info!(group_id = %state.group_id, "Updating group");
        self.api
            .update_group(
                &state.group_id,
                &UpdateGroupRequest {
                    // An empty comment clears it
                    comment: Some(planned.comment.clone().unwrap_or_default()),
                },
            )
            .await?;

        state.comment = planned.comment.clone();
        changes.mark_applied("comment");
        Ok(())
    }

    async fn delete(&self, record: &GroupRecord) -> Result<()> {
        info!(group_id = %record.group_id, "Deleting group");
        self.api.delete_group(&record.group_id).await?;
        Ok(())
    }
}
