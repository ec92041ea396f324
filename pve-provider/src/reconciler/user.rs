//! User reconciler.
//!
//! Group membership is declared on the record but not managed yet: the list
//! is kept in local state only and never sent to the cluster.

use std::sync::Arc;

use async_trait::async_trait;
use pve_client::{NewUserRequest, ProxmoxApi, UpdateUserRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ensure_unchanged, Reconciler};
use crate::changeset::Changeset;
use crate::error::Result;

const KIND: &str = "user";

/// Declared state of a `proxmox_user`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `name@realm`
    pub user_id: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub enable: Option<bool>,
    /// Account expiry as a unix timestamp, 0 for never.
    #[serde(default)]
    pub expire: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Two-factor key material.
    #[serde(default)]
    pub keys: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// User reconciler.
pub struct UserReconciler {
    api: Arc<dyn ProxmoxApi>,
}

impl UserReconciler {
    pub fn new(api: Arc<dyn ProxmoxApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Reconciler for UserReconciler {
    type Record = UserRecord;

    async fn create(&self, record: &mut UserRecord) -> Result<()> {
        record.id = None;
        info!(user_id = %record.user_id, "Creating user");
        if !record.groups.is_empty() {
            debug!(
                user_id = %record.user_id,
                groups = ?record.groups,
                "Group membership not managed, ignoring groups"
            );
        }

        self.api
            .create_user(&NewUserRequest {
                userid: record.user_id.clone(),
                comment: record.comment.clone(),
                email: record.email.clone(),
                enable: record.enable,
                expire: record.expire,
                firstname: record.first_name.clone(),
                lastname: record.last_name.clone(),
                keys: record.keys.clone(),
                password: record.password.clone(),
            })
            .await?;

        record.id = Some(record.user_id.clone());
        Ok(())
    }

    async fn read(&self, record: &mut UserRecord) -> Result<()> {
        debug!(user_id = %record.user_id, "Reading user");
        let config = self.api.user_config(&record.user_id).await?;

        record.comment = config.comment;
        record.email = config.email;
        record.enable = config.enable;
        record.expire = config.expire;
        record.first_name = config.firstname;
        record.last_name = config.lastname;
        record.keys = config.keys;
        Ok(())
    }

    async fn apply(
        &self,
        state: &mut UserRecord,
        planned: &UserRecord,
        changes: &mut Changeset,
    ) -> Result<()> {
        ensure_unchanged(KIND, "user_id", &state.user_id, &planned.user_id)?;

        let mut req = UpdateUserRequest::default();

        // Cleared strings are sent empty and a cleared expiry as 0 (never)
        if changes.track("comment", &state.comment, &planned.comment) {
            req.comment = Some(planned.comment.clone().unwrap_or_default());
        }
        if changes.track("email", &state.email, &planned.email) {
            req.email = Some(planned.email.clone().unwrap_or_default());
        }
        if changes.track("enable", &state.enable, &planned.enable) {
            req.enable = planned.enable;
        }
        if changes.track("expire", &state.expire, &planned.expire) {
            req.expire = Some(planned.expire.unwrap_or(0));
        }
        if changes.track("first_name", &state.first_name, &planned.first_name) {
            req.firstname = Some(planned.first_name.clone().unwrap_or_default());
        }
        if changes.track("last_name", &state.last_name, &planned.last_name) {
            req.lastname = Some(planned.last_name.clone().unwrap_or_default());
        }
        if changes.track("keys", &state.keys, &planned.keys) {
            req.keys = Some(planned.keys.clone().unwrap_or_default());
        }
        let password_changed =
            changes.track_sensitive("password", &state.password, &planned.password);

        // Local-only
        state.groups = planned.groups.clone();

        if !req.is_empty() {
            info!(user_id = %state.user_id, fields = ?changes.pending_fields(), "Updating user");
            self.api.update_user(&state.user_id, &req).await?;
        }

        state.comment = planned.comment.clone();
        state.email = planned.email.clone();
        state.enable = planned.enable;
        state.expire = planned.expire;
        state.first_name = planned.first_name.clone();
        state.last_name = planned.last_name.clone();
        state.keys = planned.keys.clone();
        for field in [
            "comment",
            "email",
            "enable",
            "expire",
            "first_name",
            "last_name",
            "keys",
        ] {
            changes.mark_applied(field);
        }

        if password_changed {
            match &planned.password {
                Some(password) => {
                    info!(user_id = %state.user_id, "Changing user password");
                    self.api.change_password(&state.user_id, password).await?;
                    changes.mark_applied("password");
                }
                // The cluster cannot unset a password, forget it locally
                None => changes.mark_applied("password"),
            }
            state.password = planned.password.clone();
        }

        Ok(())
    }

    async fn delete(&self, record: &UserRecord) -> Result<()> {
        info!(user_id = %record.user_id, "Deleting user");
        self.api.delete_user(&record.user_id).await?;
        Ok(())
    }
}
