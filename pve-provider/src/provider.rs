//! Provider dispatcher.
//!
//! Addresses resources by their Terraform type name and moves state in and
//! out of the typed records as JSON documents.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use pve_client::{ProxmoxApi, ProxmoxClient};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::changeset::Changeset;
use crate::config::{PollSettings, ProviderConfig};
use crate::error::{ProviderError, Result};
use crate::reconciler::{
    BackupReconciler, ContainerReconciler, GroupReconciler, Reconciler, UserReconciler,
};
use crate::task::TaskPoller;

/// Resource kinds served by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Container,
    Group,
    User,
    Backup,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Container,
        ResourceKind::Group,
        ResourceKind::User,
        ResourceKind::Backup,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            ResourceKind::Container => "proxmox_container",
            ResourceKind::Group => "proxmox_group",
            ResourceKind::User => "proxmox_user",
            ResourceKind::Backup => "proxmox_backup",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ResourceKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.type_name() == s)
            .ok_or_else(|| ProviderError::UnknownResource(s.to_string()))
    }
}

/// Result of a successful update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub state: Value,
    pub changes: Changeset,
}

/// Entry point for CRUD operations on any resource kind.
pub struct Provider {
    containers: ContainerReconciler,
    groups: GroupReconciler,
    users: UserReconciler,
    backups: BackupReconciler,
}

impl Provider {
    pub fn new(api: Arc<dyn ProxmoxApi>, poll: PollSettings) -> Self {
        let poller = TaskPoller::new(Arc::clone(&api), poll);
        Self {
            containers: ContainerReconciler::new(Arc::clone(&api), poller),
            groups: GroupReconciler::new(Arc::clone(&api)),
            users: UserReconciler::new(Arc::clone(&api)),
            backups: BackupReconciler::new(api),
        }
    }

    /// Validate the configuration and log in to the cluster.
    pub async fn configure(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let client =
            ProxmoxClient::login(&config.host, &config.user, &config.password, config.insecure)
                .await?;
        info!(host = %config.host, user = %client.username(), "Provider configured");
        Ok(Self::new(Arc::new(client), config.poll.clone()))
    }

    pub async fn create(&self, kind: ResourceKind, planned: Value) -> Result<Value> {
        match kind {
            ResourceKind::Container => create_with(&self.containers, planned).await,
            ResourceKind::Group => create_with(&self.groups, planned).await,
            ResourceKind::User => create_with(&self.users, planned).await,
            ResourceKind::Backup => create_with(&self.backups, planned).await,
        }
    }

    pub async fn read(&self, kind: ResourceKind, state: Value) -> Result<Value> {
        match kind {
            ResourceKind::Container => read_with(&self.containers, state).await,
            ResourceKind::Group => read_with(&self.groups, state).await,
            ResourceKind::User => read_with(&self.users, state).await,
            ResourceKind::Backup => read_with(&self.backups, state).await,
        }
    }

    pub async fn update(
        &self,
        kind: ResourceKind,
        prior: Value,
        planned: Value,
    ) -> Result<UpdateOutcome> {
        match kind {
            ResourceKind::Container => update_with(&self.containers, prior, planned).await,
            ResourceKind::Group => update_with(&self.groups, prior, planned).await,
            ResourceKind::User => update_with(&self.users, prior, planned).await,
            ResourceKind::Backup => update_with(&self.backups, prior, planned).await,
        }
    }

    pub async fn delete(&self, kind: ResourceKind, state: Value) -> Result<()> {
        match kind {
            ResourceKind::Container => delete_with(&self.containers, state).await,
            ResourceKind::Group => delete_with(&self.groups, state).await,
            ResourceKind::User => delete_with(&self.users, state).await,
            ResourceKind::Backup => delete_with(&self.backups, state).await,
        }
    }
}

async fn create_with<R: Reconciler>(reconciler: &R, planned: Value) -> Result<Value> {
    let mut record: R::Record = serde_json::from_value(planned)?;
    reconciler.create(&mut record).await?;
    Ok(serde_json::to_value(&record)?)
}

async fn read_with<R: Reconciler>(reconciler: &R, state: Value) -> Result<Value> {
    let mut record: R::Record = serde_json::from_value(state)?;
    reconciler.read(&mut record).await?;
    Ok(serde_json::to_value(&record)?)
}

async fn update_with<R: Reconciler>(
    reconciler: &R,
    prior: Value,
    planned: Value,
) -> Result<UpdateOutcome> {
    let mut state: R::Record = serde_json::from_value(prior)?;
    let planned: R::Record = serde_json::from_value(planned)?;
    let mut changes = Changeset::new();

    match reconciler.apply(&mut state, &planned, &mut changes).await {
        Ok(()) => Ok(UpdateOutcome {
            state: serde_json::to_value(&state)?,
            changes,
        }),
        Err(source) if changes.applied_fields().is_empty() => Err(source),
        Err(source) => Err(ProviderError::PartialUpdate {
            state: serde_json::to_value(&state)?,
            changes,
            source: Box::new(source),
        }),
    }
}

async fn delete_with<R: Reconciler>(reconciler: &R, state: Value) -> Result<()> {
    let record: R::Record = serde_json::from_value(state)?;
    reconciler.delete(&record).await
}
