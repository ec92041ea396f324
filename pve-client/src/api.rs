//! The API surface consumed by the provider.
//!
//! Reconcilers only talk to the cluster through this trait, so tests can swap
//! in an in-memory implementation.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ContainerConfig, ContainerRef, ContainerStatus, GroupConfig, NewBackupRequest,
    NewContainerRequest, NewGroupRequest, NewUserRequest, TaskStatus, UpdateContainerRequest,
    UpdateGroupRequest, UpdateUserRequest, Upid, UserConfig,
};

/// Operations against a Proxmox VE cluster.
#[async_trait]
pub trait ProxmoxApi: Send + Sync {
    // Containers
    async fn create_container(&self, req: &NewContainerRequest) -> Result<Upid>;
    async fn start_container(&self, ct: &ContainerRef) -> Result<Upid>;
    async fn shutdown_container(&self, ct: &ContainerRef) -> Result<Upid>;
    /// Returns a task handle only when the cluster ran the update asynchronously.
    async fn update_container(
        &self,
        ct: &ContainerRef,
        req: &UpdateContainerRequest,
    ) -> Result<Option<Upid>>;
    async fn delete_container(&self, ct: &ContainerRef) -> Result<Upid>;
    async fn container_config(&self, ct: &ContainerRef) -> Result<ContainerConfig>;
    async fn container_status(&self, ct: &ContainerRef) -> Result<ContainerStatus>;

    // Tasks
    /// Single status query. Waiting is the caller's business.
    async fn task_status(&self, node: &str, upid: &Upid) -> Result<TaskStatus>;

    // Users
    async fn create_user(&self, req: &NewUserRequest) -> Result<()>;
    async fn user_config(&self, userid: &str) -> Result<UserConfig>;
    async fn update_user(&self, userid: &str, req: &UpdateUserRequest) -> Result<()>;
    async fn change_password(&self, userid: &str, password: &str) -> Result<()>;
    async fn delete_user(&self, userid: &str) -> Result<()>;

    // Groups
    async fn create_group(&self, req: &NewGroupRequest) -> Result<()>;
    async fn group_config(&self, groupid: &str) -> Result<GroupConfig>;
    async fn update_group(&self, groupid: &str, req: &UpdateGroupRequest) -> Result<()>;
    async fn delete_group(&self, groupid: &str) -> Result<()>;

    // Backups
    async fn create_backup(&self, req: &NewBackupRequest) -> Result<()>;
}
