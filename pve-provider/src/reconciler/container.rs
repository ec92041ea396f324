//! Container reconciler - manages LXC containers on a node.

use std::sync::Arc;

use async_trait::async_trait;
use pve_client::{ContainerRef, NewContainerRequest, ProxmoxApi, UpdateContainerRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{ensure_unchanged, Reconciler};
use crate::changeset::Changeset;
use crate::error::Result;
use crate::task::TaskPoller;

const KIND: &str = "container";

/// Declared state of a `proxmox_container`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Established identity (the VM ID) once the container exists and runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub node: String,
    pub vmid: String,
    pub os_template: String,
    pub root_fs: String,
    #[serde(default)]
    pub net0: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub cores: Option<u32>,
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub swap: Option<u64>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub root_password: Option<String>,
    #[serde(default)]
    pub on_boot: Option<bool>,
    #[serde(default)]
    pub unprivileged: Option<bool>,
    #[serde(default)]
    pub ssh_keys: Vec<String>,
}

impl ContainerRecord {
    fn container_ref(&self) -> ContainerRef {
        ContainerRef::new(&self.node, &self.vmid)
    }

    fn create_request(&self) -> NewContainerRequest {
        NewContainerRequest {
            node: self.node.clone(),
            vmid: self.vmid.clone(),
            ostemplate: self.os_template.clone(),
            rootfs: self.root_fs.clone(),
            net0: self.net0.clone(),
            storage: self.storage.clone(),
            cores: self.cores,
            memory: self.memory,
            swap: self.swap,
            hostname: self.hostname.clone(),
            password: self.root_password.clone(),
            onboot: self.on_boot,
            unprivileged: self.unprivileged,
            ssh_public_keys: (!self.ssh_keys.is_empty()).then(|| self.ssh_keys.join("\n")),
        }
    }
}

/// Set an optional config key, or schedule it for removal when cleared.
fn set_or_delete<T: Clone>(
    target: &mut Option<T>,
    deletes: &mut Vec<&'static str>,
    key: &'static str,
    planned: &Option<T>,
) {
    match planned {
        Some(value) => *target = Some(value.clone()),
        None => deletes.push(key),
    }
}

/// Container reconciler that drives the LXC endpoints of a node.
pub struct ContainerReconciler {
    api: Arc<dyn ProxmoxApi>,
    poller: TaskPoller,
}

impl ContainerReconciler {
    pub fn new(api: Arc<dyn ProxmoxApi>, poller: TaskPoller) -> Self {
        Self { api, poller }
    }
}

#[async_trait]
impl Reconciler for ContainerReconciler {
    type Record = ContainerRecord;

    async fn create(&self, record: &mut ContainerRecord) -> Result<()> {
        record.id = None;
        info!(vmid = %record.vmid, node = %record.node, "Creating container");

        let upid = self.api.create_container(&record.create_request()).await?;
        if let Err(e) = self.poller.run(&record.node, &upid).await {
            error!(vmid = %record.vmid, error = %e, "Container creation failed");
            return Err(e);
        }

        // Auto-start after creation
        let ct = record.container_ref();
        let upid = self.api.start_container(&ct).await?;
        if let Err(e) = self.poller.run(&record.node, &upid).await {
            error!(vmid = %record.vmid, error = %e, "Failed to start container");
            return Err(e);
        }

        info!(vmid = %record.vmid, node = %record.node, "Container created and started");
        record.id = Some(record.vmid.clone());
        Ok(())
    }

    async fn read(&self, record: &mut ContainerRecord) -> Result<()> {
        debug!(vmid = %record.vmid, node = %record.node, "Reading container config");
        let config = self.api.container_config(&record.container_ref()).await?;

        // Keys absent from the remote config keep their local value
        if config.hostname.is_some() {
            record.hostname = config.hostname;
        }
        if config.cores.is_some() {
            record.cores = config.cores;
        }
        if config.memory.is_some() {
            record.memory = config.memory;
        }
        if config.swap.is_some() {
            record.swap = config.swap;
        }
        if config.net0.is_some() {
            record.net0 = config.net0;
        }
        Ok(())
    }

    async fn apply(
        &self,
        state: &mut ContainerRecord,
        planned: &ContainerRecord,
        changes: &mut Changeset,
    ) -> Result<()> {
        ensure_unchanged(KIND, "vmid", &state.vmid, &planned.vmid)?;
        ensure_unchanged(KIND, "node", &state.node, &planned.node)?;
        // TODO: resize the root volume through the separate resize endpoint instead of rejecting
        ensure_unchanged(KIND, "root_fs", &state.root_fs, &planned.root_fs)?;
        ensure_unchanged(KIND, "ssh_keys", &state.ssh_keys, &planned.ssh_keys)?;

        let mut req = UpdateContainerRequest::default();
        let mut deletes = Vec::new();

        if changes.track("os_template", &state.os_template, &planned.os_template) {
            req.ostemplate = Some(planned.os_template.clone());
        }
        if changes.track("net0", &state.net0, &planned.net0) {
            set_or_delete(&mut req.net0, &mut deletes, "net0", &planned.net0);
        }
        if changes.track("storage", &state.storage, &planned.storage) {
            set_or_delete(&mut req.storage, &mut deletes, "storage", &planned.storage);
        }
        if changes.track("cores", &state.cores, &planned.cores) {
            set_or_delete(&mut req.cores, &mut deletes, "cores", &planned.cores);
        }
        if changes.track("memory", &state.memory, &planned.memory) {
            set_or_delete(&mut req.memory, &mut deletes, "memory", &planned.memory);
        }
        if changes.track("swap", &state.swap, &planned.swap) {
            set_or_delete(&mut req.swap, &mut deletes, "swap", &planned.swap);
        }
        if changes.track("hostname", &state.hostname, &planned.hostname) {
            set_or_delete(&mut req.hostname, &mut deletes, "hostname", &planned.hostname);
        }
        // A cleared root password cannot be unset on the cluster, it is only forgotten locally
        if changes.track_sensitive("root_password", &state.root_password, &planned.root_password)
        {
            req.password = planned.root_password.clone();
        }
        if changes.track("on_boot", &state.on_boot, &planned.on_boot) {
            set_or_delete(&mut req.onboot, &mut deletes, "onboot", &planned.on_boot);
        }
        if changes.track("unprivileged", &state.unprivileged, &planned.unprivileged) {
            set_or_delete(
                &mut req.unprivileged,
                &mut deletes,
                "unprivileged",
                &planned.unprivileged,
            );
        }

        if changes.is_empty() {
            debug!(vmid = %state.vmid, "Container config unchanged");
            return Ok(());
        }
        if !deletes.is_empty() {
            req.delete = Some(deletes.join(","));
        }

        if req == UpdateContainerRequest::default() {
            debug!(vmid = %state.vmid, "No container config to send");
        } else {
            info!(
                vmid = %state.vmid,
                node = %state.node,
                fields = ?changes.pending_fields(),
                "Updating container"
            );
            if let Some(upid) = self
                .api
                .update_container(&state.container_ref(), &req)
                .await?
            {
                self.poller.run(&state.node, &upid).await?;
            }
        }

        state.os_template = planned.os_template.clone();
        state.net0 = planned.net0.clone();
        state.storage = planned.storage.clone();
        state.cores = planned.cores;
        state.memory = planned.memory;
        state.swap = planned.swap;
        state.hostname = planned.hostname.clone();
        state.root_password = planned.root_password.clone();
        state.on_boot = planned.on_boot;
        state.unprivileged = planned.unprivileged;
        changes.mark_all_applied();

        Ok(())
    }

    async fn delete(&self, record: &ContainerRecord) -> Result<()> {
        info!(vmid = %record.vmid, node = %record.node, "Deleting container");
        let ct = record.container_ref();

        // Running containers must be shut down before they can be destroyed
        let status = self.api.container_status(&ct).await?;
        if status.is_running() {
            info!(vmid = %record.vmid, "Shutting down running container");
            let upid = self.api.shutdown_container(&ct).await?;
            self.poller.run(&record.node, &upid).await?;
        }

        let upid = self.api.delete_container(&ct).await?;
        self.poller.run(&record.node, &upid).await?;

        info!(vmid = %record.vmid, "Container deleted");
        Ok(())
    }
}
