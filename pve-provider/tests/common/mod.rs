//! Recording in-memory `ProxmoxApi` for reconciler tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pve_client::{
    ApiError, ContainerConfig, ContainerRef, ContainerStatus, GroupConfig, NewBackupRequest,
    NewContainerRequest, NewGroupRequest, NewUserRequest, ProxmoxApi, Result, TaskState,
    TaskStatus, UpdateContainerRequest, UpdateGroupRequest, UpdateUserRequest, Upid, UserConfig,
};
use pve_provider::{PollSettings, Provider};

/// One API call as seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateContainer(NewContainerRequest),
    StartContainer(ContainerRef),
    ShutdownContainer(ContainerRef),
    UpdateContainer(ContainerRef, UpdateContainerRequest),
    DeleteContainer(ContainerRef),
    ContainerConfig(ContainerRef),
    ContainerStatus(ContainerRef),
    TaskStatus { node: String, upid: Upid },
    CreateUser(NewUserRequest),
    UserConfig(String),
    UpdateUser(String, UpdateUserRequest),
    ChangePassword(String, String),
    DeleteUser(String),
    CreateGroup(NewGroupRequest),
    GroupConfig(String),
    UpdateGroup(String, UpdateGroupRequest),
    DeleteGroup(String),
    CreateBackup(NewBackupRequest),
}

impl Call {
    /// Short name used in call-sequence assertions.
    pub fn name(&self) -> &'static str {
        match self {
            Call::CreateContainer(_) => "create_container",
            Call::StartContainer(_) => "start_container",
            Call::ShutdownContainer(_) => "shutdown_container",
            Call::UpdateContainer(..) => "update_container",
            Call::DeleteContainer(_) => "delete_container",
            Call::ContainerConfig(_) => "container_config",
            Call::ContainerStatus(_) => "container_status",
            Call::TaskStatus { .. } => "task_status",
            Call::CreateUser(_) => "create_user",
            Call::UserConfig(_) => "user_config",
            Call::UpdateUser(..) => "update_user",
            Call::ChangePassword(..) => "change_password",
            Call::DeleteUser(_) => "delete_user",
            Call::CreateGroup(_) => "create_group",
            Call::GroupConfig(_) => "group_config",
            Call::UpdateGroup(..) => "update_group",
            Call::DeleteGroup(_) => "delete_group",
            Call::CreateBackup(_) => "create_backup",
        }
    }
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    /// Exit status per task type (`vzcreate`, `vzstart`, ...). Default `OK`.
    exit_status: HashMap<String, Option<String>>,
    /// Number of `running` answers before a task reports `stopped`.
    running_polls: u32,
    /// Tasks that never finish.
    stuck: bool,
    polls_seen: HashMap<Upid, u32>,
    container_status: String,
    container_config: ContainerConfig,
    update_returns_task: bool,
    user_config: UserConfig,
    group_config: GroupConfig,
    /// Calls (by name) that fail with an API error.
    failing: Vec<&'static str>,
}

/// Scriptable in-memory cluster.
#[derive(Clone)]
pub struct MockApi {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    pub fn new() -> Self {
        let inner = Inner {
            container_status: "stopped".to_string(),
            ..Default::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(Call::name).collect()
    }

    /// Exit status reported for tasks of the given type (e.g. `vzstart`).
    pub fn set_exit_status(&self, task_type: &str, status: Option<&str>) {
        self.inner
            .lock()
            .unwrap()
            .exit_status
            .insert(task_type.to_string(), status.map(str::to_string));
    }

    pub fn set_running_polls(&self, polls: u32) {
        self.inner.lock().unwrap().running_polls = polls;
    }

    pub fn set_stuck(&self) {
        self.inner.lock().unwrap().stuck = true;
    }

    pub fn set_container_status(&self, status: &str) {
        self.inner.lock().unwrap().container_status = status.to_string();
    }

    pub fn set_container_config(&self, config: ContainerConfig) {
        self.inner.lock().unwrap().container_config = config;
    }

    pub fn set_update_returns_task(&self) {
        self.inner.lock().unwrap().update_returns_task = true;
    }

    pub fn set_user_config(&self, config: UserConfig) {
        self.inner.lock().unwrap().user_config = config;
    }

    pub fn set_group_config(&self, config: GroupConfig) {
        self.inner.lock().unwrap().group_config = config;
    }

    pub fn fail(&self, call: &'static str) {
        self.inner.lock().unwrap().failing.push(call);
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let name = call.name();
        inner.calls.push(call);
        if inner.failing.contains(&name) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("{} failed", name),
            });
        }
        Ok(())
    }
}

fn task(node: &str, task_type: &str, vmid: &str) -> Upid {
    Upid::new(format!(
        "UPID:{}:00001000:00002000:5F000000:{}:{}:root@pam:",
        node, task_type, vmid
    ))
}

fn task_type(upid: &Upid) -> String {
    upid.as_str().split(':').nth(5).unwrap_or_default().to_string()
}

#[async_trait]
impl ProxmoxApi for MockApi {
    async fn create_container(&self, req: &NewContainerRequest) -> Result<Upid> {
        self.record(Call::CreateContainer(req.clone()))?;
        Ok(task(&req.node, "vzcreate", &req.vmid))
    }

    async fn start_container(&self, ct: &ContainerRef) -> Result<Upid> {
        self.record(Call::StartContainer(ct.clone()))?;
        Ok(task(&ct.node, "vzstart", &ct.vmid))
    }

    async fn shutdown_container(&self, ct: &ContainerRef) -> Result<Upid> {
        self.record(Call::ShutdownContainer(ct.clone()))?;
        Ok(task(&ct.node, "vzshutdown", &ct.vmid))
    }

    async fn update_container(
        &self,
        ct: &ContainerRef,
        req: &UpdateContainerRequest,
    ) -> Result<Option<Upid>> {
        self.record(Call::UpdateContainer(ct.clone(), req.clone()))?;
        let with_task = self.inner.lock().unwrap().update_returns_task;
        Ok(with_task.then(|| task(&ct.node, "vzupdate", &ct.vmid)))
    }

    async fn delete_container(&self, ct: &ContainerRef) -> Result<Upid> {
        self.record(Call::DeleteContainer(ct.clone()))?;
        Ok(task(&ct.node, "vzdestroy", &ct.vmid))
    }

    async fn container_config(&self, ct: &ContainerRef) -> Result<ContainerConfig> {
        self.record(Call::ContainerConfig(ct.clone()))?;
        Ok(self.inner.lock().unwrap().container_config.clone())
    }

    async fn container_status(&self, ct: &ContainerRef) -> Result<ContainerStatus> {
        self.record(Call::ContainerStatus(ct.clone()))?;
        Ok(ContainerStatus {
            status: self.inner.lock().unwrap().container_status.clone(),
        })
    }

    async fn task_status(&self, node: &str, upid: &Upid) -> Result<TaskStatus> {
        self.record(Call::TaskStatus {
            node: node.to_string(),
            upid: upid.clone(),
        })?;

        let mut inner = self.inner.lock().unwrap();
        let running_polls = inner.running_polls;
        let stuck = inner.stuck;
        let seen = inner.polls_seen.entry(upid.clone()).or_insert(0);
        *seen += 1;
        if stuck || *seen <= running_polls {
            return Ok(TaskStatus {
                status: TaskState::Running,
                exitstatus: None,
            });
        }

        let exitstatus = inner
            .exit_status
            .get(&task_type(upid))
            .cloned()
            .unwrap_or_else(|| Some("OK".to_string()));
        Ok(TaskStatus {
            status: TaskState::Stopped,
            exitstatus,
        })
    }

    async fn create_user(&self, req: &NewUserRequest) -> Result<()> {
        self.record(Call::CreateUser(req.clone()))
    }

    async fn user_config(&self, userid: &str) -> Result<UserConfig> {
        self.record(Call::UserConfig(userid.to_string()))?;
        Ok(self.inner.lock().unwrap().user_config.clone())
    }

    async fn update_user(&self, userid: &str, req: &UpdateUserRequest) -> Result<()> {
        self.record(Call::UpdateUser(userid.to_string(), req.clone()))
    }

    async fn change_password(&self, userid: &str, password: &str) -> Result<()> {
        self.record(Call::ChangePassword(
            userid.to_string(),
            password.to_string(),
        ))
    }

    async fn delete_user(&self, userid: &str) -> Result<()> {
        self.record(Call::DeleteUser(userid.to_string()))
    }

    async fn create_group(&self, req: &NewGroupRequest) -> Result<()> {
        self.record(Call::CreateGroup(req.clone()))
    }

    async fn group_config(&self, groupid: &str) -> Result<GroupConfig> {
        self.record(Call::GroupConfig(groupid.to_string()))?;
        Ok(self.inner.lock().unwrap().group_config.clone())
    }

    async fn update_group(&self, groupid: &str, req: &UpdateGroupRequest) -> Result<()> {
        self.record(Call::UpdateGroup(groupid.to_string(), req.clone()))
    }

    async fn delete_group(&self, groupid: &str) -> Result<()> {
        self.record(Call::DeleteGroup(groupid.to_string()))
    }

    async fn create_backup(&self, req: &NewBackupRequest) -> Result<()> {
        self.record(Call::CreateBackup(req.clone()))
    }
}

/// Poll settings fast enough for tests.
pub fn fast_poll() -> PollSettings {
    PollSettings {
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(4),
        multiplier: 2,
        timeout: Duration::from_secs(5),
    }
}

/// Provider wired to a fresh mock.
pub fn provider() -> (Provider, MockApi) {
    let api = MockApi::new();
    let provider = Provider::new(Arc::new(api.clone()), fast_poll());
    (provider, api)
}
