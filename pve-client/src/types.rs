//! Request and response types for the Proxmox VE API.
//!
//! Field names follow the wire names of the API so that the structs can be
//! form-encoded and JSON-decoded directly. Path parameters (node, vmid,
//! userid, groupid) are skipped during encoding and placed in the URL instead.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Boolean fields travel as `0`/`1` on the wire.
pub(crate) mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<bool>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_u8(u8::from(*v)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Int(i64),
            Str(String),
        }

        Ok(match Option::<Raw>::deserialize(d)? {
            None => None,
            Some(Raw::Bool(b)) => Some(b),
            Some(Raw::Int(i)) => Some(i != 0),
            Some(Raw::Str(s)) => Some(s == "1" || s.eq_ignore_ascii_case("true")),
        })
    }
}

// =============================================================================
// Tasks
// =============================================================================

/// Identifier of an asynchronous cluster task (UPID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Upid(String);

impl Upid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Node the task runs on, when the UPID is in `UPID:<node>:...` form.
    pub fn node(&self) -> Option<&str> {
        let mut parts = self.0.split(':');
        match (parts.next(), parts.next()) {
            (Some("UPID"), Some(node)) if !node.is_empty() => Some(node),
            _ => None,
        }
    }
}

impl fmt::Display for Upid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task lifecycle state as reported by `/nodes/{node}/tasks/{upid}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Running,
    Stopped,
    #[serde(other)]
    Unknown,
}

/// Snapshot of a task's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: TaskState,
    #[serde(default)]
    pub exitstatus: Option<String>,
}

impl TaskStatus {
    /// Only `stopped` is terminal; unknown states are polled again.
    pub fn is_terminal(&self) -> bool {
        self.status == TaskState::Stopped
    }
}

// =============================================================================
// Authentication
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TicketRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Authentication ticket returned by `/access/ticket`.
#[derive(Debug, Clone, Deserialize)]
pub struct Ticket {
    pub ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    pub csrf_token: String,
    pub username: String,
}

// =============================================================================
// Containers
// =============================================================================

/// Addresses an existing container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    pub node: String,
    pub vmid: String,
}

impl ContainerRef {
    pub fn new(node: impl Into<String>, vmid: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            vmid: vmid.into(),
        }
    }
}

/// Request to create a new LXC container.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewContainerRequest {
    #[serde(skip)]
    pub node: String,
    pub vmid: String,
    pub ostemplate: String,
    pub rootfs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net0: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(with = "flag", skip_serializing_if = "Option::is_none")]
    pub onboot: Option<bool>,
    #[serde(with = "flag", skip_serializing_if = "Option::is_none")]
    pub unprivileged: Option<bool>,
    #[serde(rename = "ssh-public-keys", skip_serializing_if = "Option::is_none")]
    pub ssh_public_keys: Option<String>,
}

/// Partial container config update. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateContainerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ostemplate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net0: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(with = "flag", skip_serializing_if = "Option::is_none")]
    pub onboot: Option<bool>,
    #[serde(with = "flag", skip_serializing_if = "Option::is_none")]
    pub unprivileged: Option<bool>,
    /// Comma-separated config keys to remove.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
}

/// Subset of `/nodes/{node}/lxc/{vmid}/config` the provider reads back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub cores: Option<u32>,
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub swap: Option<u64>,
    #[serde(default)]
    pub net0: Option<String>,
}

/// Current runtime status of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub status: String,
}

impl ContainerStatus {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

// =============================================================================
// Users
// =============================================================================

/// Request to create a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewUserRequest {
    pub userid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(with = "flag", skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Partial user update. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(with = "flag", skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// User configuration as returned by `/access/users/{userid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, with = "flag")]
    pub enable: Option<bool>,
    #[serde(default)]
    pub expire: Option<i64>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub keys: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PasswordChangeRequest<'a> {
    pub userid: &'a str,
    pub password: &'a str,
}

// =============================================================================
// Groups
// =============================================================================

/// Request to create a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewGroupRequest {
    pub groupid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Partial group update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateGroupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Group configuration as returned by `/access/groups/{groupid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

// =============================================================================
// Backups
// =============================================================================

/// Request to schedule a vzdump backup job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewBackupRequest {
    pub starttime: String,
    #[serde(with = "flag", skip_serializing_if = "Option::is_none")]
    pub all: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailnotification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}
