//! Provider error types.

use std::time::Duration;

use pve_client::{ApiError, Upid};
use serde_json::Value;
use thiserror::Error;

use crate::changeset::Changeset;

/// Errors surfaced by provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport or API failure, passed through unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A task finished with an exit status other than `OK`.
    #[error("task {upid} on node {node} failed: exit status {exit_status}")]
    TaskFailed {
        node: String,
        upid: Upid,
        exit_status: String,
    },

    /// A task did not reach a terminal state in time.
    #[error("task {upid} on node {node} did not finish within {timeout:?}")]
    TaskTimeout {
        node: String,
        upid: Upid,
        timeout: Duration,
    },

    /// An update tried to change a field that is fixed after creation.
    #[error("cannot change {field} of an existing {resource}")]
    ImmutableField {
        resource: &'static str,
        field: &'static str,
    },

    /// An update failed after some fields were already applied. `state`
    /// holds the record as the cluster now has it.
    #[error("update failed after applying {:?}: {source}", .changes.applied_fields())]
    PartialUpdate {
        state: Value,
        changes: Changeset,
        source: Box<ProviderError>,
    },

    /// Provider configuration is incomplete or invalid.
    #[error("config: {0}")]
    Config(String),

    /// Resource type name not served by this provider.
    #[error("unknown resource type: {0}")]
    UnknownResource(String),

    /// State document does not match the resource schema.
    #[error("invalid state: {0}")]
    InvalidState(#[from] serde_json::Error),
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
