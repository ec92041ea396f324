//! pve-client: Proxmox VE HTTP API client.
//!
//! Provides ticket authentication, typed request/response structs for the
//! container, user, group, backup and task endpoints, and the [`ProxmoxApi`]
//! trait that the provider's reconcilers are written against.

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use api::ProxmoxApi;
pub use client::ProxmoxClient;
pub use error::{ApiError, Result};
pub use types::*;
