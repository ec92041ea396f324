//! pve-provider: declarative resource provider for Proxmox VE.
//!
//! Translates declared containers, users, groups and backups into Proxmox
//! API calls, waits for the cluster tasks those calls start, and reflects
//! remote state back into the declared records.

pub mod changeset;
pub mod config;
pub mod error;
pub mod provider;
pub mod reconciler;
pub mod task;

pub use changeset::{Changeset, FieldChange};
pub use config::{PollSettings, ProviderArgs, ProviderConfig};
pub use error::{ProviderError, Result};
pub use provider::{Provider, ResourceKind, UpdateOutcome};
pub use reconciler::Reconciler;
pub use task::{TaskOutcome, TaskPoller};
