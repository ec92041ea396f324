//! Reconcilers for the resource kinds served by the provider.
//!
//! Each reconciler maps a typed desired-state record onto API calls, waits
//! for any asynchronous task it started, and writes observed remote state
//! back into the record.

pub mod backup;
pub mod container;
pub mod group;
pub mod user;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::changeset::Changeset;
use crate::error::{ProviderError, Result};

pub use backup::{BackupReconciler, BackupRecord};
pub use container::{ContainerReconciler, ContainerRecord};
pub use group::{GroupReconciler, GroupRecord};
pub use user::{UserReconciler, UserRecord};

/// Trait for resource reconcilers.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Declared state of one resource.
    type Record: Serialize + DeserializeOwned + Send + Sync;

    /// Create the resource. The record's `id` is set only on full success.
    async fn create(&self, record: &mut Self::Record) -> Result<()>;

    /// Refresh the record from the cluster.
    async fn read(&self, record: &mut Self::Record) -> Result<()>;

    /// Apply the difference between `state` and `planned`, recording each
    /// changed field in `changes`.
    ///
    /// Fields are copied into `state` and marked applied as the cluster
    /// accepts them, so on error `state` and `changes` reflect exactly what
    /// was applied.
    async fn apply(
        &self,
        state: &mut Self::Record,
        planned: &Self::Record,
        changes: &mut Changeset,
    ) -> Result<()>;

    /// Apply the difference between `state` and `planned` and return the
    /// changeset.
    async fn update(&self, state: &mut Self::Record, planned: &Self::Record) -> Result<Changeset> {
        let mut changes = Changeset::new();
        self.apply(state, planned, &mut changes).await?;
        Ok(changes)
    }

    /// Remove the resource from the cluster.
    async fn delete(&self, record: &Self::Record) -> Result<()>;
}

/// Reject an update that touches a field fixed at creation time.
pub(crate) fn ensure_unchanged<T: PartialEq + ?Sized>(
    resource: &'static str,
    field: &'static str,
    current: &T,
    planned: &T,
) -> Result<()> {
    if current == planned {
        Ok(())
    } else {
        Err(ProviderError::ImmutableField { resource, field })
    }
}
