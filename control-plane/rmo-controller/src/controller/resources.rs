//! Create-if-absent and delete-if-present primitives shared by every
//! dependent kind. Existing objects are never updated: drift is not corrected.

use tracing::debug;

use crate::store::{ObjectKey, ObjectStore, StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    Existing,
    Created,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retracted {
    Deleted,
    Absent,
}

/// Create `key` from `desired()` unless it already exists.
///
/// Only a `NotFound` lookup leads to creation. An `AlreadyExists` answer from
/// a create that raced another writer counts as success.
pub async fn ensure<K, F>(
    store: &dyn ObjectStore<K>,
    key: &ObjectKey,
    desired: F,
) -> StoreResult<Ensured>
where
    K: Clone + Send + Sync + 'static,
    F: FnOnce() -> K + Send,
{
    match store.get(key).await {
        Ok(_) => {
            debug!(%key, "ensure: already present");
            Ok(Ensured::Existing)
        }
        Err(e) if e.is_not_found() => match store.create(&desired()).await {
            Ok(_) => {
                debug!(%key, "ensure: created");
                Ok(Ensured::Created)
            }
            Err(StoreError::AlreadyExists(_)) => {
                debug!(%key, "ensure: lost create race; treating as present");
                Ok(Ensured::Existing)
            }
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    }
}

/// Delete `key`; an already missing object is success.
pub async fn retract<K>(
    store: &dyn ObjectStore<K>,
    key: &ObjectKey,
) -> StoreResult<Retracted>
where
    K: Clone + Send + Sync + 'static,
{
    match store.delete(key).await {
        Ok(()) => {
            debug!(%key, "retract: deleted");
            Ok(Retracted::Deleted)
        }
        Err(e) if e.is_not_found() => {
            debug!(%key, "retract: already absent");
            Ok(Retracted::Absent)
        }
        Err(e) => Err(e),
    }
}
