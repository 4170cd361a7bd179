use std::sync::Arc;

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::info;

use super::ReconcileErr;
use super::flow::Flow;
use crate::crd::{FINALIZER_KEY, RouteMonitor};
use crate::store::{ObjectKey, ObjectStore};

/// What a [`FinalizerGuard`] call did to the stored RouteMonitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerUpdate {
    /// The token set was written back.
    Persisted,
    /// The token was already in the wanted state; nothing was written.
    Unchanged,
}

impl FinalizerUpdate {
    /// A persisted change ends the pass: the write itself produces the watch
    /// event that drives the next one.
    pub fn flow(self) -> Flow {
        match self {
            FinalizerUpdate::Persisted => Flow::Stop,
            FinalizerUpdate::Unchanged => Flow::Continue,
        }
    }
}

/// Owns the finalizer token on a RouteMonitor.
#[async_trait]
pub trait FinalizerGuard: Send + Sync {
    async fn ensure_present(
        &self,
        rm: &RouteMonitor,
    ) -> Result<FinalizerUpdate, ReconcileErr>;
    async fn ensure_absent(
        &self,
        rm: &RouteMonitor,
    ) -> Result<FinalizerUpdate, ReconcileErr>;
}

/// `rm` with our token appended, or `None` when it is already there.
pub fn with_finalizer(rm: &RouteMonitor) -> Option<RouteMonitor> {
    if rm.has_finalizer() {
        return None;
    }
    let mut updated = rm.clone();
    updated.finalizers_mut().push(FINALIZER_KEY.to_string());
    Some(updated)
}

/// `rm` without our token, or `None` when it is already gone. Tokens owned
/// by other controllers are kept in order.
pub fn without_finalizer(rm: &RouteMonitor) -> Option<RouteMonitor> {
    if !rm.has_finalizer() {
        return None;
    }
    let mut updated = rm.clone();
    updated.finalizers_mut().retain(|f| f != FINALIZER_KEY);
    Some(updated)
}

pub struct StoreFinalizerGuard {
    monitors: Arc<dyn ObjectStore<RouteMonitor>>,
}

impl StoreFinalizerGuard {
    pub fn new(monitors: Arc<dyn ObjectStore<RouteMonitor>>) -> Self {
        Self { monitors }
    }
}

#[async_trait]
impl FinalizerGuard for StoreFinalizerGuard {
    async fn ensure_present(
        &self,
        rm: &RouteMonitor,
    ) -> Result<FinalizerUpdate, ReconcileErr> {
        let Some(updated) = with_finalizer(rm) else {
            return Ok(FinalizerUpdate::Unchanged);
        };
        self.monitors.replace(&updated).await?;
        info!(route_monitor = %ObjectKey::of(rm), "finalizer added");
        Ok(FinalizerUpdate::Persisted)
    }

    async fn ensure_absent(
        &self,
        rm: &RouteMonitor,
    ) -> Result<FinalizerUpdate, ReconcileErr> {
        let Some(updated) = without_finalizer(rm) else {
            return Ok(FinalizerUpdate::Unchanged);
        };
        self.monitors.replace(&updated).await?;
        info!(route_monitor = %ObjectKey::of(rm), remaining = updated.finalizers().len(), "finalizer removed");
        Ok(FinalizerUpdate::Persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::route_monitor::fixtures::route_monitor;
    use crate::store::memory::MemoryObjectStore;
    use crate::store::{Op, StoreError};

    fn guard() -> (MemoryObjectStore<RouteMonitor>, StoreFinalizerGuard) {
        let store = MemoryObjectStore::<RouteMonitor>::new();
        let guard = StoreFinalizerGuard::new(Arc::new(store.clone()));
        (store, guard)
    }

    #[test]
    fn removal_keeps_foreign_tokens() {
        let mut rm = route_monitor("ns", "a", None, false, false);
        rm.finalizers_mut().extend([
            "other/first".to_string(),
            FINALIZER_KEY.to_string(),
            "other/second".to_string(),
        ]);

        let updated = without_finalizer(&rm).unwrap();

        assert_eq!(updated.finalizers(), ["other/first", "other/second"]);
        assert!(without_finalizer(&updated).is_none());
    }

    #[test]
    fn adding_is_idempotent() {
        let rm = route_monitor("ns", "a", None, false, false);
        let once = with_finalizer(&rm).unwrap();
        assert!(once.has_finalizer());
        assert!(with_finalizer(&once).is_none());
    }

    #[tokio::test]
    async fn ensure_present_persists_and_stops() {
        let (store, guard) = guard();
        store.seed(route_monitor("ns", "a", Some("http://x"), false, false)).await;
        let key = ObjectKey::new("ns", "a");
        let rm = store.peek(&key).await.unwrap();

        assert_eq!(guard.ensure_present(&rm).await, Ok(FinalizerUpdate::Persisted));

        let stored = store.peek(&key).await.unwrap();
        assert!(stored.has_finalizer());
        assert_eq!(
            guard.ensure_present(&stored).await,
            Ok(FinalizerUpdate::Unchanged)
        );
        assert_eq!(store.journal().count(Op::Replace, "RouteMonitor").await, 1);
    }

    #[tokio::test]
    async fn ensure_absent_on_deleting_object_releases_it() {
        let (store, guard) = guard();
        store.seed(route_monitor("ns", "a", Some("http://x"), true, true)).await;
        let key = ObjectKey::new("ns", "a");
        let rm = store.peek(&key).await.unwrap();

        assert_eq!(guard.ensure_absent(&rm).await, Ok(FinalizerUpdate::Persisted));
        assert!(!store.contains(&key).await);
    }

    #[tokio::test]
    async fn ensure_absent_without_token_writes_nothing() {
        let (store, guard) = guard();
        store.seed(route_monitor("ns", "a", Some("http://x"), false, true)).await;
        let rm = store.peek(&ObjectKey::new("ns", "a")).await.unwrap();

        assert_eq!(guard.ensure_absent(&rm).await, Ok(FinalizerUpdate::Unchanged));
        assert!(store.journal().writes().await.is_empty());
    }

    #[test]
    fn only_a_persisted_update_ends_the_pass() {
        assert_eq!(FinalizerUpdate::Persisted.flow(), Flow::Stop);
        assert_eq!(FinalizerUpdate::Unchanged.flow(), Flow::Continue);
    }

    #[tokio::test]
    async fn stale_copy_is_rejected() {
        let (store, guard) = guard();
        store.seed(route_monitor("ns", "a", Some("http://x"), false, false)).await;
        let key = ObjectKey::new("ns", "a");
        let mut stale = store.peek(&key).await.unwrap();
        stale.metadata.resource_version = Some("0".into());

        let res = guard.ensure_present(&stale).await;

        assert!(matches!(res, Err(ReconcileErr::Store(StoreError::Conflict(_)))));
        assert!(!store.peek(&key).await.unwrap().has_finalizer());
    }
}
