//! In-memory [`ObjectStore`] with API-server-like semantics.
//!
//! - `create` refuses duplicates, `get`/`delete` report missing objects as
//!   [`StoreError::NotFound`].
//! - `replace` enforces `resourceVersion` and answers stale writes with
//!   [`StoreError::Conflict`].
//! - `delete` of an object carrying finalizers only stamps a deletion
//!   timestamp; the object disappears once a `replace` clears its finalizers.
//!
//! Failures can be injected per operation, and every call is appended to a
//! [`Journal`] that may be shared between stores to observe cross-kind order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{Resource, ResourceExt};
use tokio::sync::RwLock;

use super::{ObjectKey, ObjectStore, Op, StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub op: Op,
    pub kind: String,
    pub key: Option<ObjectKey>,
}

#[derive(Clone, Default)]
pub struct Journal(Arc<RwLock<Vec<JournalEntry>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    async fn record(&self, op: Op, kind: &str, key: Option<&ObjectKey>) {
        self.0.write().await.push(JournalEntry {
            op,
            kind: kind.to_string(),
            key: key.cloned(),
        });
    }

    pub async fn entries(&self) -> Vec<JournalEntry> {
        self.0.read().await.clone()
    }

    /// Writes only, rendered as `"<op> <kind> <ns>/<name>"`.
    pub async fn writes(&self) -> Vec<String> {
        self.0
            .read()
            .await
            .iter()
            .filter(|e| e.op.is_write())
            .map(|e| match &e.key {
                Some(k) => format!("{:?} {} {}", e.op, e.kind, k),
                None => format!("{:?} {}", e.op, e.kind),
            })
            .collect()
    }

    pub async fn count(&self, op: Op, kind: &str) -> usize {
        self.0
            .read()
            .await
            .iter()
            .filter(|e| e.op == op && e.kind == kind)
            .count()
    }
}

#[derive(Clone)]
pub struct MemoryObjectStore<K> {
    objects: Arc<RwLock<BTreeMap<ObjectKey, K>>>,
    failures: Arc<RwLock<HashMap<Op, StoreError>>>,
    journal: Journal,
    version: Arc<RwLock<u64>>,
}

impl<K> MemoryObjectStore<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_journal(Journal::new())
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            journal,
            version: Arc::new(RwLock::new(0)),
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Put an object in place without journaling, as if it pre-existed.
    pub async fn seed(&self, mut obj: K) {
        if obj.resource_version().is_none() {
            obj.meta_mut().resource_version = Some(self.bump().await);
        }
        self.objects.write().await.insert(ObjectKey::of(&obj), obj);
    }

    /// Every later call of `op` fails with `err` until [`Self::clear_failures`].
    pub async fn fail_on(&self, op: Op, err: StoreError) {
        self.failures.write().await.insert(op, err);
    }

    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    pub async fn contains(&self, key: &ObjectKey) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn peek(&self, key: &ObjectKey) -> Option<K> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn bump(&self) -> String {
        let mut v = self.version.write().await;
        *v += 1;
        v.to_string()
    }

    async fn enter(&self, op: Op, key: Option<&ObjectKey>) -> StoreResult<()> {
        self.journal.record(op, &K::kind(&()), key).await;
        match self.failures.read().await.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn describe(key: &ObjectKey) -> String {
        format!("{} {}", K::kind(&()), key)
    }
}

impl<K> Default for MemoryObjectStore<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn deletion_time() -> Option<Time> {
    serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z")).ok()
}

#[async_trait]
impl<K> ObjectStore<K> for MemoryObjectStore<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &ObjectKey) -> StoreResult<K> {
        self.enter(Op::Get, Some(key)).await?;
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(Self::describe(key)))
    }

    async fn list(&self) -> StoreResult<Vec<K>> {
        self.enter(Op::List, None).await?;
        Ok(self.objects.read().await.values().cloned().collect())
    }

    async fn create(&self, obj: &K) -> StoreResult<K> {
        let key = ObjectKey::of(obj);
        self.enter(Op::Create, Some(&key)).await?;
        if self.objects.read().await.contains_key(&key) {
            return Err(StoreError::AlreadyExists(Self::describe(&key)));
        }
        let mut stored = obj.clone();
        stored.meta_mut().resource_version = Some(self.bump().await);
        self.objects.write().await.insert(key, stored.clone());
        Ok(stored)
    }

    async fn replace(&self, obj: &K) -> StoreResult<K> {
        let key = ObjectKey::of(obj);
        self.enter(Op::Replace, Some(&key)).await?;
        let current = self
            .objects
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(Self::describe(&key)))?;
        if let Some(rv) = obj.resource_version() {
            if current.resource_version().as_deref() != Some(rv.as_str()) {
                return Err(StoreError::Conflict(Self::describe(&key)));
            }
        }
        let mut stored = obj.clone();
        // deletionTimestamp is owned by the server and cannot be changed by clients
        stored.meta_mut().deletion_timestamp =
            current.meta().deletion_timestamp.clone();
        if stored.meta().deletion_timestamp.is_some()
            && stored.finalizers().is_empty()
        {
            self.objects.write().await.remove(&key);
            return Ok(stored);
        }
        stored.meta_mut().resource_version = Some(self.bump().await);
        self.objects.write().await.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        self.enter(Op::Delete, Some(key)).await?;
        let mut objects = self.objects.write().await;
        let finalized = match objects.get(key) {
            Some(current) => !current.finalizers().is_empty(),
            None => return Err(StoreError::NotFound(Self::describe(key))),
        };
        if !finalized {
            objects.remove(key);
        } else if let Some(current) = objects.get_mut(key) {
            if current.meta().deletion_timestamp.is_none() {
                current.meta_mut().deletion_timestamp = deletion_time();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::Service;
    use kube::api::ObjectMeta;

    use super::*;

    fn svc(ns: &str, name: &str) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some(ns.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_then_get_and_duplicate_create() {
        let store = MemoryObjectStore::<Service>::new();
        store.create(&svc("a", "x")).await.unwrap();
        let got = store.get(&ObjectKey::new("a", "x")).await.unwrap();
        assert_eq!(got.name_any(), "x");
        assert!(got.resource_version().is_some());
        assert_eq!(
            store.create(&svc("a", "x")).await,
            Err(StoreError::AlreadyExists("Service a/x".into()))
        );
    }

    #[tokio::test]
    async fn missing_objects_are_not_found() {
        let store = MemoryObjectStore::<Service>::new();
        let key = ObjectKey::new("a", "x");
        assert!(store.get(&key).await.unwrap_err().is_not_found());
        assert!(store.delete(&key).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn stale_replace_conflicts() {
        let store = MemoryObjectStore::<Service>::new();
        let first = store.create(&svc("a", "x")).await.unwrap();
        let mut second = first.clone();
        second.metadata.labels =
            Some(BTreeMap::from([("k".to_string(), "v".to_string())]));
        store.replace(&second).await.unwrap();
        // `first` still carries the old resourceVersion
        assert_eq!(
            store.replace(&first).await,
            Err(StoreError::Conflict("Service a/x".into()))
        );
    }

    #[tokio::test]
    async fn delete_with_finalizer_waits_for_finalizer_removal() {
        let store = MemoryObjectStore::<Service>::new();
        let mut obj = svc("a", "x");
        obj.metadata.finalizers = Some(vec!["f".into()]);
        store.seed(obj).await;
        let key = ObjectKey::new("a", "x");

        store.delete(&key).await.unwrap();
        let marked = store.peek(&key).await.expect("still present");
        assert!(marked.metadata.deletion_timestamp.is_some());

        let mut cleared = marked.clone();
        cleared.metadata.finalizers = Some(vec![]);
        store.replace(&cleared).await.unwrap();
        assert!(!store.contains(&key).await);
    }

    #[tokio::test]
    async fn injected_failures_and_shared_journal() {
        let journal = Journal::new();
        let a = MemoryObjectStore::<Service>::with_journal(journal.clone());
        let b = MemoryObjectStore::<Service>::with_journal(journal.clone());
        a.create(&svc("a", "x")).await.unwrap();
        b.fail_on(Op::Delete, StoreError::Api("boom".into())).await;
        assert_eq!(
            b.delete(&ObjectKey::new("b", "y")).await,
            Err(StoreError::Api("boom".into()))
        );
        assert_eq!(
            journal.writes().await,
            vec!["Create Service a/x", "Delete Service b/y"]
        );
        b.clear_failures().await;
        assert!(b.delete(&ObjectKey::new("b", "y")).await.unwrap_err().is_not_found());
    }
}
