//! Typed access to the API server, keyed by namespace + name.
//!
//! Every controller collaborator talks to the cluster through [`ObjectStore`]
//! so the reconcile state machine can run against [`memory::MemoryObjectStore`]
//! in tests and against [`cluster::KubeObjectStore`] in production.

use std::fmt;

use async_trait::async_trait;
use kube::{Resource, ResourceExt};

pub mod cluster;
#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use cluster::KubeObjectStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// The verbs an [`ObjectStore`] exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Get,
    List,
    Create,
    Replace,
    Delete,
}

impl Op {
    pub fn is_write(self) -> bool {
        matches!(self, Op::Create | Op::Replace | Op::Delete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("conflicting write on {0}")]
    Conflict(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("api error: {0}")]
    Api(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of<K: Resource>(obj: &K) -> Self {
        Self::new(obj.namespace().unwrap_or_default(), obj.name_any())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[async_trait]
pub trait ObjectStore<K>: Send + Sync
where
    K: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &ObjectKey) -> StoreResult<K>;

    /// Every object of this kind across all namespaces.
    async fn list(&self) -> StoreResult<Vec<K>>;

    async fn create(&self, obj: &K) -> StoreResult<K>;

    /// Full update guarded by the object's `resourceVersion`.
    async fn replace(&self, obj: &K) -> StoreResult<K>;

    async fn delete(&self, key: &ObjectKey) -> StoreResult<()>;
}
