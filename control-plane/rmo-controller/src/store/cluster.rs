use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    Client, Resource, ResourceExt,
    api::{Api, DeleteParams, ListParams, PostParams},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{ObjectKey, ObjectStore, Op, StoreError, StoreResult};

/// [`ObjectStore`] backed by the API server.
///
/// Every request races the shared cancellation token, so a shutdown aborts
/// the in-flight pass with [`StoreError::Cancelled`].
pub struct KubeObjectStore<K> {
    client: Client,
    cancel: CancellationToken,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeObjectStore<K> {
    pub fn new(client: Client, cancel: CancellationToken) -> Self {
        Self {
            client,
            cancel,
            _kind: PhantomData,
        }
    }
}

impl<K> KubeObjectStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    fn api(&self, ns: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), ns)
    }

    async fn guarded<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send,
    {
        cancellable(&self.cancel, fut).await
    }
}

/// Resolve `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(
    cancel: &CancellationToken,
    fut: F,
) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Cancelled),
        res = fut => res,
    }
}

pub(crate) fn classify(err: kube::Error, op: Op, what: String) -> StoreError {
    match &err {
        kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound(what),
        kube::Error::Api(ae) if ae.code == 409 => match op {
            Op::Create => StoreError::AlreadyExists(what),
            _ => StoreError::Conflict(what),
        },
        kube::Error::SerdeError(e) => {
            StoreError::Serialization(format!("{op:?} {what}: {e}"))
        }
        _ => StoreError::Api(format!("{op:?} {what}: {err}")),
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeObjectStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Serialize
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, key: &ObjectKey) -> StoreResult<K> {
        trace!(kind = %K::kind(&()), %key, "store: get");
        let api = self.api(&key.namespace);
        self.guarded(async {
            api.get(&key.name)
                .await
                .map_err(|e| classify(e, Op::Get, describe::<K>(key)))
        })
        .await
    }

    async fn list(&self) -> StoreResult<Vec<K>> {
        trace!(kind = %K::kind(&()), "store: list");
        let api: Api<K> = Api::all(self.client.clone());
        self.guarded(async {
            api.list(&ListParams::default())
                .await
                .map(|l| l.items)
                .map_err(|e| classify(e, Op::List, K::kind(&()).to_string()))
        })
        .await
    }

    async fn create(&self, obj: &K) -> StoreResult<K> {
        let key = ObjectKey::of(obj);
        trace!(kind = %K::kind(&()), %key, "store: create");
        let api = self.api(&key.namespace);
        self.guarded(async {
            api.create(&PostParams::default(), obj)
                .await
                .map_err(|e| classify(e, Op::Create, describe::<K>(&key)))
        })
        .await
    }

    async fn replace(&self, obj: &K) -> StoreResult<K> {
        let key = ObjectKey::of(obj);
        trace!(kind = %K::kind(&()), %key, rv = ?obj.resource_version(), "store: replace");
        let api = self.api(&key.namespace);
        self.guarded(async {
            api.replace(&key.name, &PostParams::default(), obj)
                .await
                .map_err(|e| classify(e, Op::Replace, describe::<K>(&key)))
        })
        .await
    }

    async fn delete(&self, key: &ObjectKey) -> StoreResult<()> {
        trace!(kind = %K::kind(&()), %key, "store: delete");
        let api = self.api(&key.namespace);
        self.guarded(async {
            api.delete(&key.name, &DeleteParams::default())
                .await
                .map(|_| ())
                .map_err(|e| classify(e, Op::Delete, describe::<K>(key)))
        })
        .await
    }
}

fn describe<K: Resource<DynamicType = ()>>(key: &ObjectKey) -> String {
    format!("{} {}", K::kind(&()), key)
}
