//! Namespaced object access used by the reconcilers.
//!
//! Reconcilers hold one [`Store`] per kind instead of a raw client so that
//! they can be exercised against an in-memory store.

use std::fmt::{self, Debug};
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::PostParams;
use kube::{Api, Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Namespaced name of an object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
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

    /// Key of an object as delivered by the watcher. Cluster-scoped objects
    /// never reach the reconcilers, so a missing namespace maps to empty.
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
pub trait Store<K>: Send + Sync {
    /// `Ok(None)` when the object does not exist.
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error>;

    async fn create(&self, obj: &K) -> Result<K, kube::Error>;

    /// Replaces the object. The write is rejected with a conflict when the
    /// object's resource version is stale.
    async fn replace(&self, obj: &K) -> Result<K, kube::Error>;
}

/// [`Store`] backed by the API server.
pub struct KubeStore<K> {
    client: Client,
    field_manager: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeStore<K> {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            _kind: PhantomData,
        }
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..PostParams::default()
        }
    }
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl<K> Store<K> for KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error> {
        self.api(&key.namespace).get_opt(&key.name).await
    }

    async fn create(&self, obj: &K) -> Result<K, kube::Error> {
        let namespace = obj.namespace().unwrap_or_default();
        self.api(&namespace).create(&self.post_params(), obj).await
    }

    async fn replace(&self, obj: &K) -> Result<K, kube::Error> {
        let namespace = obj.namespace().unwrap_or_default();
        self.api(&namespace)
            .replace(&obj.name_any(), &self.post_params(), obj)
            .await
    }
}
