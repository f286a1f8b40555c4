//! Read-only, eventually consistent views of the RBAC objects in a cluster
//!
//! The sweep only ever lists a whole kind at a time. In production the view
//! is backed by kube-runtime reflectors; `SnapshotCache` holds a fixed set of
//! objects for callers that already have them in hand.

use std::fmt::Debug;

use futures::{Stream, StreamExt};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::runtime::reflector::{self, store::Writer, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, Resource};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tracing::warn;

#[cfg(test)]
use mockall::automock;

use bulwark_common::Error;

use crate::kind::{AuthorizationObject, AuthzKind};

/// Full-list access to cached RBAC objects, one kind at a time
#[cfg_attr(test, automock)]
pub trait ObjectCache: Send + Sync {
    /// Every cached object of `kind`, in no particular order
    fn list(&self, kind: AuthzKind) -> Vec<AuthorizationObject>;
}

/// Cache backed by one reflector store per kind
#[derive(Clone)]
pub struct ReflectorCache {
    cluster_roles: Store<ClusterRole>,
    cluster_role_bindings: Store<ClusterRoleBinding>,
    roles: Store<Role>,
    role_bindings: Store<RoleBinding>,
}

impl ReflectorCache {
    /// Wrap stores whose reflectors are driven elsewhere
    pub fn new(
        cluster_roles: Store<ClusterRole>,
        cluster_role_bindings: Store<ClusterRoleBinding>,
        roles: Store<Role>,
        role_bindings: Store<RoleBinding>,
    ) -> Self {
        Self {
            cluster_roles,
            cluster_role_bindings,
            roles,
            role_bindings,
        }
    }

    /// Start cluster-wide watches for all four kinds on the current runtime
    pub fn spawn(client: Client) -> Self {
        Self {
            cluster_roles: spawn_reflector(Api::all(client.clone())),
            cluster_role_bindings: spawn_reflector(Api::all(client.clone())),
            roles: spawn_reflector(Api::all(client.clone())),
            role_bindings: spawn_reflector(Api::all(client)),
        }
    }

    /// Wait until every store has completed its initial list
    pub async fn wait_until_ready(&self) -> Result<(), Error> {
        let ready = futures::try_join!(
            self.cluster_roles.wait_until_ready(),
            self.cluster_role_bindings.wait_until_ready(),
            self.roles.wait_until_ready(),
            self.role_bindings.wait_until_ready(),
        );
        ready
            .map(|_| ())
            .map_err(|e| Error::internal_with_context("cache", e.to_string()))
    }
}

impl ObjectCache for ReflectorCache {
    fn list(&self, kind: AuthzKind) -> Vec<AuthorizationObject> {
        match kind {
            AuthzKind::ClusterRole => snapshot(&self.cluster_roles),
            AuthzKind::ClusterRoleBinding => snapshot(&self.cluster_role_bindings),
            AuthzKind::Role => snapshot(&self.roles),
            AuthzKind::RoleBinding => snapshot(&self.role_bindings),
        }
    }
}

fn snapshot<K>(store: &Store<K>) -> Vec<AuthorizationObject>
where
    K: Resource<DynamicType = ()> + Clone + Into<AuthorizationObject> + 'static,
{
    store
        .state()
        .into_iter()
        .map(|obj| obj.as_ref().clone().into())
        .collect()
}

fn spawn_reflector<K>(api: Api<K>) -> Store<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    let (reader, writer) = reflector::store();
    let events = watcher(api, watcher::Config::default()).default_backoff();
    tokio::spawn(reflect_events(writer, events));
    reader
}

/// Feed watch events into a store until the stream ends
///
/// Watch errors are logged and skipped; the backoff wrapper on the real
/// watcher restarts the list.
async fn reflect_events<K, S>(writer: Writer<K>, events: S)
where
    K: Resource<DynamicType = ()> + Clone + Debug + Send + Sync + 'static,
    S: Stream<Item = Result<watcher::Event<K>, watcher::Error>> + Send,
{
    events
        .reflect(writer)
        .touched_objects()
        .for_each(|event| async move {
            if let Err(e) = event {
                warn!(kind = %K::kind(&()), error = %e, "RBAC watch error");
            }
        })
        .await
}

/// Fixed in-memory set of objects
#[derive(Debug, Default)]
pub struct SnapshotCache {
    objects: RwLock<Vec<AuthorizationObject>>,
}

impl SnapshotCache {
    /// Cache holding `objects`
    pub fn new(objects: impl IntoIterator<Item = AuthorizationObject>) -> Self {
        Self {
            objects: RwLock::new(objects.into_iter().collect()),
        }
    }

    /// Add an object, as a watch event would
    pub fn insert(&self, object: AuthorizationObject) {
        self.objects.write().push(object);
    }

    /// Number of cached objects across all kinds
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the cache holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl ObjectCache for SnapshotCache {
    fn list(&self, kind: AuthzKind) -> Vec<AuthorizationObject> {
        self.objects
            .read()
            .iter()
            .filter(|o| o.kind() == kind)
            .cloned()
            .collect()
    }
}
