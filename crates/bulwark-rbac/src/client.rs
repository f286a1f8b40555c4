//! Create access to the Kubernetes RBAC API

use async_trait::async_trait;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::api::{Api, PostParams};
use kube::Client;

#[cfg(test)]
use mockall::automock;

use bulwark_common::Error;

use crate::kind::AuthorizationObject;

/// Trait abstracting RBAC writes
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RbacClient: Send + Sync {
    /// Create `object`, returning it as stored by the API server
    ///
    /// Namespaced kinds are created in the object's own namespace.
    async fn create(
        &self,
        object: &AuthorizationObject,
        params: &PostParams,
    ) -> Result<AuthorizationObject, Error>;
}

/// Real Kubernetes client implementation
pub struct KubeRbacClient {
    client: Client,
}

impl KubeRbacClient {
    /// Create a new KubeRbacClient wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespaced<K>(&self, object: &AuthorizationObject) -> Result<Api<K>, Error>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>,
    {
        let namespace = object.namespace().ok_or_else(|| {
            Error::validation_for(
                object.describe(),
                format!("{} requires a namespace", object.kind()),
            )
        })?;
        Ok(Api::namespaced(self.client.clone(), namespace))
    }
}

#[async_trait]
impl RbacClient for KubeRbacClient {
    async fn create(
        &self,
        object: &AuthorizationObject,
        params: &PostParams,
    ) -> Result<AuthorizationObject, Error> {
        let created = match object {
            AuthorizationObject::ClusterRole(o) => {
                let api: Api<ClusterRole> = Api::all(self.client.clone());
                api.create(params, o).await?.into()
            }
            AuthorizationObject::ClusterRoleBinding(o) => {
                let api: Api<ClusterRoleBinding> = Api::all(self.client.clone());
                api.create(params, o).await?.into()
            }
            AuthorizationObject::Role(o) => {
                let api: Api<Role> = self.namespaced(object)?;
                api.create(params, o).await?.into()
            }
            AuthorizationObject::RoleBinding(o) => {
                let api: Api<RoleBinding> = self.namespaced(object)?;
                api.create(params, o).await?.into()
            }
        };
        Ok(created)
    }
}
