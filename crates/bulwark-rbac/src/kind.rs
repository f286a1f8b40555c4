//! The four RBAC kinds the operator manages, behind one discriminated type
//!
//! `AuthzKind` is the tag used for cache lookups and expectation keys.
//! `AuthorizationObject` carries the typed k8s-openapi object so the payload
//! is copied verbatim when backing up.

use std::fmt;

use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Kind of an RBAC object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuthzKind {
    /// Cluster-scoped role
    ClusterRole,
    /// Cluster-scoped binding
    ClusterRoleBinding,
    /// Namespaced role
    Role,
    /// Namespaced binding
    RoleBinding,
}

impl AuthzKind {
    /// Every kind, in sweep order
    pub const ALL: [AuthzKind; 4] = [
        AuthzKind::ClusterRole,
        AuthzKind::ClusterRoleBinding,
        AuthzKind::Role,
        AuthzKind::RoleBinding,
    ];

    /// Kubernetes kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthzKind::ClusterRole => "ClusterRole",
            AuthzKind::ClusterRoleBinding => "ClusterRoleBinding",
            AuthzKind::Role => "Role",
            AuthzKind::RoleBinding => "RoleBinding",
        }
    }

    /// Whether objects of this kind live in a namespace
    pub fn is_namespaced(&self) -> bool {
        matches!(self, AuthzKind::Role | AuthzKind::RoleBinding)
    }
}

impl fmt::Display for AuthzKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An RBAC object of any of the four managed kinds
#[derive(Clone, Debug, PartialEq)]
pub enum AuthorizationObject {
    /// A ClusterRole
    ClusterRole(ClusterRole),
    /// A ClusterRoleBinding
    ClusterRoleBinding(ClusterRoleBinding),
    /// A Role
    Role(Role),
    /// A RoleBinding
    RoleBinding(RoleBinding),
}

impl AuthorizationObject {
    /// The kind tag for this object
    pub fn kind(&self) -> AuthzKind {
        match self {
            AuthorizationObject::ClusterRole(_) => AuthzKind::ClusterRole,
            AuthorizationObject::ClusterRoleBinding(_) => AuthzKind::ClusterRoleBinding,
            AuthorizationObject::Role(_) => AuthzKind::Role,
            AuthorizationObject::RoleBinding(_) => AuthzKind::RoleBinding,
        }
    }

    /// Object metadata
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            AuthorizationObject::ClusterRole(o) => &o.metadata,
            AuthorizationObject::ClusterRoleBinding(o) => &o.metadata,
            AuthorizationObject::Role(o) => &o.metadata,
            AuthorizationObject::RoleBinding(o) => &o.metadata,
        }
    }

    /// Mutable object metadata
    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            AuthorizationObject::ClusterRole(o) => &mut o.metadata,
            AuthorizationObject::ClusterRoleBinding(o) => &mut o.metadata,
            AuthorizationObject::Role(o) => &mut o.metadata,
            AuthorizationObject::RoleBinding(o) => &mut o.metadata,
        }
    }

    /// Object name, or the generateName prefix for objects not yet created
    pub fn name(&self) -> &str {
        let meta = self.meta();
        meta.name
            .as_deref()
            .or(meta.generate_name.as_deref())
            .unwrap_or_default()
    }

    /// Namespace, for namespaced kinds
    pub fn namespace(&self) -> Option<&str> {
        self.meta().namespace.as_deref()
    }

    /// Cluster-assigned unique identifier
    pub fn uid(&self) -> Option<&str> {
        self.meta().uid.as_deref()
    }

    /// Whether deletion of this object is pending
    pub fn is_deleting(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }

    /// `namespace/name` for namespaced objects, `name` otherwise
    pub fn describe(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name()),
            None => self.name().to_string(),
        }
    }
}

impl From<ClusterRole> for AuthorizationObject {
    fn from(o: ClusterRole) -> Self {
        AuthorizationObject::ClusterRole(o)
    }
}

impl From<ClusterRoleBinding> for AuthorizationObject {
    fn from(o: ClusterRoleBinding) -> Self {
        AuthorizationObject::ClusterRoleBinding(o)
    }
}

impl From<Role> for AuthorizationObject {
    fn from(o: Role) -> Self {
        AuthorizationObject::Role(o)
    }
}

impl From<RoleBinding> for AuthorizationObject {
    fn from(o: RoleBinding) -> Self {
        AuthorizationObject::RoleBinding(o)
    }
}
