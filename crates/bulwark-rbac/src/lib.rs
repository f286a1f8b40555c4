//! Pre-upgrade backups of RBAC objects for Bulwark
//!
//! Before an upgrade rewrites the ClusterRoles, ClusterRoleBindings, Roles
//! and RoleBindings a BulwarkInstall owns, this crate snapshots every one of
//! them that is about to change, so a failed upgrade can be rolled back.
//!
//! - **annotations**: version tags and backup markers on object metadata
//! - **eligibility**: which objects need a fresh backup
//! - **backup**: the four-kind sweep that creates the backups
//! - **cache** / **client** / **expectations**: the cluster view, write
//!   access, and in-flight write tracking the sweep runs against

pub mod annotations;
pub mod backup;
pub mod cache;
pub mod client;
pub mod config;
pub mod eligibility;
pub mod expectations;
pub mod kind;
pub mod owner;

pub use annotations::VersionTag;
pub use backup::{BackupExecutor, BackupSummary};
pub use cache::{ObjectCache, ReflectorCache, SnapshotCache};
pub use client::{KubeRbacClient, RbacClient};
pub use config::BackupConfig;
pub use expectations::{ExpectationStore, Expectations, PendingWrites};
pub use kind::{AuthorizationObject, AuthzKind};
pub use owner::UpgradeOwner;

// Re-export common error types
pub use bulwark_common::{Error, Result};
