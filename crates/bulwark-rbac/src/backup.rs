//! Pre-upgrade backup sweep for RBAC objects
//!
//! Before the upgrade rewrites ClusterRoles, ClusterRoleBindings, Roles and
//! RoleBindings in place, every tracked object that is off the target
//! version gets an ephemeral copy. A failed upgrade can then be rolled back
//! by restoring the copies.
//!
//! The sweep walks the four kinds in a fixed order and stops at the first
//! create failure. Re-running it is safe: objects whose backup is already
//! visible in the cache are filtered out. Each create is preceded by a
//! raised expectation for (owner, kind) so the reconcile loop knows to wait
//! for the cache to catch up before trusting it again.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::{debug, info, instrument, warn};

use bulwark_common::Error;

use crate::annotations::{inject_operator_metadata, write_backup_marker, VersionTag};
use crate::cache::ObjectCache;
use crate::client::RbacClient;
use crate::config::BackupConfig;
use crate::eligibility::needs_fresh_backup;
use crate::expectations::Expectations;
use crate::kind::{AuthorizationObject, AuthzKind};
use crate::owner::UpgradeOwner;

/// Backups created by one sweep
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackupSummary {
    created: BTreeMap<AuthzKind, usize>,
}

impl BackupSummary {
    /// Backups created for `kind`
    pub fn created(&self, kind: AuthzKind) -> usize {
        self.created.get(&kind).copied().unwrap_or(0)
    }

    /// Backups created across all kinds
    pub fn total(&self) -> usize {
        self.created.values().sum()
    }

    fn record(&mut self, kind: AuthzKind) {
        *self.created.entry(kind).or_insert(0) += 1;
    }
}

/// Build the ephemeral copy of `source`
///
/// The payload is copied as is. Metadata starts empty apart from a
/// generated name and, for namespaced kinds, the source namespace; then the
/// stamp tag and the source UID are recorded.
pub fn build_backup(
    source: &AuthorizationObject,
    stamp: &VersionTag,
) -> Result<AuthorizationObject, Error> {
    let uid = source.uid().ok_or_else(|| {
        Error::internal_with_context("backup", format!("{} has no uid", source.describe()))
    })?;

    let mut backup = source.clone();
    *backup.meta_mut() = ObjectMeta {
        generate_name: Some(format!("{}-", source.name())),
        namespace: source
            .namespace()
            .filter(|_| source.kind().is_namespaced())
            .map(str::to_string),
        ..Default::default()
    };
    inject_operator_metadata(backup.meta_mut(), stamp, true);
    write_backup_marker(backup.meta_mut(), uid);

    Ok(backup)
}

/// Runs the backup sweep against a cache, a client and an expectation store
pub struct BackupExecutor {
    cache: Arc<dyn ObjectCache>,
    client: Arc<dyn RbacClient>,
    expectations: Arc<dyn Expectations>,
    config: BackupConfig,
}

impl BackupExecutor {
    /// Create an executor
    pub fn new(
        cache: Arc<dyn ObjectCache>,
        client: Arc<dyn RbacClient>,
        expectations: Arc<dyn Expectations>,
        config: BackupConfig,
    ) -> Self {
        Self {
            cache,
            client,
            expectations,
            config,
        }
    }

    /// Back up every RBAC object that the coming upgrade will rewrite
    ///
    /// Returns at the first failed create, naming the object. Backups
    /// created before the failure stay in place and are recognised on the
    /// next run.
    #[instrument(skip_all, fields(owner = %owner.owner_key()))]
    pub async fn backup_authorization_objects(
        &self,
        owner: &dyn UpgradeOwner,
    ) -> Result<BackupSummary, Error> {
        let owner_key = owner.owner_key();
        let target = owner.target_tag()?;

        let mut summary = BackupSummary::default();
        for kind in AuthzKind::ALL {
            self.backup_kind(&owner_key, &target, kind, &mut summary)
                .await?;
        }

        if summary.total() > 0 {
            info!(
                target_version = %target,
                created = summary.total(),
                dry_run = self.config.dry_run,
                "RBAC backups created"
            );
        }
        Ok(summary)
    }

    async fn backup_kind(
        &self,
        owner_key: &str,
        target: &VersionTag,
        kind: AuthzKind,
        summary: &mut BackupSummary,
    ) -> Result<(), Error> {
        let cached = self.cache.list(kind);

        for source in cached.iter().filter(|o| o.kind() == kind) {
            let Some(stamp) = needs_fresh_backup(target, source, &cached) else {
                continue;
            };
            let backup = build_backup(source, &stamp)?;
            self.create_backup(owner_key, source, &backup).await?;
            summary.record(kind);
        }

        Ok(())
    }

    async fn create_backup(
        &self,
        owner_key: &str,
        source: &AuthorizationObject,
        backup: &AuthorizationObject,
    ) -> Result<(), Error> {
        let kind = backup.kind();
        // Dry-run creates never reach the cache, so there is nothing to wait for
        let track = !self.config.dry_run;

        if track {
            self.expectations.raise(owner_key, kind, 1, 0);
        }

        match self.client.create(backup, &self.config.post_params()).await {
            Ok(created) => {
                debug!(
                    kind = %kind,
                    source = %source.describe(),
                    backup = %created.describe(),
                    "backup created"
                );
                Ok(())
            }
            Err(e) => {
                if track {
                    self.expectations.lower(owner_key, kind, 1, 0);
                }
                warn!(kind = %kind, source = %source.describe(), error = %e, "backup create failed");
                Err(Error::backup(kind.as_str(), source.describe(), e))
            }
        }
    }
}
