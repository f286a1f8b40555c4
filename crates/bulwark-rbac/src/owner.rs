//! The resource that owns the RBAC objects being backed up
//!
//! Expectations are keyed by the owner, and the target version tag is a
//! function of the owner's spec, status and generation.

use kube::ResourceExt;

use bulwark_common::crd::BulwarkInstall;
use bulwark_common::Error;

use crate::annotations::VersionTag;

/// A resource whose upgrade is guarded by RBAC backups
pub trait UpgradeOwner: Send + Sync {
    /// Key identifying this owner in the expectation store
    fn owner_key(&self) -> String;

    /// The version tag objects will carry once the upgrade is applied
    fn target_tag(&self) -> Result<VersionTag, Error>;
}

impl UpgradeOwner for BulwarkInstall {
    fn owner_key(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name_any()),
            None => self.name_any(),
        }
    }

    fn target_tag(&self) -> Result<VersionTag, Error> {
        let generation = self.metadata.generation.ok_or_else(|| {
            Error::validation_for(self.owner_key(), "metadata.generation is not set")
        })?;

        let id = self
            .status
            .as_ref()
            .and_then(|s| s.target_id.as_deref())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                Error::validation_for(self.owner_key(), "status.targetId has not been computed")
            })?;

        Ok(VersionTag::new(
            self.spec.version.clone(),
            self.spec.image_registry.clone(),
            id,
            generation,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_common::crd::{BulwarkInstallSpec, BulwarkInstallStatus};

    fn install(generation: Option<i64>, target_id: Option<&str>) -> BulwarkInstall {
        let mut install = BulwarkInstall::new(
            "bulwark",
            BulwarkInstallSpec {
                version: "v2".to_string(),
                image_registry: "reg".to_string(),
            },
        );
        install.metadata.namespace = Some("bulwark-system".to_string());
        install.metadata.generation = generation;
        install.status = Some(BulwarkInstallStatus {
            target_id: target_id.map(str::to_string),
            ..Default::default()
        });
        install
    }

    #[test]
    fn test_target_tag_combines_spec_status_and_generation() {
        let owner = install(Some(3), Some("id1"));
        assert_eq!(owner.owner_key(), "bulwark-system/bulwark");
        assert_eq!(
            owner.target_tag().expect("target tag"),
            VersionTag::new("v2", "reg", "id1", 3)
        );
    }

    #[test]
    fn test_target_tag_requires_computed_id() {
        let err = install(Some(3), None).target_tag().unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("targetId"));

        assert!(install(Some(3), Some("")).target_tag().is_err());
    }

    #[test]
    fn test_target_tag_requires_generation() {
        let err = install(None, Some("id1")).target_tag().unwrap_err();
        assert_eq!(err.object(), Some("bulwark-system/bulwark"));
    }
}
