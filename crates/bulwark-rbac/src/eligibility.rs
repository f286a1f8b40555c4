//! Deciding which RBAC objects need a fresh backup
//!
//! An object needs a backup when it is tracked by the operator, is not
//! itself a backup, and is not already at the target version. A backup that
//! already exists for the same UID and the same stamped version satisfies
//! the requirement, so a sweep that re-runs before the upgrade is applied
//! creates nothing new.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::annotations::{matches_version, read_backup_marker, read_version_tag, VersionTag};
use crate::kind::AuthorizationObject;

/// Whether an object, judged on its own metadata, needs a backup
///
/// Returns the tag to stamp on the backup: the object's recorded version
/// strings bound to the target generation, so rollback knows exactly which
/// revision the copy represents.
pub fn should_backup(target: &VersionTag, meta: &ObjectMeta) -> Option<VersionTag> {
    if matches_version(meta, target) {
        return None;
    }

    // Untracked: predates the operator or was created by hand
    let recorded = read_version_tag(meta)?;

    // Backups are never backed up
    if read_backup_marker(meta).is_some() {
        return None;
    }

    let generation = target.generation?;
    Some(recorded.at_generation(generation))
}

/// Whether `object` needs a backup that does not exist yet
///
/// `cached` is the current cache snapshot for the object's kind. A cached
/// backup only counts if it names this object's UID, carries the stamp tag,
/// and is not itself being deleted. Sources without a UID are skipped since
/// a backup could never be traced back to them.
pub fn needs_fresh_backup(
    target: &VersionTag,
    object: &AuthorizationObject,
    cached: &[AuthorizationObject],
) -> Option<VersionTag> {
    let stamp = should_backup(target, object.meta())?;
    let uid = object.uid().filter(|uid| !uid.is_empty())?;

    let already_backed_up = cached
        .iter()
        .filter(|c| c.kind() == object.kind() && !c.is_deleting())
        .any(|c| read_backup_marker(c.meta()) == Some(uid) && matches_version(c.meta(), &stamp));

    (!already_backed_up).then_some(stamp)
}
