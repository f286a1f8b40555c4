//! Version tags and backup markers stored in object annotations
//!
//! Every object the operator deploys records which install it came from:
//! version, image registry, install identifier, and the generation of the
//! owning BulwarkInstall. Backup copies additionally record the UID of the
//! object they were copied from.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Version (image tag) the object was rendered for
pub const VERSION_ANNOTATION: &str = "bulwark.dev/install-version";

/// Image registry the object was rendered for
pub const REGISTRY_ANNOTATION: &str = "bulwark.dev/install-registry";

/// Identifier of the rendered install configuration
pub const ID_ANNOTATION: &str = "bulwark.dev/install-id";

/// Generation of the owning BulwarkInstall, base-10
pub const GENERATION_ANNOTATION: &str = "bulwark.dev/owner-generation";

/// UID of the object a backup copy was taken from. Only backups carry it.
pub const BACKUP_OF_ANNOTATION: &str = "bulwark.dev/backup-of";

/// Standard managed-by label
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of the managed-by label for operator-owned objects
pub const MANAGED_BY_VALUE: &str = "bulwark";

/// Label set on backup copies so cleanup can select them
pub const EPHEMERAL_BACKUP_LABEL: &str = "bulwark.dev/ephemeral-backup";

/// The install revision an object corresponds to
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VersionTag {
    /// Version (image tag)
    pub version: String,
    /// Image registry
    pub registry: String,
    /// Install configuration identifier
    pub id: String,
    /// Generation of the owning resource. `None` when an object's
    /// generation annotation is missing or unparseable.
    pub generation: Option<i64>,
}

impl VersionTag {
    /// A tag bound to a specific owner generation
    pub fn new(
        version: impl Into<String>,
        registry: impl Into<String>,
        id: impl Into<String>,
        generation: i64,
    ) -> Self {
        Self {
            version: version.into(),
            registry: registry.into(),
            id: id.into(),
            generation: Some(generation),
        }
    }

    /// Same strings, bound to `generation`
    pub fn at_generation(self, generation: i64) -> Self {
        Self {
            generation: Some(generation),
            ..self
        }
    }

    /// All three strings and the generation are equal. A tag without a
    /// generation matches nothing.
    pub fn matches(&self, other: &VersionTag) -> bool {
        self.generation.is_some() && self == other
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, id {}, ", self.version, self.registry, self.id)?;
        match self.generation {
            Some(g) => write!(f, "generation {})", g),
            None => f.write_str("no generation)"),
        }
    }
}

/// Read the recorded version tag
///
/// Returns `None` unless version, registry and identifier are all present.
pub fn read_version_tag(meta: &ObjectMeta) -> Option<VersionTag> {
    let annotations = meta.annotations.as_ref()?;
    Some(VersionTag {
        version: annotations.get(VERSION_ANNOTATION)?.clone(),
        registry: annotations.get(REGISTRY_ANNOTATION)?.clone(),
        id: annotations.get(ID_ANNOTATION)?.clone(),
        generation: annotations
            .get(GENERATION_ANNOTATION)
            .and_then(|g| g.parse().ok()),
    })
}

/// Whether the recorded version tag matches `target`
pub fn matches_version(meta: &ObjectMeta, target: &VersionTag) -> bool {
    read_version_tag(meta).is_some_and(|tag| tag.matches(target))
}

/// Read the source UID of a backup copy
pub fn read_backup_marker(meta: &ObjectMeta) -> Option<&str> {
    meta.annotations
        .as_ref()?
        .get(BACKUP_OF_ANNOTATION)
        .map(String::as_str)
}

/// Record `tag`, replacing whatever was recorded before
pub fn write_version_tag(meta: &mut ObjectMeta, tag: &VersionTag) {
    let annotations = annotations_mut(meta);
    annotations.insert(VERSION_ANNOTATION.to_string(), tag.version.clone());
    annotations.insert(REGISTRY_ANNOTATION.to_string(), tag.registry.clone());
    annotations.insert(ID_ANNOTATION.to_string(), tag.id.clone());
    match tag.generation {
        Some(g) => {
            annotations.insert(GENERATION_ANNOTATION.to_string(), g.to_string());
        }
        None => {
            annotations.remove(GENERATION_ANNOTATION);
        }
    }
}

/// Mark the object as a backup of `source_uid`
pub fn write_backup_marker(meta: &mut ObjectMeta, source_uid: &str) {
    annotations_mut(meta).insert(BACKUP_OF_ANNOTATION.to_string(), source_uid.to_string());
}

/// Apply the operator's labelling and version conventions
///
/// `ephemeral` objects (backups) also get a label cleanup can select on.
pub fn inject_operator_metadata(meta: &mut ObjectMeta, tag: &VersionTag, ephemeral: bool) {
    let labels = meta.labels.get_or_insert_with(BTreeMap::new);
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
    if ephemeral {
        labels.insert(EPHEMERAL_BACKUP_LABEL.to_string(), "true".to_string());
    }
    write_version_tag(meta, tag);
}

fn annotations_mut(meta: &mut ObjectMeta) -> &mut BTreeMap<String, String> {
    meta.annotations.get_or_insert_with(BTreeMap::new)
}
