//! BulwarkInstall Custom Resource Definition
//!
//! A BulwarkInstall describes one deployment of the managed application.
//! Its spec carries the version and image registry the operator should roll
//! out; the identifier of the rendered install configuration is computed by
//! the operator and recorded in status. Together with `metadata.generation`
//! these form the target version of every object the install owns.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of a BulwarkInstall
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BulwarkInstallStatus {
    /// Identifier of the rendered install configuration for the target version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,

    /// Version currently deployed (set once an upgrade completes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_version: Option<String>,

    /// Observed generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Specification for a BulwarkInstall
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "bulwark.dev",
    version = "v1alpha1",
    kind = "BulwarkInstall",
    plural = "bulwarkinstalls",
    shortname = "bi",
    namespaced,
    status = "BulwarkInstallStatus",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Observed","type":"string","jsonPath":".status.observedVersion"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BulwarkInstallSpec {
    /// Target version (image tag) of the managed application
    pub version: String,

    /// Registry the application images are pulled from
    pub image_registry: String,
}
