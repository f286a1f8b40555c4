//! Backup sweep configuration

use kube::api::PostParams;
use serde::{Deserialize, Serialize};

use bulwark_common::DEFAULT_FIELD_MANAGER;

/// Environment variable overriding the field manager
pub const FIELD_MANAGER_ENV: &str = "BULWARK_FIELD_MANAGER";

/// Environment variable enabling dry-run creates
pub const DRY_RUN_ENV: &str = "BULWARK_BACKUP_DRY_RUN";

/// Configuration for the backup sweep
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupConfig {
    /// Field manager recorded on created backups
    pub field_manager: String,

    /// Issue creates with the API server's dry-run flag
    pub dry_run: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            dry_run: false,
        }
    }
}

impl BackupConfig {
    /// Defaults overridden by `BULWARK_FIELD_MANAGER` / `BULWARK_BACKUP_DRY_RUN`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(manager) = lookup(FIELD_MANAGER_ENV).filter(|m| !m.is_empty()) {
            config.field_manager = manager;
        }
        if let Some(dry_run) = lookup(DRY_RUN_ENV) {
            config.dry_run = matches!(dry_run.as_str(), "1" | "true" | "TRUE" | "True");
        }
        config
    }

    /// Parameters for create calls
    pub fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: self.dry_run,
            field_manager: Some(self.field_manager.clone()),
        }
    }
}
