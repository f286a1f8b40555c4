//! Custom Resource Definitions owned by the Bulwark operator

mod install;

pub use install::{BulwarkInstall, BulwarkInstallSpec, BulwarkInstallStatus};
