//! Common types for Bulwark: CRDs, errors, and logging setup

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager used for writes issued by the operator
pub const DEFAULT_FIELD_MANAGER: &str = "bulwark-operator";
