//! Error types for the Bulwark operator
//!
//! Errors carry enough context (resource kind, object, owner) to be logged
//! once by the reconcile loop without re-wrapping at every layer.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for Bulwark operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Validation error for an owning resource or object
    #[error("validation error for {resource}: {message}")]
    Validation {
        /// Resource with invalid configuration (e.g. "bulwark-system/install")
        resource: String,
        /// Description of what's invalid
        message: String,
    },

    /// Creating a backup copy of an RBAC object failed
    #[error("unable to create backup {kind} for {object}: {source}")]
    Backup {
        /// Kind of the object being backed up (e.g. "ClusterRole")
        kind: String,
        /// The object being backed up (e.g. "default/role-a")
        object: String,
        /// Why the create failed
        #[source]
        source: Box<Error>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g. "backup", "cache")
        context: String,
    },
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            resource: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
        }
    }

    /// Create a validation error for a specific resource
    pub fn validation_for(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Wrap a create failure for the backup of `object`
    pub fn backup(kind: impl Into<String>, object: impl Into<String>, source: Error) -> Self {
        Self::Backup {
            kind: kind.into(),
            object: object.into(),
            source: Box::new(source),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Validation errors need a spec fix. Kubernetes 4xx responses are
    /// permanent except conflicts (generated-name collisions) and throttling.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) => !(400..500).contains(&ae.code) || matches!(ae.code, 409 | 429),
                _ => true,
            },
            Error::Validation { .. } => false,
            Error::Backup { source, .. } => source.is_retryable(),
            Error::Internal { .. } => true,
        }
    }

    /// Get the object description if this error is tied to a specific object
    pub fn object(&self) -> Option<&str> {
        match self {
            Error::Backup { object, .. } => Some(object),
            Error::Validation { resource, .. } => Some(resource),
            _ => None,
        }
    }

    /// Get the context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Internal { context, .. } => Some(context),
            _ => None,
        }
    }
}
