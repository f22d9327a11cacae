//! Runtime and persistence errors.

use thiserror::Error;

/// Error raised by user code (handlers, hooks, initializers, upgrades).
///
/// Any `std::error::Error + Send + Sync` converts into a `Fault` with `?`,
/// and so does a plain string: `return Err("boiler offline".into())`.
pub type Fault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported synchronously by the engine, the blackboard and the
/// persistence codec. None of them are retried internally.
#[derive(Debug, Error)]
pub enum Error {
    #[error("blackboard already holds an entry for {kind}")]
    DuplicateEntry { kind: &'static str },

    #[error("blackboard has no entry for {kind}")]
    MissingEntry { kind: &'static str },

    #[error("malformed document: {reason}")]
    MalformedDocument { reason: String },

    #[error("unknown type identifier '{id}'")]
    UnknownTypeId { id: String },

    #[error("engine has not been started")]
    NotStarted,

    #[error("kind {kind} is not registered")]
    UnregisteredKind { kind: &'static str },

    #[error("kind {kind} is abstract and cannot be instantiated")]
    AbstractKind { kind: &'static str },

    #[error("kind {kind} is outdated and can only be restored from a document")]
    OutdatedKind { kind: &'static str },

    #[error("document owner '{found}' does not match engine owner '{expected}'")]
    OwnerMismatch { expected: String, found: String },

    #[error("state '{id}' is still outdated after {limit} upgrade steps")]
    UpgradeLimit { id: String, limit: usize },

    #[error("upgrade of state '{id}' failed: {source}")]
    Upgrade {
        id: String,
        #[source]
        source: Fault,
    },

    #[error("hook failed: {0}")]
    Hook(#[source] Fault),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            reason: reason.into(),
        }
    }
}
