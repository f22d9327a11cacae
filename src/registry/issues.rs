//! Problems found while validating a type registry.

use thiserror::Error;

/// A single registry inconsistency. Validation collects all of them before
/// reporting, so a broken table is fixed in one pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryIssue {
    #[error("identifier '{id}' is used by more than one kind")]
    DuplicateId { id: String },

    #[error("kind {kind} is registered more than once")]
    DuplicateKind { kind: &'static str },

    #[error("no hierarchy root registered")]
    MissingRoot,

    #[error("more than one hierarchy root registered: {roots:?}")]
    MultipleRoots { roots: Vec<&'static str> },

    #[error("kind {kind} names unregistered parent {parent}")]
    UnknownParent {
        kind: &'static str,
        parent: &'static str,
    },

    #[error("kind {kind} names {parent} as parent, which is not part of the state hierarchy")]
    InvalidParent {
        kind: &'static str,
        parent: &'static str,
    },

    #[error("kind {kind} is part of a parent cycle")]
    Cycle { kind: &'static str },

    #[error("outdated kind {kind} upgrades to {target}, which is not a registered state")]
    UnknownUpgradeTarget {
        kind: &'static str,
        target: &'static str,
    },
}
