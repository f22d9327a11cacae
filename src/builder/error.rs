//! Build errors for registries and machine definitions.

use crate::registry::RegistryIssue;
use thiserror::Error;

/// Errors that can occur when building a registry or a machine definition.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial::<S>() before .build()")]
    MissingInitialState,

    #[error("Owner kind not specified. Call .owner::<O>() before .build()")]
    MissingOwner,

    #[error("Kind {kind} is not registered as an owner")]
    NotAnOwner { kind: &'static str },

    #[error("Kind {kind} is not a registered concrete state")]
    NotConcrete { kind: &'static str },

    #[error("Kind {kind} is not part of the registered state hierarchy")]
    NotInHierarchy { kind: &'static str },

    #[error("Input {input} already has a handler on {state}")]
    DuplicateHandler {
        state: &'static str,
        input: &'static str,
    },

    #[error("Invalid type registry: {}", join(.issues))]
    Registry { issues: Vec<RegistryIssue> },
}

fn join(issues: &[RegistryIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
