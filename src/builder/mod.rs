//! Builder API for machine definitions.
//!
//! This module provides the fluent [`MachineBuilder`], the shared
//! [`BuildError`] and the [`abstract_kinds!`](crate::abstract_kinds) macro
//! for declaring hierarchy levels with minimal boilerplate.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::MachineBuilder;
