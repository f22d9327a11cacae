//! Core types shared by every part of the runtime.
//!
//! - [`Kind`]: type identity used as the key of every table
//! - [`State`] / [`StateNode`]: user state types and their object-safe view
//! - [`Blackboard`]: one value per kind, owned by the engine
//! - [`HookTable`]: lifecycle hooks keyed by kind and category
//! - [`TransitionHistory`]: bounded record of committed transitions

mod blackboard;
mod history;
mod hooks;
mod kind;
mod state;

pub use blackboard::Blackboard;
pub use history::{TransitionHistory, TransitionRecord};
pub use hooks::{Hook, HookKind, HookTable};
pub use kind::Kind;
pub use state::{State, StateNode};
