//! Engine runtime.
//!
//! A [`Machine`] is the immutable definition (registry, hooks, handlers,
//! configuration) shared by any number of [`Engine`]s. Each engine owns its
//! current state, blackboard and input queue.

mod context;
#[allow(clippy::module_inception)]
mod engine;
pub(crate) mod machine;
mod queue;

pub use context::Context;
pub use engine::Engine;
pub use machine::{Handler, Machine};
pub use queue::InputSink;
