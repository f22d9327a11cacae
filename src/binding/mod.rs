//! Observer bindings.
//!
//! A [`Binding`] groups input watchers, output handlers, state filters and
//! fault catchers under one disposable handle. The engine notifies bindings
//! through a hub that only holds weak references.

#[allow(clippy::module_inception)]
mod binding;
mod hub;

pub use binding::Binding;
pub(crate) use hub::Hub;
