//! State trait and its object-safe runtime view.
//!
//! States are ordinary Rust types. Their place in the hierarchy is declared in
//! the [`TypeRegistry`](crate::registry::TypeRegistry), and their lifecycle
//! hooks and input handlers live in the machine definition, so the trait
//! itself carries no behavior.

use super::kind::Kind;
use std::any::Any;
use std::fmt::Debug;

/// Marker trait for concrete state types.
///
/// # Example
///
/// ```rust
/// use strata::core::{State, StateNode};
///
/// #[derive(Debug, Default)]
/// struct Heating {
///     target: u32,
/// }
///
/// impl State for Heating {}
///
/// let node: Box<dyn StateNode> = Box::new(Heating { target: 21 });
/// assert!(node.is::<Heating>());
/// assert_eq!(node.downcast_ref::<Heating>().unwrap().target, 21);
/// ```
pub trait State: Any + Debug {}

/// Object-safe view over any [`State`], used wherever the engine holds a
/// state without knowing its concrete type.
pub trait StateNode: Any + Debug {
    /// Concrete kind of this instance.
    fn kind(&self) -> Kind;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: State> StateNode for T {
    fn kind(&self) -> Kind {
        Kind::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl<'a> dyn StateNode + 'a {
    /// Whether this instance is exactly of concrete kind `T`.
    ///
    /// Use [`Engine::is_in`](crate::engine::Engine::is_in) for hierarchy-aware
    /// membership.
    pub fn is<T: State>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: State>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: State>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Idle;

    #[derive(Debug, Default, PartialEq)]
    struct Heating {
        target: u32,
    }

    impl State for Idle {}
    impl State for Heating {}

    #[test]
    fn kind_reports_concrete_type() {
        let node: Box<dyn StateNode> = Box::new(Heating { target: 3 });
        assert_eq!(node.kind(), Kind::of::<Heating>());
    }

    #[test]
    fn downcast_matches_only_concrete_type() {
        let node: Box<dyn StateNode> = Box::new(Idle);
        assert!(node.is::<Idle>());
        assert!(!node.is::<Heating>());
        assert!(node.downcast_ref::<Heating>().is_none());
    }

    #[test]
    fn downcast_mut_allows_update() {
        let mut node: Box<dyn StateNode> = Box::new(Heating { target: 3 });
        node.downcast_mut::<Heating>().unwrap().target = 5;
        assert_eq!(node.downcast_ref::<Heating>(), Some(&Heating { target: 5 }));
    }

    #[test]
    fn into_any_recovers_value() {
        let node: Box<dyn StateNode> = Box::new(Heating { target: 9 });
        let any = node.into_any();
        assert_eq!(*any.downcast::<Heating>().unwrap(), Heating { target: 9 });
    }
}
