//! Transition descriptors returned by input handlers.

use crate::core::{Kind, State, StateNode};
use crate::error::{Error, Fault};
use crate::registry::{Role, TypeRegistry};
use std::fmt;

type Build = Box<dyn FnOnce(&TypeRegistry) -> Result<Box<dyn StateNode>, Fault>>;

/// What an input handler asks the engine to do next.
///
/// A descriptor is only a value: the engine interprets it after the handler
/// returns, building the next instance and running the hook sequence.
///
/// # Example
///
/// ```rust
/// use strata::core::{Kind, State};
/// use strata::transition::Transition;
///
/// #[derive(Debug, Default)]
/// struct Heating {
///     target: u32,
/// }
/// impl State for Heating {}
///
/// let stay = Transition::stay();
/// assert!(stay.is_stay());
///
/// let next = Transition::to_with(|h: &mut Heating| {
///     h.target = 21;
///     Ok(())
/// });
/// assert_eq!(next.target_kind(), Some(Kind::of::<Heating>()));
/// ```
pub enum Transition {
    /// Keep the current instance; no hooks run.
    Stay,
    /// Replace the current instance with a new one.
    To(Target),
}

/// The instance a [`Transition::To`] will install.
pub struct Target {
    kind: Kind,
    build: Build,
}

impl Transition {
    pub fn stay() -> Self {
        Self::Stay
    }

    /// Move to a fresh instance of `S` built by its registered factory.
    pub fn to<S: State>() -> Self {
        Self::To(Target {
            kind: Kind::of::<S>(),
            build: Box::new(|registry: &TypeRegistry| -> Result<Box<dyn StateNode>, Fault> {
                Ok(registry.instantiate(Kind::of::<S>())?)
            }),
        })
    }

    /// Move to a fresh instance of `S`, mutated by `init` before it becomes
    /// current. An `init` error abandons the transition.
    pub fn to_with<S, F>(init: F) -> Self
    where
        S: State,
        F: FnOnce(&mut S) -> Result<(), Fault> + 'static,
    {
        Self::To(Target {
            kind: Kind::of::<S>(),
            build: Box::new(move |registry: &TypeRegistry| -> Result<Box<dyn StateNode>, Fault> {
                let mut node = registry.instantiate(Kind::of::<S>())?;
                let state = node
                    .downcast_mut::<S>()
                    .ok_or("registered factory produced a different kind")?;
                init(state)?;
                Ok(node)
            }),
        })
    }

    /// Move to an instance built by the caller.
    pub fn to_state<S: State>(state: S) -> Self {
        Self::To(Target {
            kind: Kind::of::<S>(),
            build: Box::new(move |registry: &TypeRegistry| -> Result<Box<dyn StateNode>, Fault> {
                let kind = Kind::of::<S>();
                match registry.entry(kind).map(|entry| entry.role()) {
                    Some(Role::State) => Ok(Box::new(state)),
                    Some(Role::Outdated) => Err(Error::OutdatedKind { kind: kind.name() }.into()),
                    _ => Err(Error::UnregisteredKind { kind: kind.name() }.into()),
                }
            }),
        })
    }

    pub fn is_stay(&self) -> bool {
        matches!(self, Self::Stay)
    }

    /// Kind of the instance this transition installs, if any.
    pub fn target_kind(&self) -> Option<Kind> {
        match self {
            Self::Stay => None,
            Self::To(target) => Some(target.kind),
        }
    }
}

impl Target {
    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub(crate) fn build(self, registry: &TypeRegistry) -> Result<Box<dyn StateNode>, Fault> {
        (self.build)(registry)
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stay => f.write_str("Stay"),
            Self::To(target) => f.debug_tuple("To").field(&target.kind).finish(),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target").field("kind", &self.kind).finish()
    }
}
