//! Builder for machine definitions.

use crate::builder::error::BuildError;
use crate::config::EngineConfig;
use crate::core::{Blackboard, HookKind, HookTable, Kind, State, StateNode};
use crate::engine::machine::{Handler, InitialFn};
use crate::engine::{Context, Machine};
use crate::error::Fault;
use crate::registry::{Role, TypeRegistry};
use crate::transition::Transition;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for constructing machine definitions with a fluent API.
///
/// Hooks and handlers are registered per kind, once per definition; every
/// engine built from the resulting [`Machine`] shares them.
pub struct MachineBuilder {
    registry: Arc<TypeRegistry>,
    owner: Option<Kind>,
    initial: Option<(Kind, InitialFn)>,
    hooks: HookTable,
    handlers: Vec<(Kind, Kind, Handler)>,
    config: EngineConfig,
}

impl MachineBuilder {
    /// Create a new builder over a registry.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            owner: None,
            initial: None,
            hooks: HookTable::new(),
            handlers: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    /// Set the owner kind (required). It is written as the document `$type`.
    pub fn owner<O: 'static>(mut self) -> Self {
        self.owner = Some(Kind::of::<O>());
        self
    }

    /// Start in a fresh instance of `S` built by its factory (required,
    /// unless [`initial_with`](Self::initial_with) is used).
    pub fn initial<S: State>(mut self) -> Self {
        let registry = Arc::clone(&self.registry);
        let initial: InitialFn = Arc::new(
            move |_: &Blackboard| -> Result<Box<dyn StateNode>, Fault> {
                Ok(registry.instantiate(Kind::of::<S>())?)
            },
        );
        self.initial = Some((Kind::of::<S>(), initial));
        self
    }

    /// Start in the instance returned by `factory`, which may read the
    /// blackboard prepared before start.
    pub fn initial_with<S, F>(mut self, factory: F) -> Self
    where
        S: State,
        F: Fn(&Blackboard) -> S + Send + Sync + 'static,
    {
        let initial: InitialFn = Arc::new(
            move |blackboard: &Blackboard| -> Result<Box<dyn StateNode>, Fault> {
                Ok(Box::new(factory(blackboard)))
            },
        );
        self.initial = Some((Kind::of::<S>(), initial));
        self
    }

    /// Run `hook` whenever the hierarchy is entered at kind `K`.
    pub fn on_enter<K, F>(self, hook: F) -> Self
    where
        K: 'static,
        F: Fn(&mut Context<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.hook::<K, F>(HookKind::Enter, hook)
    }

    /// Run `hook` whenever the hierarchy is left at kind `K`.
    pub fn on_exit<K, F>(self, hook: F) -> Self
    where
        K: 'static,
        F: Fn(&mut Context<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.hook::<K, F>(HookKind::Exit, hook)
    }

    /// Run `hook` once for every instance whose chain includes `K`, when it
    /// becomes current.
    pub fn on_attach<K, F>(self, hook: F) -> Self
    where
        K: 'static,
        F: Fn(&mut Context<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.hook::<K, F>(HookKind::Attach, hook)
    }

    /// Run `hook` once for every instance whose chain includes `K`, after it
    /// stopped being current.
    pub fn on_detach<K, F>(self, hook: F) -> Self
    where
        K: 'static,
        F: Fn(&mut Context<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.hook::<K, F>(HookKind::Detach, hook)
    }

    /// Handle inputs of kind `I` in states whose chain includes `K`.
    ///
    /// A handler on a more specific kind overrides one on its ancestors.
    pub fn on<K, I, F>(mut self, handler: F) -> Self
    where
        K: 'static,
        I: 'static,
        F: Fn(&I, &mut Context<'_>) -> Result<Transition, Fault> + Send + Sync + 'static,
    {
        let erased: Handler = Arc::new(move |input: &dyn Any, ctx: &mut Context<'_>| {
            match input.downcast_ref::<I>() {
                Some(input) => handler(input, ctx),
                None => Ok(Transition::Stay),
            }
        });
        self.handlers
            .push((Kind::of::<K>(), Kind::of::<I>(), erased));
        self
    }

    /// Replace the default configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the machine definition.
    /// Returns an error if required fields are missing or a registration
    /// names a kind outside the registry.
    pub fn build(self) -> Result<Machine, BuildError> {
        let owner = self.owner.ok_or(BuildError::MissingOwner)?;
        if self.registry.entry(owner).map(|e| e.role()) != Some(Role::Owner) {
            return Err(BuildError::NotAnOwner { kind: owner.name() });
        }

        let (initial_kind, initial) = self.initial.ok_or(BuildError::MissingInitialState)?;
        if self.registry.entry(initial_kind).map(|e| e.role()) != Some(Role::State) {
            return Err(BuildError::NotConcrete {
                kind: initial_kind.name(),
            });
        }

        for kind in self.hooks.kinds() {
            check_in_hierarchy(&self.registry, kind)?;
        }

        let mut handlers = HashMap::new();
        for (state, input, handler) in self.handlers {
            check_in_hierarchy(&self.registry, state)?;
            if handlers.insert((state, input), handler).is_some() {
                return Err(BuildError::DuplicateHandler {
                    state: state.name(),
                    input: input.name(),
                });
            }
        }

        Ok(Machine {
            registry: self.registry,
            owner,
            initial_kind,
            initial,
            hooks: self.hooks,
            handlers,
            config: self.config,
        })
    }

    fn hook<K, F>(mut self, category: HookKind, hook: F) -> Self
    where
        K: 'static,
        F: Fn(&mut Context<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        self.hooks.register(Kind::of::<K>(), category, Arc::new(hook));
        self
    }
}

fn check_in_hierarchy(registry: &TypeRegistry, kind: Kind) -> Result<(), BuildError> {
    match registry.entry(kind) {
        Some(entry) if entry.role().in_hierarchy() => Ok(()),
        _ => Err(BuildError::NotInHierarchy { kind: kind.name() }),
    }
}
