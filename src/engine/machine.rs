//! Immutable machine definition shared by engines.

use super::context::Context;
use crate::builder::MachineBuilder;
use crate::config::EngineConfig;
use crate::core::{Blackboard, HookTable, Kind, StateNode};
use crate::error::Fault;
use crate::registry::TypeRegistry;
use crate::transition::Transition;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-erased input handler. The engine only calls it with inputs of the
/// kind it was registered for.
pub type Handler =
    Arc<dyn Fn(&dyn Any, &mut Context<'_>) -> Result<Transition, Fault> + Send + Sync>;

pub(crate) type InitialFn =
    Arc<dyn Fn(&Blackboard) -> Result<Box<dyn StateNode>, Fault> + Send + Sync>;

/// Everything an [`Engine`](super::Engine) needs besides its live data:
/// registry, owner kind, initial-state factory, hook and handler tables, and
/// configuration. Build it once with [`MachineBuilder`] and share it.
pub struct Machine {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) owner: Kind,
    pub(crate) initial_kind: Kind,
    pub(crate) initial: InitialFn,
    pub(crate) hooks: HookTable,
    pub(crate) handlers: HashMap<(Kind, Kind), Handler>,
    pub(crate) config: EngineConfig,
}

impl Machine {
    pub fn builder(registry: Arc<TypeRegistry>) -> MachineBuilder {
        MachineBuilder::new(registry)
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn owner(&self) -> Kind {
        self.owner
    }

    pub fn initial_kind(&self) -> Kind {
        self.initial_kind
    }

    pub fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handler for `input` on a state of kind `state`.
    ///
    /// Walks the state's chain from leaf to root and returns the first
    /// handler found, together with the kind it was registered on.
    pub fn handler_for(&self, state: Kind, input: Kind) -> Option<(Kind, &Handler)> {
        self.registry
            .chain(state)
            .iter()
            .find_map(|kind| self.handlers.get(&(*kind, input)).map(|h| (*kind, h)))
    }

    /// Whether a state of kind `state` accepts inputs of kind `input`.
    pub fn handles(&self, state: Kind, input: Kind) -> bool {
        self.handler_for(state, input).is_some()
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("owner", &self.owner)
            .field("initial", &self.initial_kind)
            .field("hooks", &self.hooks)
            .field("handlers", &self.handlers.len())
            .field("config", &self.config)
            .finish()
    }
}
