//! Strata: a hierarchical state machine runtime
//!
//! States are plain Rust types arranged in a single-rooted hierarchy of
//! kinds. An [`Engine`] owns the current state instance, a typed
//! [`Blackboard`] and a FIFO input queue; input handlers return
//! [`Transition`] descriptors that the engine carries out by running the
//! exit, enter, attach and detach hooks the hierarchy calls for. Observers
//! attach through disposable [`Binding`]s, and engines persist to JSON
//! documents that only carry values differing from their defaults.
//!
//! # Core Concepts
//!
//! - **Registry**: every kind, its identifier, parent and serializer, built
//!   once with [`TypeRegistry::builder`]
//! - **Machine**: hooks, handlers and the initial state, shared by engines
//! - **Engine**: the running instance; single-threaded and reentrant only
//!   through its input queue
//! - **Persistence**: [`Document`]s with versioned state upgrades
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use strata::{abstract_kinds, Engine, Machine, State, Transition, TypeRegistry};
//!
//! abstract_kinds! {
//!     pub struct Root;
//! }
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Off;
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct On;
//! impl State for Off {}
//! impl State for On {}
//!
//! struct Toggle;
//! struct Switch;
//!
//! #[derive(Debug, PartialEq)]
//! struct StatusChanged {
//!     is_on: bool,
//! }
//!
//! let registry = TypeRegistry::builder()
//!     .root::<Root>("root")
//!     .state::<Off, Root>("off")
//!     .state::<On, Root>("on")
//!     .owner::<Switch>("switch")
//!     .build()
//!     .unwrap();
//!
//! let machine = Machine::builder(Arc::new(registry))
//!     .owner::<Switch>()
//!     .initial::<Off>()
//!     .on_enter::<On, _>(|ctx| {
//!         ctx.output(StatusChanged { is_on: true });
//!         Ok(())
//!     })
//!     .on_enter::<Off, _>(|ctx| {
//!         ctx.output(StatusChanged { is_on: false });
//!         Ok(())
//!     })
//!     .on::<Off, Toggle, _>(|_, _| Ok(Transition::to::<On>()))
//!     .on::<On, Toggle, _>(|_, _| Ok(Transition::to::<Off>()))
//!     .config(strata::EngineConfig {
//!         enter_on_start: false,
//!         ..Default::default()
//!     })
//!     .build()
//!     .unwrap();
//!
//! let mut engine = Engine::new(Arc::new(machine));
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let _binding = engine
//!     .bind()
//!     .handle(move |status: &StatusChanged| sink.borrow_mut().push(status.is_on));
//!
//! engine.input(Toggle);
//! engine.input(Toggle);
//!
//! assert_eq!(*seen.borrow(), vec![true, false]);
//! assert!(engine.current_as::<Off>().is_some());
//! ```

pub mod binding;
pub mod builder;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod registry;
pub mod transition;

// Re-export commonly used types
pub use binding::Binding;
pub use builder::{BuildError, MachineBuilder};
pub use config::EngineConfig;
pub use core::{Blackboard, Kind, State, StateNode};
pub use engine::{Context, Engine, InputSink, Machine};
pub use error::{Error, Fault};
pub use persistence::{Document, Outdated, PersistenceCodec, UpgradeView};
pub use registry::{Role, TypeRegistry};
pub use transition::Transition;
