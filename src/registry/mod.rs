//! Type registry: the table mapping kinds to identifiers, parents,
//! factories and serializers.
//!
//! The runtime never discovers types on its own. Every lookup it performs
//! (identifier of a kind, kind of an identifier, ancestor chain, factory,
//! codec) is a table lookup against a [`TypeRegistry`] built up front with
//! [`RegistryBuilder`] and passed in as a dependency.
//!
//! # Example
//!
//! ```rust
//! use strata::abstract_kinds;
//! use strata::core::{Kind, State};
//! use strata::registry::TypeRegistry;
//! use serde::{Deserialize, Serialize};
//!
//! abstract_kinds! {
//!     pub struct Root;
//!     pub struct Powered;
//! }
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Idle;
//! impl State for Idle {}
//!
//! let registry = TypeRegistry::builder()
//!     .root::<Root>("root")
//!     .abstract_kind::<Powered, Root>("powered")
//!     .state::<Idle, Powered>("idle")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(registry.id_of(Kind::of::<Idle>()), Some("idle"));
//! assert_eq!(
//!     registry.chain(Kind::of::<Idle>()),
//!     &[Kind::of::<Idle>(), Kind::of::<Powered>(), Kind::of::<Root>()]
//! );
//! ```

mod builder;
mod issues;

pub use builder::RegistryBuilder;
pub use issues::RegistryIssue;

use crate::core::{Kind, StateNode};
use crate::error::{Error, Fault};
use crate::persistence::UpgradeView;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// What a registered kind is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Part of the hierarchy, never instantiated.
    Abstract,
    /// Concrete state that can become current.
    State,
    /// Retired state kind, only ever restored from a document and upgraded.
    Outdated,
    /// Blackboard entry kind.
    Data,
    /// Engine owner kind, written as the document's `$type`.
    Owner,
}

impl Role {
    /// Whether kinds with this role belong to the state hierarchy.
    pub fn in_hierarchy(self) -> bool {
        matches!(self, Self::Abstract | Self::State | Self::Outdated)
    }
}

pub(crate) type EncodeFn = fn(&dyn Any) -> Result<Value, Error>;
pub(crate) type BaselineFn = fn() -> Result<Value, Error>;
pub(crate) type FactoryFn = fn() -> Box<dyn StateNode>;
pub(crate) type UpgradeFn =
    for<'a, 'b> fn(Box<dyn Any>, &'a UpgradeView<'b>) -> Result<Box<dyn StateNode>, Fault>;

#[derive(Clone, Copy)]
pub(crate) enum Decoder {
    State(fn(Value) -> Result<Box<dyn StateNode>, Error>),
    Data(fn(Value) -> Result<Box<dyn Any>, Error>),
}

#[derive(Clone, Copy)]
pub(crate) struct Codec {
    pub(crate) encode: EncodeFn,
    pub(crate) decode: Decoder,
    pub(crate) baseline: Option<BaselineFn>,
}

/// Everything the registry knows about one kind.
pub struct KindEntry {
    pub(crate) kind: Kind,
    pub(crate) id: String,
    pub(crate) role: Role,
    pub(crate) parent: Option<Kind>,
    pub(crate) codec: Option<Codec>,
    pub(crate) factory: Option<FactoryFn>,
    pub(crate) upgrade: Option<(Kind, UpgradeFn)>,
    pub(crate) reference: OnceLock<Value>,
}

impl KindEntry {
    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn parent(&self) -> Option<Kind> {
        self.parent
    }

    /// Whether the kind has a zero-argument factory.
    pub fn is_concrete(&self) -> bool {
        self.factory.is_some()
    }

    pub fn is_persisted(&self) -> bool {
        self.codec.is_some()
    }

    /// Kind an outdated state upgrades into.
    pub fn upgrades_to(&self) -> Option<Kind> {
        self.upgrade.map(|(target, _)| target)
    }

    /// Serialized reference baseline, constructed on first use and never
    /// mutated afterwards.
    pub(crate) fn reference(&self) -> Result<Option<&Value>, Error> {
        if let Some(value) = self.reference.get() {
            return Ok(Some(value));
        }
        let Some(baseline) = self.codec.and_then(|codec| codec.baseline) else {
            return Ok(None);
        };
        let value = baseline()?;
        Ok(Some(self.reference.get_or_init(|| value)))
    }
}

impl fmt::Debug for KindEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindEntry")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("role", &self.role)
            .field("parent", &self.parent)
            .field("persisted", &self.codec.is_some())
            .finish()
    }
}

/// Validated, immutable kind table.
///
/// Build it once with [`TypeRegistry::builder`] and share it behind an `Arc`.
pub struct TypeRegistry {
    entries: HashMap<Kind, KindEntry>,
    by_id: HashMap<String, Kind>,
    chains: HashMap<Kind, Vec<Kind>>,
    root: Kind,
}

impl TypeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Root of the state hierarchy.
    pub fn root(&self) -> Kind {
        self.root
    }

    pub fn entry(&self, kind: Kind) -> Option<&KindEntry> {
        self.entries.get(&kind)
    }

    pub fn contains(&self, kind: Kind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn id_of(&self, kind: Kind) -> Option<&str> {
        self.entries.get(&kind).map(|entry| entry.id.as_str())
    }

    pub fn kind_of(&self, id: &str) -> Option<Kind> {
        self.by_id.get(id).copied()
    }

    /// Ancestor chain of a hierarchy kind, from the kind itself up to the
    /// root. Empty for kinds outside the hierarchy.
    pub fn chain(&self, kind: Kind) -> &[Kind] {
        self.chains.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `kind` is `ancestor` or descends from it.
    pub fn is_a(&self, kind: Kind, ancestor: Kind) -> bool {
        self.chain(kind).contains(&ancestor)
    }

    pub fn is_abstract(&self, kind: Kind) -> bool {
        self.entries
            .get(&kind)
            .is_some_and(|entry| entry.role == Role::Abstract)
    }

    /// Build a fresh instance of a concrete state kind with its factory.
    pub fn instantiate(&self, kind: Kind) -> Result<Box<dyn StateNode>, Error> {
        let entry = self
            .entries
            .get(&kind)
            .ok_or(Error::UnregisteredKind { kind: kind.name() })?;
        match (entry.role, entry.factory) {
            (Role::State, Some(factory)) => Ok(factory()),
            (Role::Outdated, _) => Err(Error::OutdatedKind { kind: kind.name() }),
            (Role::Abstract, _) => Err(Error::AbstractKind { kind: kind.name() }),
            _ => Err(Error::UnregisteredKind { kind: kind.name() }),
        }
    }

    /// Registered kinds with the given role, in no particular order.
    pub fn kinds_with_role(&self, role: Role) -> impl Iterator<Item = Kind> + '_ {
        self.entries
            .values()
            .filter(move |entry| entry.role == role)
            .map(|entry| entry.kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("root", &self.root)
            .field("kinds", &self.entries.len())
            .finish()
    }
}
