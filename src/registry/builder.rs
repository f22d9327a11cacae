//! Builder for type registries.

use super::issues::RegistryIssue;
use super::{Codec, Decoder, KindEntry, Role, TypeRegistry, UpgradeFn};
use crate::builder::BuildError;
use crate::core::{Kind, State, StateNode};
use crate::error::{Error, Fault};
use crate::persistence::{Outdated, UpgradeView};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Fluent builder for a [`TypeRegistry`].
///
/// Registration never fails on its own; [`build`](Self::build) validates the
/// complete table and reports every issue it finds at once.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<KindEntry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the root of the state hierarchy.
    pub fn root<K: 'static>(self, id: impl Into<String>) -> Self {
        self.push(Kind::of::<K>(), id.into(), Role::Abstract, None)
    }

    /// Register an abstract kind below `P`.
    pub fn abstract_kind<K: 'static, P: 'static>(self, id: impl Into<String>) -> Self {
        self.push(
            Kind::of::<K>(),
            id.into(),
            Role::Abstract,
            Some(Kind::of::<P>()),
        )
    }

    /// Register a concrete state below `P`.
    ///
    /// `Default` serves both as the zero-argument factory and as the
    /// reference baseline used to omit unchanged state from documents.
    pub fn state<S, P>(self, id: impl Into<String>) -> Self
    where
        S: State + Default + Serialize + DeserializeOwned,
        P: 'static,
    {
        let mut builder = self.push(
            Kind::of::<S>(),
            id.into(),
            Role::State,
            Some(Kind::of::<P>()),
        );
        if let Some(entry) = builder.entries.last_mut() {
            entry.factory = Some(make::<S>);
            entry.codec = Some(state_codec::<S>());
        }
        builder
    }

    /// Register a retired state kind below `P` that upgrades itself through
    /// [`Outdated`] when restored.
    pub fn outdated_state<S, P>(self, id: impl Into<String>) -> Self
    where
        S: Outdated + Default + Serialize + DeserializeOwned,
        P: 'static,
    {
        let mut builder = self.push(
            Kind::of::<S>(),
            id.into(),
            Role::Outdated,
            Some(Kind::of::<P>()),
        );
        if let Some(entry) = builder.entries.last_mut() {
            entry.factory = Some(make::<S>);
            entry.codec = Some(state_codec::<S>());
            entry.upgrade = Some((Kind::of::<S::Next>(), upgrade::<S> as UpgradeFn));
        }
        builder
    }

    /// Register a blackboard entry kind.
    pub fn data<T>(self, id: impl Into<String>) -> Self
    where
        T: Default + Serialize + DeserializeOwned + 'static,
    {
        let mut builder = self.push(Kind::of::<T>(), id.into(), Role::Data, None);
        if let Some(entry) = builder.entries.last_mut() {
            entry.codec = Some(Codec {
                encode: encode::<T>,
                decode: Decoder::Data(decode_data::<T>),
                baseline: Some(baseline::<T>),
            });
        }
        builder
    }

    /// Register an engine owner kind.
    pub fn owner<O: 'static>(self, id: impl Into<String>) -> Self {
        self.push(Kind::of::<O>(), id.into(), Role::Owner, None)
    }

    /// Validate and freeze the table.
    pub fn build(self) -> Result<TypeRegistry, BuildError> {
        if let Validation::Failure(issues) = validate(&self.entries) {
            return Err(BuildError::Registry {
                issues: issues.iter().cloned().collect(),
            });
        }

        let parents: HashMap<Kind, Option<Kind>> = self
            .entries
            .iter()
            .map(|entry| (entry.kind, entry.parent))
            .collect();

        let mut chains = HashMap::new();
        let mut root = None;
        for entry in self.entries.iter().filter(|e| e.role.in_hierarchy()) {
            let mut chain = vec![entry.kind];
            let mut cursor = entry.parent;
            while let Some(parent) = cursor {
                chain.push(parent);
                cursor = parents.get(&parent).copied().flatten();
            }
            if entry.parent.is_none() {
                root = Some(entry.kind);
            }
            chains.insert(entry.kind, chain);
        }
        let root = root.ok_or(BuildError::Registry {
            issues: vec![RegistryIssue::MissingRoot],
        })?;

        let by_id = self
            .entries
            .iter()
            .map(|entry| (entry.id.clone(), entry.kind))
            .collect();
        let entries = self
            .entries
            .into_iter()
            .map(|entry| (entry.kind, entry))
            .collect();

        Ok(TypeRegistry {
            entries,
            by_id,
            chains,
            root,
        })
    }

    fn push(mut self, kind: Kind, id: String, role: Role, parent: Option<Kind>) -> Self {
        self.entries.push(KindEntry {
            kind,
            id,
            role,
            parent,
            codec: None,
            factory: None,
            upgrade: None,
            reference: OnceLock::new(),
        });
        self
    }
}

/// Check the whole table, accumulating every issue.
fn validate(entries: &[KindEntry]) -> Validation<(), NonEmptyVec<RegistryIssue>> {
    let mut checks: Vec<Validation<(), NonEmptyVec<RegistryIssue>>> = Vec::new();
    let roles: HashMap<Kind, Role> = entries.iter().map(|e| (e.kind, e.role)).collect();
    let parents: HashMap<Kind, Option<Kind>> = entries.iter().map(|e| (e.kind, e.parent)).collect();

    let mut seen_ids = HashSet::new();
    let mut seen_kinds = HashSet::new();
    for entry in entries {
        if !seen_ids.insert(entry.id.as_str()) {
            checks.push(Validation::fail(RegistryIssue::DuplicateId {
                id: entry.id.clone(),
            }));
        }
        if !seen_kinds.insert(entry.kind) {
            checks.push(Validation::fail(RegistryIssue::DuplicateKind {
                kind: entry.kind.name(),
            }));
        }
    }

    let roots: Vec<&'static str> = entries
        .iter()
        .filter(|e| e.role.in_hierarchy() && e.parent.is_none())
        .map(|e| e.kind.name())
        .collect();
    match roots.len() {
        0 => checks.push(Validation::fail(RegistryIssue::MissingRoot)),
        1 => {}
        _ => checks.push(Validation::fail(RegistryIssue::MultipleRoots { roots })),
    }

    for entry in entries {
        let Some(parent) = entry.parent else {
            continue;
        };
        match roles.get(&parent) {
            None => checks.push(Validation::fail(RegistryIssue::UnknownParent {
                kind: entry.kind.name(),
                parent: parent.name(),
            })),
            Some(Role::Abstract | Role::State) => {}
            Some(_) => checks.push(Validation::fail(RegistryIssue::InvalidParent {
                kind: entry.kind.name(),
                parent: parent.name(),
            })),
        }

        if in_cycle(entry.kind, &parents) {
            checks.push(Validation::fail(RegistryIssue::Cycle {
                kind: entry.kind.name(),
            }));
        }
    }

    for entry in entries {
        if let Some((target, _)) = entry.upgrade {
            if !matches!(roles.get(&target), Some(Role::State | Role::Outdated)) {
                checks.push(Validation::fail(RegistryIssue::UnknownUpgradeTarget {
                    kind: entry.kind.name(),
                    target: target.name(),
                }));
            }
        }
    }

    Validation::all_vec(checks).map(|_| ())
}

fn in_cycle(start: Kind, parents: &HashMap<Kind, Option<Kind>>) -> bool {
    let mut cursor = parents.get(&start).copied().flatten();
    let mut steps = 0;
    while let Some(kind) = cursor {
        if kind == start || steps > parents.len() {
            return true;
        }
        cursor = parents.get(&kind).copied().flatten();
        steps += 1;
    }
    false
}

fn make<S: State + Default>() -> Box<dyn StateNode> {
    Box::new(S::default())
}

fn state_codec<S>() -> Codec
where
    S: State + Default + Serialize + DeserializeOwned,
{
    Codec {
        encode: encode::<S>,
        decode: Decoder::State(decode_state::<S>),
        baseline: Some(baseline::<S>),
    }
}

fn encode<T: Serialize + 'static>(value: &dyn Any) -> Result<Value, Error> {
    let value = value
        .downcast_ref::<T>()
        .ok_or(Error::UnregisteredKind {
            kind: std::any::type_name::<T>(),
        })?;
    Ok(serde_json::to_value(value)?)
}

fn baseline<T: Default + Serialize>() -> Result<Value, Error> {
    Ok(serde_json::to_value(T::default())?)
}

fn decode_state<S: State + DeserializeOwned>(value: Value) -> Result<Box<dyn StateNode>, Error> {
    Ok(Box::new(serde_json::from_value::<S>(value)?))
}

fn decode_data<T: DeserializeOwned + 'static>(value: Value) -> Result<Box<dyn Any>, Error> {
    Ok(Box::new(serde_json::from_value::<T>(value)?))
}

fn upgrade<S: Outdated>(
    old: Box<dyn Any>,
    view: &UpgradeView<'_>,
) -> Result<Box<dyn StateNode>, Fault> {
    let old = old
        .downcast::<S>()
        .map_err(|_| format!("value is not a {}", std::any::type_name::<S>()))?;
    Ok(Box::new((*old).upgrade(view)?))
}
