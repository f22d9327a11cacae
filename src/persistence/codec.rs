//! Encoding engines into documents and back.

use super::document::Document;
use super::upgrade::UpgradeView;
use crate::core::{Blackboard, Kind, StateNode};
use crate::error::Error;
use crate::registry::{Decoder, KindEntry, Role, TypeRegistry};
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use tracing::debug;

const DEFAULT_UPGRADE_LIMIT: usize = 16;

/// Decoded engine contents, not yet installed anywhere.
#[derive(Debug)]
pub struct Snapshot {
    pub state: Box<dyn StateNode>,
    pub blackboard: Blackboard,
    /// Number of upgrade steps applied to reach a current state kind.
    pub upgrades: usize,
}

/// Converts between live engine contents and [`Document`]s, using a
/// [`TypeRegistry`] for every identifier and serializer lookup.
///
/// Values structurally equal to their kind's reference baseline (the
/// serialized `Default`) are left out of documents.
#[derive(Debug, Clone, Copy)]
pub struct PersistenceCodec<'a> {
    registry: &'a TypeRegistry,
    max_upgrade_steps: usize,
}

impl<'a> PersistenceCodec<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            max_upgrade_steps: DEFAULT_UPGRADE_LIMIT,
        }
    }

    pub fn with_upgrade_limit(mut self, limit: usize) -> Self {
        self.max_upgrade_steps = limit;
        self
    }

    /// Encode the owner kind, the current state and the blackboard.
    ///
    /// The state is written into the blackboard map under its own
    /// identifier when it differs from its baseline.
    pub fn encode(
        &self,
        owner: Kind,
        state: Option<&dyn StateNode>,
        blackboard: &Blackboard,
    ) -> Result<Document, Error> {
        let state = state.ok_or(Error::NotStarted)?;
        let owner = self.entry(owner, |role| role == Role::Owner)?;
        let state_entry = self.entry(state.kind(), |role| role == Role::State)?;

        let mut entries = BTreeMap::new();
        if let Some(value) = diverged(state_entry, state.as_any())? {
            entries.insert(state_entry.id().to_string(), value);
        }
        for (kind, value) in blackboard.iter_erased() {
            let entry = self.entry(kind, |role| role == Role::Data)?;
            if let Some(value) = diverged(entry, value)? {
                entries.insert(entry.id().to_string(), value);
            }
        }

        debug!(
            "Encoded {} in state {} with {} of {} entries diverged",
            owner.id(),
            state_entry.id(),
            entries.len(),
            blackboard.len() + 1
        );
        Ok(Document {
            owner: owner.id().to_string(),
            state: state_entry.id().to_string(),
            blackboard: entries,
        })
    }

    /// Decode a document written for an engine owned by `owner`.
    ///
    /// Every registered entry kind the document leaves out comes back at its
    /// baseline, so a document restores exactly the blackboard it was
    /// encoded from. Outdated states are upgraded until a current kind is
    /// reached; the upgrades see the decoded entries first, `dependencies`
    /// second and the baselines last. Nothing outside the returned snapshot
    /// is touched.
    pub fn decode(
        &self,
        owner: Kind,
        document: &Document,
        dependencies: &Blackboard,
    ) -> Result<Snapshot, Error> {
        let found = self.lookup(&document.owner)?;
        if found != owner {
            return Err(Error::OwnerMismatch {
                expected: self
                    .registry
                    .id_of(owner)
                    .unwrap_or(owner.name())
                    .to_string(),
                found: document.owner.clone(),
            });
        }

        let state_kind = self.lookup(&document.state)?;
        let state_entry = self.known(state_kind)?;
        if !matches!(state_entry.role(), Role::State | Role::Outdated) {
            return Err(Error::malformed(format!(
                "'{}' does not name a state kind",
                document.state
            )));
        }

        let mut blackboard = Blackboard::new();
        let mut state_value = None;
        for (id, value) in &document.blackboard {
            let kind = self.lookup(id)?;
            if kind == state_kind {
                state_value = Some(value);
                continue;
            }
            let entry = self.known(kind)?;
            let decoded = match entry.codec.map(|codec| codec.decode) {
                Some(Decoder::Data(decode)) => decode(value.clone()).map_err(|err| entry_error(id, err))?,
                _ => {
                    return Err(Error::malformed(format!(
                        "'{id}' does not name a blackboard entry kind"
                    )))
                }
            };
            blackboard.insert_erased(kind, decoded)?;
        }

        let mut state = match state_value {
            Some(value) => decode_state(state_entry, value)?,
            None => {
                let factory = state_entry.factory.ok_or(Error::AbstractKind {
                    kind: state_kind.name(),
                })?;
                factory()
            }
        };

        let baselines = self.baselines(&blackboard)?;
        let view = UpgradeView::new(&blackboard, dependencies).with_baselines(&baselines);
        let mut upgrades = 0;
        loop {
            let entry = self.known(state.kind())?;
            let Some((target, upgrade)) = entry.upgrade else {
                break;
            };
            if upgrades == self.max_upgrade_steps {
                return Err(Error::UpgradeLimit {
                    id: entry.id().to_string(),
                    limit: self.max_upgrade_steps,
                });
            }
            state = upgrade(state.into_any(), &view).map_err(|source| Error::Upgrade {
                id: entry.id().to_string(),
                source,
            })?;
            upgrades += 1;
            debug!(
                "Upgraded state {} to {}",
                entry.id(),
                self.registry.id_of(target).unwrap_or(target.name())
            );
        }

        blackboard.absorb(baselines);
        Ok(Snapshot {
            state,
            blackboard,
            upgrades,
        })
    }

    /// Baseline values of every registered entry kind missing from
    /// `decoded`. Encoding omits entries equal to their baseline, so these
    /// stand in for them.
    fn baselines(&self, decoded: &Blackboard) -> Result<Blackboard, Error> {
        let mut baselines = Blackboard::new();
        for kind in self.registry.kinds_with_role(Role::Data) {
            if decoded.contains(kind) {
                continue;
            }
            let entry = self.known(kind)?;
            let (Some(reference), Some(Decoder::Data(decode))) =
                (entry.reference()?, entry.codec.map(|codec| codec.decode))
            else {
                continue;
            };
            let value = decode(reference.clone()).map_err(|err| entry_error(entry.id(), err))?;
            baselines.insert_erased(kind, value)?;
        }
        Ok(baselines)
    }

    fn lookup(&self, id: &str) -> Result<Kind, Error> {
        self.registry
            .kind_of(id)
            .ok_or_else(|| Error::UnknownTypeId { id: id.to_string() })
    }

    fn known(&self, kind: Kind) -> Result<&'a KindEntry, Error> {
        self.registry
            .entry(kind)
            .ok_or(Error::UnregisteredKind { kind: kind.name() })
    }

    /// Registry entry for `kind`, which must have a role accepted by `accept`.
    fn entry(&self, kind: Kind, accept: impl Fn(Role) -> bool) -> Result<&'a KindEntry, Error> {
        self.known(kind)
            .ok()
            .filter(|entry| accept(entry.role()))
            .ok_or(Error::UnregisteredKind { kind: kind.name() })
    }
}

/// Serialized `value`, or `None` when it equals the kind's baseline.
fn diverged(entry: &KindEntry, value: &dyn Any) -> Result<Option<Value>, Error> {
    let codec = entry.codec.ok_or(Error::UnregisteredKind {
        kind: entry.kind().name(),
    })?;
    let value = (codec.encode)(value)?;
    match entry.reference()? {
        Some(reference) if *reference == value => Ok(None),
        _ => Ok(Some(value)),
    }
}

fn decode_state(entry: &KindEntry, value: &Value) -> Result<Box<dyn StateNode>, Error> {
    match entry.codec.map(|codec| codec.decode) {
        Some(Decoder::State(decode)) => decode(value.clone()).map_err(|err| entry_error(entry.id(), err)),
        _ => Err(Error::malformed(format!(
            "'{}' has no state decoder",
            entry.id()
        ))),
    }
}

fn entry_error(id: &str, err: Error) -> Error {
    match err {
        Error::Serialization(err) => Error::malformed(format!("entry '{id}': {err}")),
        other => other,
    }
}
