//! Type-keyed singleton data table shared by the engine and its states.
//!
//! Every entry is keyed by the *declared* type it was stored under, never by
//! a runtime subtype: storing a `Box<dyn Pet>` and a `Dog` creates two
//! independent entries.

use super::kind::Kind;
use crate::error::Error;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Table holding at most one value per kind.
///
/// # Example
///
/// ```rust
/// use strata::core::Blackboard;
///
/// #[derive(Debug, PartialEq)]
/// struct Temperature(i32);
///
/// let mut board = Blackboard::new();
/// board.set(Temperature(20)).unwrap();
/// assert!(board.set(Temperature(21)).is_err());
///
/// board.overwrite(Temperature(22));
/// assert_eq!(board.get::<Temperature>().unwrap(), &Temperature(22));
/// ```
#[derive(Default)]
pub struct Blackboard {
    entries: HashMap<Kind, Box<dyn Any>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `T`, failing with [`Error::DuplicateEntry`] if an
    /// entry for `T` already exists.
    pub fn set<T: 'static>(&mut self, value: T) -> Result<(), Error> {
        let kind = Kind::of::<T>();
        if self.entries.contains_key(&kind) {
            return Err(Error::DuplicateEntry { kind: kind.name() });
        }
        self.entries.insert(kind, Box::new(value));
        Ok(())
    }

    /// Store `value` under `T`, replacing any prior entry.
    pub fn overwrite<T: 'static>(&mut self, value: T) {
        self.entries.insert(Kind::of::<T>(), Box::new(value));
    }

    pub fn get<T: 'static>(&self) -> Result<&T, Error> {
        self.entries
            .get(&Kind::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .ok_or(Error::MissingEntry {
                kind: Kind::of::<T>().name(),
            })
    }

    pub fn get_mut<T: 'static>(&mut self) -> Result<&mut T, Error> {
        self.entries
            .get_mut(&Kind::of::<T>())
            .and_then(|value| value.downcast_mut::<T>())
            .ok_or(Error::MissingEntry {
                kind: Kind::of::<T>().name(),
            })
    }

    pub fn has<T: 'static>(&self) -> bool {
        self.entries.contains_key(&Kind::of::<T>())
    }

    /// Remove and return the entry for `T`, if any.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.entries
            .remove(&Kind::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kinds currently stored, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = Kind> + '_ {
        self.entries.keys().copied()
    }

    pub(crate) fn insert_erased(&mut self, kind: Kind, value: Box<dyn Any>) -> Result<(), Error> {
        if self.entries.contains_key(&kind) {
            return Err(Error::DuplicateEntry { kind: kind.name() });
        }
        self.entries.insert(kind, value);
        Ok(())
    }

    pub(crate) fn contains(&self, kind: Kind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Move in every entry of `other` whose kind is not stored yet.
    pub(crate) fn absorb(&mut self, other: Blackboard) {
        for (kind, value) in other.entries {
            self.entries.entry(kind).or_insert(value);
        }
    }

    pub(crate) fn iter_erased(&self) -> impl Iterator<Item = (Kind, &dyn Any)> + '_ {
        self.entries.iter().map(|(kind, value)| (*kind, &**value))
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
