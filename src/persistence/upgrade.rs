//! Forward migration of states written by older schema versions.

use crate::core::{Blackboard, State};
use crate::error::{Error, Fault};

/// Capability of a retired state kind to convert itself into a newer one.
///
/// Upgrades only run while restoring a document. When `Next` is itself
/// outdated, the codec keeps upgrading until it reaches a current kind.
///
/// # Example
///
/// ```rust
/// use strata::core::State;
/// use strata::error::Fault;
/// use strata::persistence::{Outdated, UpgradeView};
///
/// #[derive(Debug, Default)]
/// struct HeatingV1 {
///     celsius: i32,
/// }
///
/// #[derive(Debug, Default)]
/// struct Heating {
///     target_millis: i64,
/// }
///
/// impl State for HeatingV1 {}
/// impl State for Heating {}
///
/// impl Outdated for HeatingV1 {
///     type Next = Heating;
///
///     fn upgrade(self, _view: &UpgradeView<'_>) -> Result<Heating, Fault> {
///         Ok(Heating {
///             target_millis: i64::from(self.celsius) * 1000,
///         })
///     }
/// }
/// ```
pub trait Outdated: State + Sized {
    type Next: State;

    fn upgrade(self, view: &UpgradeView<'_>) -> Result<Self::Next, Fault>;
}

/// Read-only view handed to upgrades: the entries written in the document,
/// then dependencies supplied by the caller, then the baselines of entries
/// the document left out.
pub struct UpgradeView<'a> {
    restored: &'a Blackboard,
    extra: &'a Blackboard,
    baselines: Option<&'a Blackboard>,
}

impl<'a> UpgradeView<'a> {
    pub fn new(restored: &'a Blackboard, extra: &'a Blackboard) -> Self {
        Self {
            restored,
            extra,
            baselines: None,
        }
    }

    pub(crate) fn with_baselines(mut self, baselines: &'a Blackboard) -> Self {
        self.baselines = Some(baselines);
        self
    }

    /// Entry for `T`, looked up in the restored blackboard first.
    pub fn get<T: 'static>(&self) -> Result<&T, Error> {
        self.restored
            .get::<T>()
            .or_else(|_| self.extra.get::<T>())
            .or_else(|err| match self.baselines {
                Some(baselines) => baselines.get::<T>(),
                None => Err(err),
            })
    }

    pub fn has<T: 'static>(&self) -> bool {
        self.restored.has::<T>()
            || self.extra.has::<T>()
            || self.baselines.is_some_and(|baselines| baselines.has::<T>())
    }
}
