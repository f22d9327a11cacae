//! Lifecycle hook registration table.

use super::kind::Kind;
use crate::engine::Context;
use crate::error::Fault;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A lifecycle callback. It receives the instance it runs on through the
/// [`Context`].
pub type Hook = Arc<dyn Fn(&mut Context<'_>) -> Result<(), Fault> + Send + Sync>;

/// Lifecycle categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Runs when the hierarchy is entered at this kind.
    Enter,
    /// Runs when the hierarchy is left at this kind.
    Exit,
    /// Runs once per instance, when it becomes current.
    Attach,
    /// Runs once per instance, after it stopped being current.
    Detach,
}

/// Hooks keyed by `(kind, category)`, kept in registration order.
#[derive(Clone, Default)]
pub struct HookTable {
    hooks: HashMap<(Kind, HookKind), Vec<Hook>>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: Kind, category: HookKind, hook: Hook) {
        self.hooks.entry((kind, category)).or_default().push(hook);
    }

    pub fn hooks(&self, kind: Kind, category: HookKind) -> &[Hook] {
        self.hooks
            .get(&(kind, category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every kind that has at least one hook registered.
    pub fn kinds(&self) -> impl Iterator<Item = Kind> + '_ {
        self.hooks.keys().map(|(kind, _)| *kind)
    }
}

impl fmt::Debug for HookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for ((kind, category), hooks) in &self.hooks {
            map.entry(&(kind, category), &hooks.len());
        }
        map.finish()
    }
}
