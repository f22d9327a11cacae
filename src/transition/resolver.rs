//! Hook sequencing between two state instances.
//!
//! Given the kind chains of the departing and arriving instances, the
//! resolver finds their closest shared ancestor and lays out the hooks to
//! run: exits below the shared ancestor (leaf to root), enters below it
//! (root to leaf), attaches for the arriving instance, the commit point, and
//! detaches for the departing instance. Kinds at or above the shared ancestor
//! are neither exited nor re-entered.

use crate::core::Kind;
use crate::registry::TypeRegistry;

/// One hook invocation (or the commit point) in a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Exit(Kind),
    Enter(Kind),
    Attach(Kind),
    /// The arriving instance becomes current.
    Commit,
    Detach(Kind),
}

/// Ordered hook sequence for one transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    from: Option<Kind>,
    to: Kind,
    shared: Option<Kind>,
    steps: Vec<Step>,
}

impl Plan {
    pub fn from(&self) -> Option<Kind> {
        self.from
    }

    pub fn to(&self) -> Kind {
        self.to
    }

    /// Closest kind present in both chains; `None` on initial start.
    pub fn shared(&self) -> Option<Kind> {
        self.shared
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn exits(&self) -> impl Iterator<Item = Kind> + '_ {
        self.steps.iter().filter_map(|step| match step {
            Step::Exit(kind) => Some(*kind),
            _ => None,
        })
    }

    pub fn enters(&self) -> impl Iterator<Item = Kind> + '_ {
        self.steps.iter().filter_map(|step| match step {
            Step::Enter(kind) => Some(*kind),
            _ => None,
        })
    }

    /// Drop the enter phase (used for starts configured without enter hooks).
    pub fn without_enters(mut self) -> Self {
        self.steps.retain(|step| !matches!(step, Step::Enter(_)));
        self
    }
}

/// Closest kind of `next` (leaf-to-root) that also appears in `prev`.
pub fn shared_ancestor(prev: &[Kind], next: &[Kind]) -> Option<Kind> {
    next.iter().copied().find(|kind| prev.contains(kind))
}

/// Plan the move between two leaf-to-root kind chains. An empty `prev`
/// chain is the initial start: every kind of `next` is entered.
pub fn plan_chains(prev: &[Kind], next: &[Kind]) -> Plan {
    let shared = shared_ancestor(prev, next);
    let below_shared = |kind: &&Kind| Some(**kind) != shared;

    let mut steps = Vec::with_capacity(prev.len() * 2 + next.len() * 2 + 1);
    steps.extend(prev.iter().take_while(below_shared).map(|k| Step::Exit(*k)));

    let entered: Vec<Kind> = next.iter().take_while(below_shared).copied().collect();
    steps.extend(entered.iter().rev().map(|k| Step::Enter(*k)));

    steps.extend(next.iter().rev().map(|k| Step::Attach(*k)));
    steps.push(Step::Commit);
    steps.extend(prev.iter().rev().map(|k| Step::Detach(*k)));

    Plan {
        from: prev.first().copied(),
        to: next.first().copied().unwrap_or_else(Kind::of::<()>),
        shared,
        steps,
    }
}

/// Plan the move from an instance of kind `from` (or from nothing) to an
/// instance of kind `to`, using the registry's ancestor chains.
pub fn plan(registry: &TypeRegistry, from: Option<Kind>, to: Kind) -> Plan {
    let prev = from.map(|kind| registry.chain(kind)).unwrap_or(&[]);
    let mut plan = plan_chains(prev, registry.chain(to));
    plan.from = from;
    plan.to = to;
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Root;
    struct Powered;
    struct Off;
    struct Idle;
    struct Heating;

    fn k<T: 'static>() -> Kind {
        Kind::of::<T>()
    }

    fn off() -> Vec<Kind> {
        vec![k::<Off>(), k::<Root>()]
    }

    fn idle() -> Vec<Kind> {
        vec![k::<Idle>(), k::<Powered>(), k::<Root>()]
    }

    fn heating() -> Vec<Kind> {
        vec![k::<Heating>(), k::<Powered>(), k::<Root>()]
    }

    #[test]
    fn shared_ancestor_is_closest_common_kind() {
        assert_eq!(shared_ancestor(&idle(), &heating()), Some(k::<Powered>()));
        assert_eq!(shared_ancestor(&off(), &heating()), Some(k::<Root>()));
        assert_eq!(shared_ancestor(&idle(), &idle()), Some(k::<Idle>()));
        assert_eq!(shared_ancestor(&[], &idle()), None);
    }

    #[test]
    fn sibling_transition_skips_shared_ancestor() {
        let plan = plan_chains(&idle(), &heating());
        assert_eq!(
            plan.steps(),
            &[
                Step::Exit(k::<Idle>()),
                Step::Enter(k::<Heating>()),
                Step::Attach(k::<Root>()),
                Step::Attach(k::<Powered>()),
                Step::Attach(k::<Heating>()),
                Step::Commit,
                Step::Detach(k::<Root>()),
                Step::Detach(k::<Powered>()),
                Step::Detach(k::<Idle>()),
            ]
        );
    }

    #[test]
    fn crossing_subtrees_exits_leaf_first_and_enters_root_first() {
        let plan = plan_chains(&heating(), &off());
        assert_eq!(plan.exits().collect::<Vec<_>>(), vec![k::<Heating>(), k::<Powered>()]);
        assert_eq!(plan.enters().collect::<Vec<_>>(), vec![k::<Off>()]);

        let plan = plan_chains(&off(), &heating());
        assert_eq!(plan.exits().collect::<Vec<_>>(), vec![k::<Off>()]);
        assert_eq!(plan.enters().collect::<Vec<_>>(), vec![k::<Powered>(), k::<Heating>()]);
        assert_eq!(plan.shared(), Some(k::<Root>()));
    }

    #[test]
    fn self_transition_only_swaps_instances() {
        let plan = plan_chains(&idle(), &idle());
        assert_eq!(plan.exits().count(), 0);
        assert_eq!(plan.enters().count(), 0);
        assert!(plan.steps().contains(&Step::Commit));
        assert!(plan.steps().contains(&Step::Attach(k::<Idle>())));
        assert!(plan.steps().contains(&Step::Detach(k::<Idle>())));
    }

    #[test]
    fn initial_start_enters_whole_chain() {
        let plan = plan_chains(&[], &heating());
        assert_eq!(plan.shared(), None);
        assert_eq!(
            plan.enters().collect::<Vec<_>>(),
            vec![k::<Root>(), k::<Powered>(), k::<Heating>()]
        );
        assert!(!plan.steps().iter().any(|s| matches!(s, Step::Detach(_))));
        assert_eq!(plan.steps().last(), Some(&Step::Commit));
    }

    #[test]
    fn without_enters_keeps_attach_and_commit() {
        let plan = plan_chains(&[], &off()).without_enters();
        assert_eq!(
            plan.steps(),
            &[Step::Attach(k::<Root>()), Step::Attach(k::<Off>()), Step::Commit]
        );
    }
}
