//! Engine-side registry of bindings.

use super::binding::{BindingInner, Catcher, FaultObserver, Observers, StateObserver, ValueObserver};
use crate::core::{Kind, StateNode};
use std::any::Any;
use std::cell::RefCell;
use std::error::Error as StdError;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Fans notifications out to every live binding of one engine.
///
/// Only weak references are kept; bindings that were dropped or disposed
/// are pruned on the next notification.
#[derive(Default)]
pub(crate) struct Hub {
    bindings: RefCell<Vec<Weak<BindingInner>>>,
}

impl Hub {
    pub(crate) fn attach(&self, binding: &Rc<BindingInner>) {
        trace!("Binding {} attached", binding.id());
        self.bindings.borrow_mut().push(Rc::downgrade(binding));
    }

    /// Live bindings in attach order. The list is copied out so observers
    /// may attach further bindings while being notified.
    fn live(&self) -> Vec<Rc<BindingInner>> {
        let mut bindings = self.bindings.borrow_mut();
        bindings.retain(|weak| weak.upgrade().is_some_and(|inner| !inner.is_disposed()));
        bindings.iter().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.live().len()
    }

    pub(crate) fn notify_input(&self, kind: Kind, input: &dyn Any) {
        for binding in self.live() {
            binding.notify(inputs, |observers| {
                for (_, observer) in observers.iter_mut().filter(|(k, _)| *k == kind) {
                    observer(input);
                }
            });
        }
    }

    pub(crate) fn notify_output(&self, kind: Kind, output: &dyn Any) {
        for binding in self.live() {
            binding.notify(outputs, |observers| {
                for (_, observer) in observers.iter_mut().filter(|(k, _)| *k == kind) {
                    observer(output);
                }
            });
        }
    }

    /// Notify `when` observers registered on any kind of `chain`.
    pub(crate) fn notify_state(&self, chain: &[Kind], state: &dyn StateNode) {
        for binding in self.live() {
            binding.notify(states, |observers| {
                for (_, observer) in observers.iter_mut().filter(|(k, _)| chain.contains(k)) {
                    observer(state);
                }
            });
        }
    }

    /// Deliver a fault. Returns `false` when no observer received it.
    ///
    /// Levels of the `source()` chain are tried outermost first; every
    /// catcher matching the first level that has any match is called. When
    /// no level matches, `catch_all` observers are called instead.
    pub(crate) fn notify_fault(&self, fault: &(dyn StdError + 'static)) -> bool {
        let bindings = self.live();

        let mut level = Some(fault);
        while let Some(current) = level {
            if bindings.iter().any(|binding| binding.catches(current)) {
                for binding in &bindings {
                    binding.notify(catchers, |catchers| {
                        for catcher in catchers.iter_mut().filter(|c| (c.matches)(current)) {
                            (catcher.observer)(current);
                        }
                    });
                }
                return true;
            }
            level = current.source();
        }

        let mut delivered = false;
        for binding in bindings.iter().filter(|binding| binding.has_fallbacks()) {
            binding.notify(fallbacks, |observers| {
                for observer in observers.iter_mut() {
                    observer(fault);
                }
            });
            delivered = true;
        }
        delivered
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("bindings", &self.bindings.borrow().len())
            .finish()
    }
}

fn inputs(observers: &mut Observers) -> &mut Vec<(Kind, ValueObserver)> {
    &mut observers.inputs
}

fn outputs(observers: &mut Observers) -> &mut Vec<(Kind, ValueObserver)> {
    &mut observers.outputs
}

fn states(observers: &mut Observers) -> &mut Vec<(Kind, StateObserver)> {
    &mut observers.states
}

fn catchers(observers: &mut Observers) -> &mut Vec<Catcher> {
    &mut observers.catchers
}

fn fallbacks(observers: &mut Observers) -> &mut Vec<FaultObserver> {
    &mut observers.fallbacks
}
