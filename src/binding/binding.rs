//! Observer sets with their own lifecycle.

use crate::core::{Kind, StateNode};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::error::Error as StdError;
use std::fmt;
use std::mem;
use std::rc::Rc;
use tracing::debug;
use uuid::Uuid;

pub(crate) type ValueObserver = Box<dyn FnMut(&dyn Any)>;
pub(crate) type StateObserver = Box<dyn FnMut(&dyn StateNode)>;
pub(crate) type FaultObserver = Box<dyn FnMut(&(dyn StdError + 'static))>;

pub(crate) struct Catcher {
    pub(crate) matches: fn(&(dyn StdError + 'static)) -> bool,
    pub(crate) observer: FaultObserver,
}

#[derive(Default)]
pub(crate) struct Observers {
    pub(crate) inputs: Vec<(Kind, ValueObserver)>,
    pub(crate) outputs: Vec<(Kind, ValueObserver)>,
    pub(crate) states: Vec<(Kind, StateObserver)>,
    pub(crate) catchers: Vec<Catcher>,
    pub(crate) fallbacks: Vec<FaultObserver>,
}

impl Observers {
    fn len(&self) -> usize {
        self.inputs.len()
            + self.outputs.len()
            + self.states.len()
            + self.catchers.len()
            + self.fallbacks.len()
    }
}

pub(crate) struct BindingInner {
    id: Uuid,
    disposed: Cell<bool>,
    observers: RefCell<Observers>,
}

impl BindingInner {
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Run `notify` over one observer list.
    ///
    /// The list is moved out while observers run, so an observer may dispose
    /// this binding without tripping over the borrow. Observers added in the
    /// meantime are kept after the existing ones.
    pub(crate) fn notify<T>(
        &self,
        select: fn(&mut Observers) -> &mut Vec<T>,
        notify: impl FnOnce(&mut Vec<T>),
    ) {
        if self.disposed.get() {
            return;
        }
        let mut taken = match self.observers.try_borrow_mut() {
            Ok(mut observers) => mem::take(select(&mut observers)),
            Err(_) => return,
        };
        notify(&mut taken);
        if self.disposed.get() {
            return;
        }
        if let Ok(mut observers) = self.observers.try_borrow_mut() {
            let slot = select(&mut observers);
            taken.append(slot);
            *slot = taken;
        }
    }

    /// Whether any catcher of this binding matches `fault`.
    pub(crate) fn catches(&self, fault: &(dyn StdError + 'static)) -> bool {
        if self.disposed.get() {
            return false;
        }
        self.observers
            .try_borrow()
            .map(|observers| observers.catchers.iter().any(|c| (c.matches)(fault)))
            .unwrap_or(false)
    }

    pub(crate) fn has_fallbacks(&self) -> bool {
        !self.disposed.get()
            && self
                .observers
                .try_borrow()
                .map(|observers| !observers.fallbacks.is_empty())
                .unwrap_or(false)
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let released = match self.observers.try_borrow_mut() {
            Ok(mut observers) => mem::take(&mut *observers),
            Err(_) => Observers::default(),
        };
        debug!("Binding {} disposed, released {} observers", self.id, released.len());
    }
}

/// A detachable set of observers on one engine.
///
/// Obtained from [`Engine::bind`](crate::engine::Engine::bind). The engine
/// only holds a weak reference to the observers, and the binding holds no
/// reference to the engine, so neither keeps the other alive. Dropping the
/// binding disposes it.
///
/// # Example
///
/// ```ignore
/// let binding = engine
///     .bind()
///     .handle(|status: &StatusChanged| println!("on: {}", status.is_on))
///     .when::<Powered, _>(|state| println!("powered: {state:?}"))
///     .catch(|err: &std::io::Error| eprintln!("io: {err}"));
/// ```
pub struct Binding {
    inner: Rc<BindingInner>,
}

impl Binding {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(BindingInner {
                id: Uuid::new_v4(),
                disposed: Cell::new(false),
                observers: RefCell::new(Observers::default()),
            }),
        }
    }

    pub(crate) fn inner(&self) -> &Rc<BindingInner> {
        &self.inner
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Observe inputs of kind `I` as they are taken off the queue.
    pub fn watch<I, F>(self, mut observer: F) -> Self
    where
        I: 'static,
        F: FnMut(&I) + 'static,
    {
        let erased: ValueObserver = Box::new(move |value: &dyn Any| {
            if let Some(input) = value.downcast_ref::<I>() {
                observer(input);
            }
        });
        self.register(|observers| observers.inputs.push((Kind::of::<I>(), erased)));
        self
    }

    /// Observe outputs of kind `O` as handlers and hooks produce them.
    pub fn handle<O, F>(self, mut observer: F) -> Self
    where
        O: 'static,
        F: FnMut(&O) + 'static,
    {
        let erased: ValueObserver = Box::new(move |value: &dyn Any| {
            if let Some(output) = value.downcast_ref::<O>() {
                observer(output);
            }
        });
        self.register(|observers| observers.outputs.push((Kind::of::<O>(), erased)));
        self
    }

    /// Observe transitions into any state whose chain includes `K`.
    pub fn when<K, F>(self, observer: F) -> Self
    where
        K: 'static,
        F: FnMut(&dyn StateNode) + 'static,
    {
        let erased: StateObserver = Box::new(observer);
        self.register(|observers| observers.states.push((Kind::of::<K>(), erased)));
        self
    }

    /// Observe contained faults of type `E`.
    ///
    /// Rust errors have no subtype chain to climb, so a fault counts as an
    /// `E` when it is one or wraps one through [`source`](StdError::source).
    /// The chain is searched from the outermost error inwards, and only the
    /// nearest level some catcher matches is delivered; a catcher for a
    /// wrapping error therefore takes precedence over one for its cause.
    pub fn catch<E, F>(self, mut observer: F) -> Self
    where
        E: StdError + 'static,
        F: FnMut(&E) + 'static,
    {
        let catcher = Catcher {
            matches: matches::<E>,
            observer: Box::new(move |fault: &(dyn StdError + 'static)| {
                if let Some(fault) = fault.downcast_ref::<E>() {
                    observer(fault);
                }
            }),
        };
        self.register(|observers| observers.catchers.push(catcher));
        self
    }

    /// Observe contained faults that no `catch` observer matched.
    pub fn catch_all<F>(self, observer: F) -> Self
    where
        F: FnMut(&(dyn StdError + 'static)) + 'static,
    {
        let erased: FaultObserver = Box::new(observer);
        self.register(|observers| observers.fallbacks.push(erased));
        self
    }

    /// Unregister every observer. Safe to call more than once, and from
    /// inside one of this binding's own observers.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    fn register(&self, add: impl FnOnce(&mut Observers)) {
        if self.inner.disposed.get() {
            return;
        }
        if let Ok(mut observers) = self.inner.observers.try_borrow_mut() {
            add(&mut observers);
        }
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.inner.id)
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

fn matches<E: StdError + 'static>(fault: &(dyn StdError + 'static)) -> bool {
    fault.is::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn registrations_are_counted_per_category() {
        let binding = Binding::new()
            .watch(|_: &u32| {})
            .handle(|_: &String| {})
            .handle(|_: &bool| {})
            .catch_all(|_| {});

        let observers = binding.inner.observers.borrow();
        assert_eq!(observers.inputs.len(), 1);
        assert_eq!(observers.outputs.len(), 2);
        assert_eq!(observers.fallbacks.len(), 1);
        assert_eq!(observers.len(), 4);
    }

    #[test]
    fn dispose_is_idempotent_and_releases_observers() {
        let binding = Binding::new().handle(|_: &String| {});
        binding.dispose();
        binding.dispose();

        assert!(binding.is_disposed());
        assert_eq!(binding.inner.observers.borrow().len(), 0);
    }

    #[test]
    fn registration_after_dispose_is_ignored() {
        let binding = Binding::new();
        binding.dispose();
        let binding = binding.watch(|_: &u32| {});
        assert_eq!(binding.inner.observers.borrow().len(), 0);
    }

    #[test]
    fn catcher_matches_by_error_type() {
        let binding = Binding::new().catch(|_: &io::Error| {});
        let io_error = io::Error::new(io::ErrorKind::Other, "offline");
        let fmt_error = fmt::Error;

        assert!(binding.inner.catches(&io_error));
        assert!(!binding.inner.catches(&fmt_error));
    }

    #[test]
    fn each_binding_gets_a_fresh_id() {
        assert_ne!(Binding::new().id(), Binding::new().id());
    }
}
