//! Access handed to handlers and hooks while they run.

use super::queue::InputSink;
use crate::binding::Hub;
use crate::core::{Blackboard, Kind, State, StateNode};
use crate::registry::TypeRegistry;
use tracing::trace;

/// What a handler or hook may touch: its subject instance, the engine's
/// blackboard, the output channel and the input queue.
///
/// The subject is the current state for input handlers and exit hooks, the
/// arriving instance for enter and attach hooks, and the departed instance
/// for detach hooks.
pub struct Context<'a> {
    subject: &'a mut (dyn StateNode + 'static),
    blackboard: &'a mut Blackboard,
    registry: &'a TypeRegistry,
    hub: &'a Hub,
    sink: &'a InputSink,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        subject: &'a mut (dyn StateNode + 'static),
        blackboard: &'a mut Blackboard,
        registry: &'a TypeRegistry,
        hub: &'a Hub,
        sink: &'a InputSink,
    ) -> Self {
        Self {
            subject,
            blackboard,
            registry,
            hub,
            sink,
        }
    }

    /// Concrete kind of the subject.
    pub fn kind(&self) -> Kind {
        self.subject.kind()
    }

    pub fn subject(&self) -> &dyn StateNode {
        &*self.subject
    }

    /// The subject, if it is a `T`.
    pub fn state<T: State>(&self) -> Option<&T> {
        self.subject.downcast_ref::<T>()
    }

    pub fn state_mut<T: State>(&mut self) -> Option<&mut T> {
        self.subject.downcast_mut::<T>()
    }

    /// Whether the subject is a `K` or descends from it.
    pub fn is_in<K: 'static>(&self) -> bool {
        self.registry.is_a(self.subject.kind(), Kind::of::<K>())
    }

    pub fn blackboard(&self) -> &Blackboard {
        self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        self.blackboard
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    /// Deliver `value` to output observers right away.
    pub fn output<O: 'static>(&mut self, value: O) {
        trace!("Output {} from {}", Kind::of::<O>(), self.subject.kind());
        self.hub.notify_output(Kind::of::<O>(), &value);
    }

    /// Enqueue `value` behind every input already waiting. It is processed
    /// once the current dispatch has completed.
    pub fn input<I: 'static>(&mut self, value: I) {
        self.sink.push(value);
    }
}
