//! The running state machine.

use super::context::Context;
use super::machine::Machine;
use super::queue::{InputSink, QueuedInput};
use crate::binding::{Binding, Hub};
use crate::core::{
    Blackboard, Hook, HookKind, Kind, State, StateNode, TransitionHistory, TransitionRecord,
};
use crate::error::{Error, Fault};
use crate::persistence::{Document, PersistenceCodec};
use crate::registry::TypeRegistry;
use crate::transition::{self, Plan, Step, Target, Transition};
use chrono::Utc;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns the current state instance, the blackboard and the input queue of
/// one machine.
///
/// Inputs are dispatched one at a time, in FIFO order. Inputs enqueued while
/// a dispatch runs (from a handler, a hook or an observer) are processed
/// after it completes and before the outer [`input`](Self::input) call
/// returns. Faults raised by handlers, hooks or initializers abandon the
/// transition that triggered them and are routed to the engine's bindings.
///
/// The engine is single-threaded; wrap it in a lock to share it.
pub struct Engine {
    machine: Arc<Machine>,
    current: Option<Box<dyn StateNode>>,
    blackboard: Blackboard,
    sink: InputSink,
    hub: Hub,
    history: TransitionHistory,
}

impl Engine {
    /// Create an engine that has not started yet. Prepare the blackboard
    /// with [`blackboard_mut`](Self::blackboard_mut) before the first input.
    pub fn new(machine: Arc<Machine>) -> Self {
        let history = TransitionHistory::new(machine.config().history_limit);
        Self {
            machine,
            current: None,
            blackboard: Blackboard::new(),
            sink: InputSink::default(),
            hub: Hub::default(),
            history,
        }
    }

    /// Build an engine directly from a persisted document.
    pub fn from_document(
        machine: Arc<Machine>,
        document: &Document,
        dependencies: &Blackboard,
    ) -> Result<Self, Error> {
        let mut engine = Self::new(machine);
        engine.restore(document, dependencies)?;
        Ok(engine)
    }

    // ---- lifecycle ----------------------------------------------------

    /// Establish the initial state. Does nothing once started.
    ///
    /// A failing initial factory or start hook leaves the engine unstarted.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.current.is_some() {
            return Ok(());
        }
        self.try_start().map_err(|fault| match fault.downcast::<Error>() {
            Ok(err) => *err,
            Err(fault) => Error::Hook(fault),
        })
    }

    pub fn is_started(&self) -> bool {
        self.current.is_some()
    }

    /// Enqueue an input and process the queue until it is empty.
    ///
    /// Starts the engine first if needed; a failing start is reported to
    /// the bindings and the queued inputs stay queued.
    pub fn input<I: 'static>(&mut self, value: I) {
        self.sink.push(value);
        self.pump();
    }

    /// Process inputs pushed through an [`InputSink`] while no dispatch was
    /// running.
    pub fn pump(&mut self) {
        if self.current.is_none() {
            if let Err(fault) = self.try_start() {
                self.report(fault);
                return;
            }
        }
        while let Some(queued) = self.sink.pop() {
            self.dispatch(queued);
        }
    }

    /// Drop every queued input without dispatching it.
    pub fn clear_inputs(&mut self) -> usize {
        let dropped = self.sink.clear();
        if dropped > 0 {
            debug!("Cleared {} pending inputs", dropped);
        }
        dropped
    }

    // ---- accessors ----------------------------------------------------

    /// Current state, starting the engine if needed.
    pub fn state(&mut self) -> Result<&dyn StateNode, Error> {
        self.start()?;
        self.current.as_deref().ok_or(Error::NotStarted)
    }

    /// Current state, without starting the engine.
    pub fn current_state(&self) -> Option<&dyn StateNode> {
        self.current.as_deref()
    }

    /// Current state, if it is an `S`.
    pub fn current_as<S: State>(&self) -> Option<&S> {
        self.current.as_deref().and_then(|state| state.downcast_ref::<S>())
    }

    pub fn current_kind(&self) -> Option<Kind> {
        self.current.as_ref().map(|state| state.kind())
    }

    /// Whether the current state is a `K` or descends from it.
    pub fn is_in<K: 'static>(&self) -> bool {
        self.current_kind()
            .is_some_and(|kind| self.registry().is_a(kind, Kind::of::<K>()))
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    /// A handle for enqueueing inputs from code that cannot borrow the
    /// engine, such as observers.
    pub fn sink(&self) -> InputSink {
        self.sink.clone()
    }

    pub fn pending_inputs(&self) -> usize {
        self.sink.len()
    }

    pub fn machine(&self) -> &Arc<Machine> {
        &self.machine
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.machine.registry()
    }

    /// Attach a new, empty binding.
    pub fn bind(&self) -> Binding {
        let binding = Binding::new();
        self.hub.attach(binding.inner());
        binding
    }

    // ---- persistence --------------------------------------------------

    /// Encode the engine into a document.
    pub fn save(&self) -> Result<Document, Error> {
        self.codec()
            .encode(self.machine.owner(), self.current.as_deref(), &self.blackboard)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        self.save()?.to_json()
    }

    /// Replace the current state and blackboard with the document's.
    ///
    /// The document is decoded completely before anything is replaced, so
    /// a failing restore leaves the engine untouched. No hooks run and no
    /// state observers are notified.
    pub fn restore(&mut self, document: &Document, dependencies: &Blackboard) -> Result<(), Error> {
        let snapshot = self
            .codec()
            .decode(self.machine.owner(), document, dependencies)?;
        info!(
            "Restored engine in state {} ({} entries, {} upgrades)",
            self.id_of(snapshot.state.kind()),
            snapshot.blackboard.len(),
            snapshot.upgrades
        );
        self.current = Some(snapshot.state);
        self.blackboard = snapshot.blackboard;
        Ok(())
    }

    fn codec(&self) -> PersistenceCodec<'_> {
        PersistenceCodec::new(self.machine.registry())
            .with_upgrade_limit(self.machine.config().max_upgrade_steps)
    }

    // ---- dispatch -----------------------------------------------------

    fn try_start(&mut self) -> Result<(), Fault> {
        let machine = Arc::clone(&self.machine);
        let initial = (machine.initial)(&self.blackboard)?;
        let mut plan = transition::plan(machine.registry(), None, initial.kind());
        if !machine.config().enter_on_start {
            plan = plan.without_enters();
        }
        info!("Starting engine in state {}", self.id_of(initial.kind()));
        self.apply(&machine, &plan, initial)
    }

    fn dispatch(&mut self, queued: QueuedInput) {
        self.hub.notify_input(queued.kind, &*queued.value);

        let machine = Arc::clone(&self.machine);
        let Some(current) = self.current.as_deref_mut() else {
            return;
        };
        let state = current.kind();
        let Some((_, handler)) = machine.handler_for(state, queued.kind) else {
            debug!("Dropped input {} unhandled in state {}", queued.kind, state);
            return;
        };

        let outcome = {
            let mut ctx = Context::new(
                current,
                &mut self.blackboard,
                machine.registry(),
                &self.hub,
                &self.sink,
            );
            handler(&*queued.value, &mut ctx)
        };

        let result = match outcome {
            Ok(Transition::Stay) => Ok(()),
            Ok(Transition::To(target)) => self.transition(&machine, target),
            Err(fault) => Err(fault),
        };
        if let Err(fault) = result {
            self.report(fault);
        }
    }

    fn transition(&mut self, machine: &Machine, target: Target) -> Result<(), Fault> {
        let from = self.current_kind();
        let next = target.build(machine.registry())?;
        let plan = transition::plan(machine.registry(), from, next.kind());
        debug!(
            "Transition {} -> {} (shared ancestor {:?})",
            from.map(|kind| self.id_of(kind)).unwrap_or_default(),
            self.id_of(next.kind()),
            plan.shared()
        );
        self.apply(machine, &plan, next)
    }

    /// Run a plan. Steps before the commit point may fail and abandon the
    /// transition: the previous instance stays current and its exit hooks
    /// will run again on the next transition, while the new instance is
    /// dropped without detach hooks even if some of its attach hooks
    /// already ran. Detach hooks come after the commit, so all of them run
    /// and each failure is reported on its own.
    fn apply(&mut self, machine: &Machine, plan: &Plan, next: Box<dyn StateNode>) -> Result<(), Fault> {
        let hooks = machine.hooks();
        let registry = machine.registry();
        let mut next = Some(next);
        let mut previous: Option<Box<dyn StateNode>> = None;
        let mut detach_faults = Vec::new();

        for step in plan.steps() {
            match *step {
                Step::Exit(kind) => {
                    if let Some(subject) = self.current.as_deref_mut() {
                        run_hooks(
                            hooks.hooks(kind, HookKind::Exit),
                            subject,
                            &mut self.blackboard,
                            registry,
                            &self.hub,
                            &self.sink,
                        )?;
                    }
                }
                Step::Enter(kind) | Step::Attach(kind) => {
                    let category = match step {
                        Step::Enter(_) => HookKind::Enter,
                        _ => HookKind::Attach,
                    };
                    if let Some(subject) = next.as_deref_mut() {
                        run_hooks(
                            hooks.hooks(kind, category),
                            subject,
                            &mut self.blackboard,
                            registry,
                            &self.hub,
                            &self.sink,
                        )?;
                    }
                }
                Step::Commit => {
                    previous = self.current.take();
                    self.current = next.take();
                    self.record(plan);
                }
                Step::Detach(kind) => {
                    if let Some(subject) = previous.as_deref_mut() {
                        detach_faults.extend(run_every_hook(
                            hooks.hooks(kind, HookKind::Detach),
                            subject,
                            &mut self.blackboard,
                            registry,
                            &self.hub,
                            &self.sink,
                        ));
                    }
                }
            }
        }

        for fault in detach_faults {
            self.report(fault);
        }
        if let Some(current) = self.current.as_deref() {
            self.hub.notify_state(registry.chain(current.kind()), current);
        }
        Ok(())
    }

    fn record(&mut self, plan: &Plan) {
        let record = TransitionRecord {
            from: plan.from().map(|kind| self.id_of(kind).to_string()),
            to: self.id_of(plan.to()).to_string(),
            timestamp: Utc::now(),
        };
        self.history.record(record);
    }

    fn report(&self, fault: Fault) {
        let err: &(dyn StdError + 'static) = &*fault;
        if !self.hub.notify_fault(err) {
            let state = self.current_kind().map(|kind| self.id_of(kind)).unwrap_or("<none>");
            warn!("Unhandled fault in state {}: {}", state, fault);
        }
    }

    fn id_of(&self, kind: Kind) -> &str {
        self.registry().id_of(kind).unwrap_or(kind.short_name())
    }
}

fn run_hooks(
    hooks: &[Hook],
    subject: &mut (dyn StateNode + 'static),
    blackboard: &mut Blackboard,
    registry: &TypeRegistry,
    hub: &Hub,
    sink: &InputSink,
) -> Result<(), Fault> {
    if hooks.is_empty() {
        return Ok(());
    }
    let mut ctx = Context::new(subject, blackboard, registry, hub, sink);
    for hook in hooks {
        hook(&mut ctx)?;
    }
    Ok(())
}

/// Like [`run_hooks`], but keeps going past failures and returns them all.
fn run_every_hook(
    hooks: &[Hook],
    subject: &mut (dyn StateNode + 'static),
    blackboard: &mut Blackboard,
    registry: &TypeRegistry,
    hub: &Hub,
    sink: &InputSink,
) -> Vec<Fault> {
    if hooks.is_empty() {
        return Vec::new();
    }
    let mut ctx = Context::new(subject, blackboard, registry, hub, sink);
    hooks.iter().filter_map(|hook| hook(&mut ctx).err()).collect()
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("current", &self.current)
            .field("blackboard", &self.blackboard)
            .field("pending", &self.sink.len())
            .field("bindings", &self.hub.len())
            .finish()
    }
}
