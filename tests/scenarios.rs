//! End-to-end behavior of engines built from machine definitions.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use strata::{
    abstract_kinds, Binding, Blackboard, Document, EngineConfig, Engine, Error, Machine,
    MachineBuilder, State, Transition, TypeRegistry,
};
use thiserror::Error as ThisError;

abstract_kinds! {
    pub struct HeaterState;
    pub struct Powered;
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Off;

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Idle;

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Heating {
    target: i32,
}

impl State for Off {}
impl State for Idle {}
impl State for Heating {}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Settings {
    offset: i32,
}

struct Heater;

struct PowerOn;
struct PowerOff;
struct Cool;
struct Heat(i32);
struct Fail;
struct Kick;
struct Ping;
struct Chain(u32);
struct Probe(u32);

#[derive(Debug, Clone, PartialEq)]
struct Trace(String);

#[derive(Debug, ThisError)]
#[error("sensor unreachable")]
struct SensorError;

#[derive(Debug, ThisError)]
#[error("reading failed")]
struct ReadError {
    #[source]
    source: SensorError,
}

fn registry() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::builder()
            .root::<HeaterState>("state")
            .abstract_kind::<Powered, HeaterState>("powered")
            .state::<Off, HeaterState>("off")
            .state::<Idle, Powered>("idle")
            .state::<Heating, Powered>("heating")
            .data::<Settings>("settings")
            .owner::<Heater>("heater")
            .build()
            .unwrap(),
    )
}

fn traced<K: 'static>(builder: MachineBuilder, name: &'static str) -> MachineBuilder {
    builder
        .on_enter::<K, _>(move |ctx| {
            ctx.output(Trace(format!("enter:{name}")));
            Ok(())
        })
        .on_exit::<K, _>(move |ctx| {
            ctx.output(Trace(format!("exit:{name}")));
            Ok(())
        })
        .on_attach::<K, _>(move |ctx| {
            ctx.output(Trace(format!("attach:{name}")));
            Ok(())
        })
        .on_detach::<K, _>(move |ctx| {
            ctx.output(Trace(format!("detach:{name}")));
            Ok(())
        })
}

fn heater_machine(config: EngineConfig) -> Arc<Machine> {
    let builder = Machine::builder(registry())
        .owner::<Heater>()
        .initial::<Off>()
        .config(config)
        .on::<Off, PowerOn, _>(|_, _| Ok(Transition::to::<Heating>()))
        .on::<Powered, PowerOff, _>(|_, _| Ok(Transition::to::<Off>()))
        .on::<Heating, Cool, _>(|_, _| Ok(Transition::to::<Idle>()))
        .on::<Powered, Heat, _>(|heat, _| {
            let target = heat.0;
            Ok(Transition::to_with(move |heating: &mut Heating| {
                if target < 0 {
                    return Err("target below zero".into());
                }
                heating.target = target;
                Ok(())
            }))
        })
        .on::<Powered, Fail, _>(|_, _| {
            Err(ReadError {
                source: SensorError,
            }
            .into())
        })
        .on::<Off, Kick, _>(|_, ctx| {
            ctx.input(Ping);
            Ok(Transition::to::<Heating>())
        })
        .on::<Powered, Ping, _>(|_, ctx| {
            ctx.output(Trace("ping".to_string()));
            Ok(Transition::stay())
        })
        .on::<Off, Chain, _>(|chain, ctx| {
            ctx.output(Trace(format!("chain:{}", chain.0)));
            if chain.0 < 3 {
                ctx.input(Chain(chain.0 + 1));
                ctx.input(Probe(chain.0));
            }
            Ok(Transition::stay())
        })
        .on::<Off, Probe, _>(|probe, ctx| {
            ctx.output(Trace(format!("probe:{}", probe.0)));
            Ok(Transition::stay())
        });

    let builder = traced::<HeaterState>(builder, "state");
    let builder = traced::<Powered>(builder, "powered");
    let builder = traced::<Off>(builder, "off");
    let builder = traced::<Idle>(builder, "idle");
    let builder = traced::<Heating>(builder, "heating");

    let machine = builder
        .on_enter::<Idle, _>(|ctx| {
            let rejected = ctx
                .blackboard()
                .get::<Settings>()
                .map(|settings| settings.offset < 0)
                .unwrap_or(false);
            if rejected {
                return Err("idle rejected".into());
            }
            Ok(())
        })
        .build()
        .unwrap();
    Arc::new(machine)
}

struct Harness {
    engine: Engine,
    trace: Rc<RefCell<Vec<String>>>,
    _binding: Binding,
}

impl Harness {
    fn new(config: EngineConfig) -> Self {
        let engine = Engine::new(heater_machine(config));
        let trace = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&trace);
        let binding = engine
            .bind()
            .handle(move |line: &Trace| log.borrow_mut().push(line.0.clone()));
        Self {
            engine,
            trace,
            _binding: binding,
        }
    }

    fn started() -> Self {
        let mut harness = Self::new(EngineConfig::default());
        harness.engine.start().unwrap();
        harness.take();
        harness
    }

    fn take(&self) -> Vec<String> {
        self.trace.borrow_mut().drain(..).collect()
    }
}

fn counter() -> (Rc<RefCell<u32>>, Rc<RefCell<u32>>) {
    let count = Rc::new(RefCell::new(0));
    (Rc::clone(&count), count)
}

// ---- toggle -------------------------------------------------------------

abstract_kinds! {
    pub struct SwitchState;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SwitchOff;
#[derive(Debug, Default, Serialize, Deserialize)]
struct SwitchOn;

impl State for SwitchOff {}
impl State for SwitchOn {}

struct Switch;
struct Toggle;

#[derive(Debug, Clone, PartialEq)]
struct StatusChanged {
    is_on: bool,
}

#[test]
fn toggle_reports_each_status_change_once() {
    let registry = TypeRegistry::builder()
        .root::<SwitchState>("switch-state")
        .state::<SwitchOff, SwitchState>("off")
        .state::<SwitchOn, SwitchState>("on")
        .owner::<Switch>("switch")
        .build()
        .unwrap();
    let machine = Machine::builder(Arc::new(registry))
        .owner::<Switch>()
        .initial::<SwitchOff>()
        .on::<SwitchOff, Toggle, _>(|_, ctx| {
            ctx.output(StatusChanged { is_on: true });
            Ok(Transition::to::<SwitchOn>())
        })
        .on::<SwitchOn, Toggle, _>(|_, ctx| {
            ctx.output(StatusChanged { is_on: false });
            Ok(Transition::to::<SwitchOff>())
        })
        .build()
        .unwrap();

    let mut engine = Engine::new(Arc::new(machine));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let _binding = engine
        .bind()
        .handle(move |status: &StatusChanged| log.borrow_mut().push(status.clone()));

    engine.input(Toggle);
    assert_eq!(*seen.borrow(), vec![StatusChanged { is_on: true }]);
    assert!(engine.current_as::<SwitchOn>().is_some());

    engine.input(Toggle);
    assert_eq!(
        *seen.borrow(),
        vec![
            StatusChanged { is_on: true },
            StatusChanged { is_on: false }
        ]
    );
    assert!(engine.current_as::<SwitchOff>().is_some());
}

// ---- hierarchy ----------------------------------------------------------

#[test]
fn start_enters_whole_chain_then_attaches() {
    let mut h = Harness::new(EngineConfig::default());
    assert!(!h.engine.is_started());

    h.engine.start().unwrap();
    h.engine.start().unwrap();

    assert_eq!(
        h.take(),
        vec!["enter:state", "enter:off", "attach:state", "attach:off"]
    );
    assert!(h.engine.current_as::<Off>().is_some());
}

#[test]
fn start_without_enter_hooks_still_attaches() {
    let mut h = Harness::new(EngineConfig {
        enter_on_start: false,
        ..EngineConfig::default()
    });
    h.engine.start().unwrap();

    assert_eq!(h.take(), vec!["attach:state", "attach:off"]);
}

#[test]
fn first_input_starts_the_engine() {
    let mut h = Harness::new(EngineConfig::default());
    h.engine.input(PowerOn);

    let trace = h.take();
    assert_eq!(&trace[..2], ["enter:state", "enter:off"]);
    assert!(h.engine.current_as::<Heating>().is_some());
}

#[test]
fn state_starts_lazily() {
    let mut h = Harness::new(EngineConfig::default());
    assert!(h.engine.current_state().is_none());

    let kind = h.engine.state().unwrap().kind();
    assert_eq!(kind, strata::Kind::of::<Off>());
}

#[test]
fn shared_ancestor_is_entered_only_once() {
    let mut h = Harness::started();

    h.engine.input(PowerOn);
    h.engine.input(Cool);
    h.engine.input(Heat(21));

    let trace = h.take();
    let powered_enters = trace.iter().filter(|line| *line == "enter:powered").count();
    let powered_exits = trace.iter().filter(|line| *line == "exit:powered").count();
    assert_eq!(powered_enters, 1);
    assert_eq!(powered_exits, 0);
    assert!(!trace.iter().any(|line| line == "enter:state" || line == "exit:state"));
    assert_eq!(h.engine.current_as::<Heating>(), Some(&Heating { target: 21 }));
}

#[test]
fn crossing_subtrees_exits_leaf_first_and_enters_root_first() {
    let mut h = Harness::started();

    h.engine.input(PowerOn);
    assert_eq!(
        h.take(),
        vec![
            "exit:off",
            "enter:powered",
            "enter:heating",
            "attach:state",
            "attach:powered",
            "attach:heating",
            "detach:state",
            "detach:off",
        ]
    );

    h.engine.input(PowerOff);
    assert_eq!(
        h.take(),
        vec![
            "exit:heating",
            "exit:powered",
            "enter:off",
            "attach:state",
            "attach:off",
            "detach:state",
            "detach:powered",
            "detach:heating",
        ]
    );
}

#[test]
fn self_transition_swaps_instances_without_enter_or_exit() {
    let mut h = Harness::started();
    h.engine.input(PowerOn);
    h.take();

    h.engine.input(Heat(19));

    assert_eq!(
        h.take(),
        vec![
            "attach:state",
            "attach:powered",
            "attach:heating",
            "detach:state",
            "detach:powered",
            "detach:heating",
        ]
    );
    assert_eq!(h.engine.current_as::<Heating>(), Some(&Heating { target: 19 }));
}

#[test]
fn attach_and_detach_fire_once_per_instance() {
    let mut h = Harness::started();

    h.engine.input(PowerOn);
    h.engine.input(Heat(20));
    h.engine.input(Cool);
    h.engine.input(PowerOff);

    let trace = h.take();
    let leaf_attaches = trace
        .iter()
        .filter(|line| matches!(line.as_str(), "attach:off" | "attach:idle" | "attach:heating"))
        .count();
    let leaf_detaches = trace
        .iter()
        .filter(|line| matches!(line.as_str(), "detach:off" | "detach:idle" | "detach:heating"))
        .count();
    assert_eq!(leaf_attaches, 4);
    assert_eq!(leaf_detaches, 4);
    assert_eq!(h.engine.history().len(), 5);
}

#[test]
fn history_records_committed_transitions() {
    let mut h = Harness::started();
    h.engine.input(PowerOn);
    h.engine.input(Cool);

    assert_eq!(h.engine.history().get_path(), vec!["off", "heating", "idle"]);
    assert!(h.engine.is_in::<Powered>());
    assert!(h.engine.is_in::<HeaterState>());
}

// ---- input queue --------------------------------------------------------

#[test]
fn inputs_from_handlers_wait_for_the_current_dispatch() {
    let mut h = Harness::started();

    h.engine.input(Kick);

    let trace = h.take();
    assert_eq!(trace.last().map(String::as_str), Some("ping"));
    assert_eq!(trace[trace.len() - 2], "detach:off");
    assert_eq!(h.engine.pending_inputs(), 0);
}

#[test]
fn reentrant_inputs_are_processed_in_fifo_order() {
    let mut h = Harness::started();

    h.engine.input(Chain(0));

    assert_eq!(
        h.take(),
        vec!["chain:0", "chain:1", "probe:0", "chain:2", "probe:1", "chain:3", "probe:2"]
    );
}

#[test]
fn sink_inputs_wait_for_pump_when_idle() {
    let mut h = Harness::started();
    let sink = h.engine.sink();

    sink.push(PowerOn);
    assert_eq!(h.engine.pending_inputs(), 1);
    assert!(h.engine.current_as::<Off>().is_some());

    h.engine.pump();
    assert_eq!(h.engine.pending_inputs(), 0);
    assert!(h.engine.current_as::<Heating>().is_some());
}

#[test]
fn observers_can_feed_inputs_back_through_a_sink() {
    let mut h = Harness::started();
    let sink = h.engine.sink();
    let _binding = h.engine.bind().when::<Heating, _>(move |_| sink.push(Cool));

    h.engine.input(PowerOn);

    assert!(h.engine.current_as::<Idle>().is_some());
}

#[test]
fn unhandled_inputs_are_dropped_silently() {
    let mut h = Harness::started();
    let (faults, count) = counter();
    let _binding = h
        .engine
        .bind()
        .catch_all(move |_| *count.borrow_mut() += 1);

    h.engine.input(Cool);
    h.engine.input(Ping);

    assert!(h.engine.current_as::<Off>().is_some());
    assert!(h.take().is_empty());
    assert_eq!(*faults.borrow(), 0);
}

// ---- faults -------------------------------------------------------------

#[test]
fn handler_fault_keeps_current_state_and_reaches_catcher() {
    let mut h = Harness::started();
    h.engine.input(PowerOn);

    let (caught, count) = counter();
    let _binding = h
        .engine
        .bind()
        .catch(move |_: &SensorError| *count.borrow_mut() += 1);

    h.engine.input(Fail);
    assert_eq!(*caught.borrow(), 1);
    assert!(h.engine.current_as::<Heating>().is_some());

    h.engine.input(Cool);
    assert!(h.engine.current_as::<Idle>().is_some());
}

#[test]
fn nearest_level_of_the_fault_chain_wins() {
    let mut h = Harness::started();
    h.engine.input(PowerOn);

    let (outer, outer_count) = counter();
    let (inner, inner_count) = counter();
    let _binding = h
        .engine
        .bind()
        .catch(move |_: &SensorError| *inner_count.borrow_mut() += 1)
        .catch(move |err: &ReadError| {
            assert_eq!(err.to_string(), "reading failed");
            *outer_count.borrow_mut() += 1;
        });

    h.engine.input(Fail);

    assert_eq!(*outer.borrow(), 1);
    assert_eq!(*inner.borrow(), 0);
}

#[test]
fn initializer_fault_abandons_transition() {
    let mut h = Harness::started();
    h.engine.input(PowerOn);
    h.engine.input(Heat(18));
    h.take();

    let messages = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&messages);
    let _binding = h
        .engine
        .bind()
        .catch_all(move |err| log.borrow_mut().push(err.to_string()));

    h.engine.input(Heat(-4));

    assert_eq!(*messages.borrow(), vec!["target below zero"]);
    assert_eq!(h.engine.current_as::<Heating>(), Some(&Heating { target: 18 }));
    assert!(h.take().is_empty());
}

#[test]
fn hook_fault_abandons_transition_without_rollback() {
    let mut h = Harness::started();
    h.engine.blackboard_mut().set(Settings { offset: -1 }).unwrap();
    h.engine.input(PowerOn);
    h.take();

    let (faults, count) = counter();
    let _binding = h
        .engine
        .bind()
        .catch_all(move |_| *count.borrow_mut() += 1);

    h.engine.input(Cool);

    assert_eq!(*faults.borrow(), 1);
    assert_eq!(h.take(), vec!["exit:heating", "enter:idle"]);
    assert!(h.engine.current_as::<Heating>().is_some());

    h.engine.blackboard_mut().overwrite(Settings { offset: 0 });
    h.engine.input(Cool);
    assert!(h.engine.current_as::<Idle>().is_some());
}

#[test]
fn explicit_start_surfaces_hook_failure() {
    let machine = Machine::builder(registry())
        .owner::<Heater>()
        .initial::<Off>()
        .on_attach::<Off, _>(|_| Err("no power supply".into()))
        .build()
        .unwrap();

    let mut engine = Engine::new(Arc::new(machine));
    let err = engine.start().unwrap_err();
    assert!(matches!(err, Error::Hook(_)));
    assert!(!engine.is_started());
}

#[test]
fn implicit_start_failure_is_reported_and_inputs_stay_queued() {
    let machine = Machine::builder(registry())
        .owner::<Heater>()
        .initial::<Off>()
        .on_attach::<Off, _>(|_| Err("no power supply".into()))
        .build()
        .unwrap();

    let mut engine = Engine::new(Arc::new(machine));
    let (faults, count) = counter();
    let _binding = engine.bind().catch_all(move |_| *count.borrow_mut() += 1);

    engine.input(PowerOn);

    assert_eq!(*faults.borrow(), 1);
    assert_eq!(engine.pending_inputs(), 1);
    assert_eq!(engine.clear_inputs(), 1);
}

fn collect_traces(engine: &Engine) -> (Rc<RefCell<Vec<String>>>, Binding) {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&trace);
    let binding = engine
        .bind()
        .handle(move |line: &Trace| log.borrow_mut().push(line.0.clone()));
    (trace, binding)
}

#[test]
fn failing_detach_hooks_do_not_stop_the_others() {
    let machine = Machine::builder(registry())
        .owner::<Heater>()
        .initial::<Off>()
        .on::<Off, PowerOn, _>(|_, _| Ok(Transition::to::<Heating>()))
        .on_detach::<HeaterState, _>(|_| Err("unsubscribe failed".into()))
        .on_detach::<HeaterState, _>(|ctx| {
            ctx.output(Trace("detach:state".to_string()));
            Ok(())
        })
        .on_detach::<Off, _>(|ctx| {
            ctx.output(Trace("detach:off".to_string()));
            Err("release failed".into())
        })
        .build()
        .unwrap();
    let mut engine = Engine::new(Arc::new(machine));
    let (trace, _traces) = collect_traces(&engine);
    let messages = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&messages);
    let _faults = engine
        .bind()
        .catch_all(move |err| log.borrow_mut().push(err.to_string()));

    engine.input(PowerOn);

    assert!(engine.current_as::<Heating>().is_some());
    assert_eq!(*trace.borrow(), vec!["detach:state", "detach:off"]);
    assert_eq!(
        *messages.borrow(),
        vec!["unsubscribe failed", "release failed"]
    );
}

#[test]
fn failed_attach_drops_new_instance_and_exits_again_on_retry() {
    let machine = Machine::builder(registry())
        .owner::<Heater>()
        .initial::<Off>()
        .on::<Off, PowerOn, _>(|_, _| Ok(Transition::to::<Heating>()))
        .on_exit::<Off, _>(|ctx| {
            ctx.output(Trace("exit:off".to_string()));
            Ok(())
        })
        .on_attach::<HeaterState, _>(|ctx| {
            ctx.output(Trace("attach:state".to_string()));
            Ok(())
        })
        .on_attach::<Heating, _>(|ctx| {
            let refused = ctx
                .blackboard()
                .get::<Settings>()
                .map(|settings| settings.offset < 0)
                .unwrap_or(false);
            if refused {
                return Err("heating refused".into());
            }
            Ok(())
        })
        .on_detach::<HeaterState, _>(|ctx| {
            let line = format!("detach:{}", ctx.kind().short_name());
            ctx.output(Trace(line));
            Ok(())
        })
        .build()
        .unwrap();
    let mut engine = Engine::new(Arc::new(machine));
    engine.blackboard_mut().set(Settings { offset: -1 }).unwrap();
    engine.start().unwrap();
    let (trace, _traces) = collect_traces(&engine);

    engine.input(PowerOn);

    assert!(engine.current_as::<Off>().is_some());
    assert_eq!(*trace.borrow(), vec!["exit:off", "attach:state"]);

    trace.borrow_mut().clear();
    engine.blackboard_mut().overwrite(Settings { offset: 0 });
    engine.input(PowerOn);

    assert!(engine.current_as::<Heating>().is_some());
    assert_eq!(
        *trace.borrow(),
        vec!["exit:off", "attach:state", "detach:Off"]
    );
}

// ---- bindings -----------------------------------------------------------

#[test]
fn when_matches_ancestor_kinds() {
    let mut h = Harness::started();
    let (powered, count) = counter();
    let _binding = h
        .engine
        .bind()
        .when::<Powered, _>(move |_| *count.borrow_mut() += 1);

    h.engine.input(PowerOn);
    h.engine.input(Cool);
    h.engine.input(PowerOff);

    assert_eq!(*powered.borrow(), 2);
}

#[test]
fn outputs_from_hooks_arrive_before_state_notification() {
    let mut h = Harness::started();
    let order = Rc::new(RefCell::new(Vec::new()));
    let outputs = Rc::clone(&order);
    let states = Rc::clone(&order);
    let _binding = h
        .engine
        .bind()
        .handle(move |line: &Trace| outputs.borrow_mut().push(line.0.clone()))
        .when::<Heating, _>(move |_| states.borrow_mut().push("when:heating".to_string()));

    h.engine.input(PowerOn);

    let order = order.borrow();
    assert_eq!(order.last().map(String::as_str), Some("when:heating"));
    assert!(order.iter().any(|line| line == "enter:heating"));
}

#[test]
fn input_watchers_see_every_dequeued_input() {
    let mut h = Harness::started();
    let (watched, count) = counter();
    let _binding = h
        .engine
        .bind()
        .watch(move |_: &Cool| *count.borrow_mut() += 1);

    h.engine.input(Cool);
    h.engine.input(PowerOn);
    h.engine.input(Cool);

    assert_eq!(*watched.borrow(), 2);
}

#[test]
fn disposed_binding_receives_nothing() {
    let mut h = Harness::started();
    let (seen, count) = counter();
    let binding = h
        .engine
        .bind()
        .handle(move |_: &Trace| *count.borrow_mut() += 1);

    binding.dispose();
    binding.dispose();
    h.engine.input(PowerOn);

    assert_eq!(*seen.borrow(), 0);
    assert!(binding.is_disposed());
}

#[test]
fn dropping_the_engine_leaves_bindings_usable() {
    let h = Harness::started();
    let binding = h.engine.bind().handle(|_: &Trace| {});
    drop(h);

    assert!(!binding.is_disposed());
    binding.dispose();
}

// ---- persistence --------------------------------------------------------

fn heating_engine(target: i32, offset: i32) -> Harness {
    let mut h = Harness::started();
    h.engine.blackboard_mut().set(Settings { offset }).unwrap();
    h.engine.input(PowerOn);
    h.engine.input(Heat(target));
    h.take();
    h
}

#[test]
fn save_before_start_fails() {
    let h = Harness::new(EngineConfig::default());
    assert!(matches!(h.engine.save(), Err(Error::NotStarted)));
}

#[test]
fn round_trip_restores_state_and_blackboard() {
    let h = heating_engine(23, 2);
    let json = h.engine.to_json().unwrap();

    let document = Document::parse(&json).unwrap();
    let restored =
        Engine::from_document(Arc::clone(h.engine.machine()), &document, &Blackboard::new())
            .unwrap();

    assert_eq!(restored.current_as::<Heating>(), Some(&Heating { target: 23 }));
    assert_eq!(
        restored.blackboard().get::<Settings>().unwrap(),
        &Settings { offset: 2 }
    );
    assert_eq!(restored.to_json().unwrap(), json);
}

#[test]
fn round_trip_keeps_entries_equal_to_their_baseline() {
    let h = heating_engine(23, 0);
    let document = h.engine.save().unwrap();
    assert!(!document.blackboard.contains_key("settings"));

    let restored =
        Engine::from_document(Arc::clone(h.engine.machine()), &document, &Blackboard::new())
            .unwrap();

    assert_eq!(
        restored.blackboard().get::<Settings>().unwrap(),
        &Settings::default()
    );
    assert_eq!(restored.blackboard().len(), h.engine.blackboard().len());
}

#[test]
fn serializing_twice_is_byte_identical() {
    let h = heating_engine(23, 2);
    assert_eq!(h.engine.to_json().unwrap(), h.engine.to_json().unwrap());
}

#[test]
fn baseline_entries_are_omitted() {
    let h = heating_engine(0, 0);
    let document = h.engine.save().unwrap();

    assert_eq!(document.owner, "heater");
    assert_eq!(document.state, "heating");
    assert!(document.blackboard.is_empty());
    assert_eq!(
        h.engine.to_json().unwrap(),
        r#"{"$type":"heater","state":"heating","blackboard":{}}"#
    );
}

#[test]
fn restore_runs_no_hooks_and_notifies_no_observers() {
    let source = heating_engine(23, 2);
    let document = source.engine.save().unwrap();

    let mut h = Harness::started();
    let (states, count) = counter();
    let _binding = h
        .engine
        .bind()
        .when::<HeaterState, _>(move |_| *count.borrow_mut() += 1);

    h.engine.restore(&document, &Blackboard::new()).unwrap();

    assert!(h.take().is_empty());
    assert_eq!(*states.borrow(), 0);
    assert!(h.engine.current_as::<Heating>().is_some());
}

#[test]
fn unknown_blackboard_id_leaves_engine_untouched() {
    let mut h = heating_engine(23, 2);
    let document = Document::parse(
        r#"{
            "$type": "heater",
            "state": "idle",
            "blackboard": { "settings": { "offset": 5 }, "calibration": { "gain": 2 } }
        }"#,
    )
    .unwrap();

    let err = h.engine.restore(&document, &Blackboard::new()).unwrap_err();

    assert!(matches!(err, Error::UnknownTypeId { ref id } if id == "calibration"));
    assert_eq!(h.engine.current_as::<Heating>(), Some(&Heating { target: 23 }));
    assert_eq!(h.engine.blackboard().get::<Settings>().unwrap().offset, 2);
}

#[test]
fn missing_document_fields_are_malformed() {
    let err = Document::parse(r#"{ "$type": "heater", "blackboard": {} }"#).unwrap_err();
    assert!(matches!(err, Error::MalformedDocument { .. }));
}

// ---- upgrades -----------------------------------------------------------

mod upgrades {
    use super::*;
    use strata::{Fault, Outdated, UpgradeView};

    strata::abstract_kinds! {
        pub struct ThermoState;
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct ReadingV1 {
        celsius: i32,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct ReadingV2 {
        tenths: i32,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Reading {
        millis: i64,
        unit: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Calibration {
        offset_tenths: i32,
    }

    struct DisplayUnit(&'static str);
    struct Thermostat;

    impl State for ReadingV1 {}
    impl State for ReadingV2 {}
    impl State for Reading {}

    impl Outdated for ReadingV1 {
        type Next = ReadingV2;

        fn upgrade(self, view: &UpgradeView<'_>) -> Result<ReadingV2, Fault> {
            let offset = view
                .get::<Calibration>()
                .map(|calibration| calibration.offset_tenths)
                .unwrap_or(0);
            Ok(ReadingV2 {
                tenths: self.celsius * 10 + offset,
            })
        }
    }

    impl Outdated for ReadingV2 {
        type Next = Reading;

        fn upgrade(self, view: &UpgradeView<'_>) -> Result<Reading, Fault> {
            let unit = view.get::<DisplayUnit>()?.0.to_string();
            Ok(Reading {
                millis: i64::from(self.tenths) * 100,
                unit,
            })
        }
    }

    fn machine(max_upgrade_steps: usize) -> Arc<Machine> {
        let registry = TypeRegistry::builder()
            .root::<ThermoState>("thermo")
            .outdated_state::<ReadingV1, ThermoState>("reading.v1")
            .outdated_state::<ReadingV2, ThermoState>("reading.v2")
            .state::<Reading, ThermoState>("reading")
            .data::<Calibration>("calibration")
            .owner::<Thermostat>("thermostat")
            .build()
            .unwrap();
        let machine = Machine::builder(Arc::new(registry))
            .owner::<Thermostat>()
            .initial::<Reading>()
            .config(EngineConfig {
                max_upgrade_steps,
                ..EngineConfig::default()
            })
            .build()
            .unwrap();
        Arc::new(machine)
    }

    const V1_DOCUMENT: &str = r#"{
        "$type": "thermostat",
        "state": "reading.v1",
        "blackboard": {
            "reading.v1": { "celsius": 21 },
            "calibration": { "offset_tenths": 3 }
        }
    }"#;

    #[test]
    fn three_version_chain_reaches_current_kind() {
        let mut deps = Blackboard::new();
        deps.set(DisplayUnit("celsius")).unwrap();
        let document = Document::parse(V1_DOCUMENT).unwrap();

        let engine = Engine::from_document(machine(16), &document, &deps).unwrap();

        assert_eq!(
            engine.current_as::<Reading>(),
            Some(&Reading {
                millis: 21_300,
                unit: "celsius".to_string()
            })
        );
        assert_eq!(engine.save().unwrap().state, "reading");
    }

    #[test]
    fn failing_upgrade_names_the_outdated_state() {
        let document = Document::parse(V1_DOCUMENT).unwrap();

        let err = Engine::from_document(machine(16), &document, &Blackboard::new()).unwrap_err();

        assert!(matches!(err, Error::Upgrade { ref id, .. } if id == "reading.v2"));
    }

    #[test]
    fn upgrade_chain_is_bounded() {
        let mut deps = Blackboard::new();
        deps.set(DisplayUnit("celsius")).unwrap();
        let document = Document::parse(V1_DOCUMENT).unwrap();

        let err = Engine::from_document(machine(1), &document, &deps).unwrap_err();

        assert!(matches!(err, Error::UpgradeLimit { limit: 1, .. }));
    }

    #[test]
    fn outdated_kinds_cannot_be_transitioned_to() {
        let machine = machine(16);
        let result = machine.registry().instantiate(strata::Kind::of::<ReadingV1>());
        assert!(matches!(result, Err(Error::OutdatedKind { .. })));
    }
}
