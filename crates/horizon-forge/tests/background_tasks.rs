//! Tests for background steps: ordering, progress, cancellation and failures.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use horizon_forge::{BackgroundListener, ChainError, ChainOutcome, ChainStatus, Engine, Node, ResourceBundle, Value};
use horizon_forge_core::{
    BackgroundEvent, BackgroundTaskDescriptor, Caller, CancelState, ConnectionType, Event, EventType, MetaObject,
    ProgressUpdate, Property, QueuedDispatcher, ThreadPoolConfig,
};

use common::{EventLog, click, engine_builder, event_log, pump_until_finished};

struct SaveForm {
    log: EventLog,
    valid: Property<bool>,
}

impl SaveForm {
    fn new(log: EventLog) -> Self {
        Self {
            log,
            valid: Property::new(true),
        }
    }

    fn record(&self, entry: &str) {
        self.log.lock().push(entry.to_string());
    }
}

impl Caller for SaveForm {
    fn meta_object() -> MetaObject {
        MetaObject::builder::<SaveForm>("SaveForm")
            .method("validate", |form: &SaveForm| {
                form.record("validate");
                form.valid.get()
            })
            .method_with_event("save", EventType::BACKGROUND, |form: &SaveForm, event: &Event| {
                form.record("save:start");
                thread::sleep(Duration::from_millis(20));
                form.record("save:end");
                if let Some(background) = event.background() {
                    background.set_progress_value(100);
                }
            })
            .in_background(
                BackgroundTaskDescriptor::new("save")
                    .message_key("label.saving")
                    .progress_range(0, 100),
            )
            .method_with_event("slowSave", EventType::BACKGROUND, |form: &SaveForm, event: &Event| {
                let Some(background) = event.background() else {
                    return false;
                };
                let deadline = Instant::now() + Duration::from_secs(5);
                while !background.is_cancel_requested() && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(5));
                }
                background.acknowledge_cancel();
                form.record("slowSave:stopped");
                true
            })
            .in_background(BackgroundTaskDescriptor::new("slowSave").cancelable(true))
            .method("quickSave", |form: &SaveForm| form.record("quickSave"))
            .in_background(BackgroundTaskDescriptor::new("quickSave").cancelable(true))
            .method("failSave", |form: &SaveForm| -> Result<(), String> {
                form.record("failSave");
                Err("disk full".to_string())
            })
            .in_background(BackgroundTaskDescriptor::new("failSave"))
            .method("crashSave", |_: &SaveForm| -> bool { panic!("worker exploded") })
            .in_background(BackgroundTaskDescriptor::new("crashSave"))
            .method("close", |form: &SaveForm| form.record("close"))
            .build()
    }
}

struct Recorder {
    log: EventLog,
    cancel_on_start: bool,
    cancel_requests: Mutex<Vec<bool>>,
    states: Arc<Mutex<Vec<CancelState>>>,
}

impl Recorder {
    fn new(log: EventLog, cancel_on_start: bool) -> Arc<Self> {
        Arc::new(Self {
            log,
            cancel_on_start,
            cancel_requests: Mutex::new(Vec::new()),
            states: Arc::new(Mutex::new(Vec::new())),
        })
    }
}

impl BackgroundListener for Recorder {
    fn started(&self, event: &BackgroundEvent) {
        let message = event.progress().message().unwrap_or_default();
        self.log.lock().push(format!("started {message}"));

        let states = self.states.clone();
        event
            .on_cancel_state()
            .connect_with_type(move |state: &CancelState| states.lock().push(*state), ConnectionType::Direct);

        if self.cancel_on_start {
            for _ in 0..2 {
                let requested = event.request_cancel().unwrap();
                self.cancel_requests.lock().push(requested);
            }
        }
    }

    fn ended(&self, event: &BackgroundEvent) {
        self.log.lock().push(format!("ended {}", event.cancel_state()));
    }

    fn progress(&self, _event: &BackgroundEvent, update: &ProgressUpdate) {
        self.log.lock().push(format!("progress {}", update.value));
    }
}

/// Records only its own lifecycle callbacks, tagged with `name`.
struct Tagged {
    name: &'static str,
    log: EventLog,
}

impl BackgroundListener for Tagged {
    fn started(&self, _event: &BackgroundEvent) {
        self.log.lock().push(format!("{} started", self.name));
    }

    fn ended(&self, _event: &BackgroundEvent) {
        self.log.lock().push(format!("{} ended", self.name));
    }
}

fn setup(chain: Value) -> (Arc<QueuedDispatcher>, Engine, Node) {
    let dispatcher = Arc::new(QueuedDispatcher::new());
    let engine = engine_builder()
        .ui_dispatcher(dispatcher.clone())
        .thread_pool(ThreadPoolConfig::with_threads(2))
        .global_bundle(ResourceBundle::from_pairs("app", [("label.saving", "Saving...")]))
        .build()
        .unwrap();
    let tree = Node::new("JPanel").child(Node::new("JButton").with("name", "btnSave").with("onAction", chain));
    (dispatcher, engine, tree)
}

#[test]
fn test_step_after_background_runs_after_completion() {
    let (dispatcher, engine, tree) = setup(Value::from(vec!["validate", "save", "close"]));
    let log = event_log();
    let result = engine.build(Arc::new(SaveForm::new(log.clone())), &tree, Vec::new()).unwrap();
    result.add_background_listener(Recorder::new(log.clone(), false));

    let status = click(&result, "btnSave");
    assert!(status.is_pending());
    assert!(!log.lock().contains(&"close".to_string()));

    assert_eq!(pump_until_finished(&dispatcher, &status), ChainOutcome::Completed);
    assert_eq!(
        *log.lock(),
        [
            "validate",
            "started Saving...",
            "save:start",
            "save:end",
            "progress 100",
            "ended COMPLETED",
            "close",
        ]
    );
}

#[test]
fn test_abort_before_background_never_starts_it() {
    let (_dispatcher, engine, tree) = setup(Value::from(vec!["validate", "save", "close"]));
    let log = event_log();
    let form = Arc::new(SaveForm::new(log.clone()));
    form.valid.set(false);
    let result = engine.build(form, &tree, Vec::new()).unwrap();
    result.add_background_listener(Recorder::new(log.clone(), false));

    let status = click(&result, "btnSave");
    assert!(matches!(status, ChainStatus::Aborted));
    assert_eq!(*log.lock(), ["validate"]);
}

#[test]
fn test_cancel_state_moves_forward_only() {
    let (dispatcher, engine, tree) = setup(Value::from(vec!["slowSave", "close"]));
    let log = event_log();
    let result = engine.build(Arc::new(SaveForm::new(log.clone())), &tree, Vec::new()).unwrap();
    let recorder = Recorder::new(log.clone(), true);
    result.add_background_listener(recorder.clone());

    let status = click(&result, "btnSave");
    assert_eq!(pump_until_finished(&dispatcher, &status), ChainOutcome::Aborted);

    // The second request on an already requested task is a no-op.
    assert_eq!(*recorder.cancel_requests.lock(), [true, false]);
    assert_eq!(
        *recorder.states.lock(),
        [CancelState::Requested, CancelState::Processing, CancelState::Completed]
    );
    assert_eq!(
        *log.lock(),
        ["started Processing...", "slowSave:stopped", "ended COMPLETED"]
    );
}

#[test]
fn test_background_failure_aborts_after_ended() {
    let (dispatcher, engine, tree) = setup(Value::from(vec!["failSave", "close"]));
    let log = event_log();
    let result = engine.build(Arc::new(SaveForm::new(log.clone())), &tree, Vec::new()).unwrap();
    result.add_background_listener(Recorder::new(log.clone(), false));

    let status = click(&result, "btnSave");
    match pump_until_finished(&dispatcher, &status) {
        ChainOutcome::Failed(ChainError::BackgroundFailed { method, message }) => {
            assert_eq!(method, "failSave");
            assert_eq!(message, "disk full");
        }
        other => panic!("expected a background failure, got {other:?}"),
    }
    assert_eq!(*log.lock(), ["started Processing...", "failSave", "ended COMPLETED"]);
}

#[test]
fn test_background_panic_is_a_failure() {
    let (dispatcher, engine, tree) = setup(Value::from(vec!["crashSave", "close"]));
    let log = event_log();
    let result = engine.build(Arc::new(SaveForm::new(log.clone())), &tree, Vec::new()).unwrap();
    result.add_background_listener(Recorder::new(log.clone(), false));

    let status = click(&result, "btnSave");
    match pump_until_finished(&dispatcher, &status) {
        ChainOutcome::Failed(ChainError::BackgroundFailed { method, message }) => {
            assert_eq!(method, "crashSave");
            assert_eq!(message, "worker exploded");
        }
        other => panic!("expected a background failure, got {other:?}"),
    }
    assert!(!log.lock().contains(&"close".to_string()));
}

#[test]
fn test_engine_listener_sees_every_run() {
    let dispatcher = Arc::new(QueuedDispatcher::new());
    let log = event_log();
    let engine_log = event_log();
    let engine = engine_builder()
        .ui_dispatcher(dispatcher.clone())
        .thread_pool(ThreadPoolConfig::with_threads(1))
        .background_listener(Recorder::new(engine_log.clone(), false))
        .build()
        .unwrap();
    let tree = Node::new("JButton").with("name", "btnSave").with("onAction", "save");
    let result = engine.build(Arc::new(SaveForm::new(log.clone())), &tree, Vec::new()).unwrap();

    let status = click(&result, "btnSave");
    assert_eq!(pump_until_finished(&dispatcher, &status), ChainOutcome::Completed);

    // Without a bundle entry the progress message is the raw key.
    assert_eq!(
        *engine_log.lock(),
        ["started label.saving", "progress 100", "ended COMPLETED"]
    );
    assert_eq!(*log.lock(), ["save:start", "save:end"]);
}

#[test]
fn test_unobserved_cancel_request_keeps_normal_result() {
    let (dispatcher, engine, tree) = setup(Value::from(vec!["quickSave", "close"]));
    let log = event_log();
    let result = engine.build(Arc::new(SaveForm::new(log.clone())), &tree, Vec::new()).unwrap();
    let recorder = Recorder::new(log.clone(), true);
    result.add_background_listener(recorder.clone());

    let status = click(&result, "btnSave");
    assert_eq!(pump_until_finished(&dispatcher, &status), ChainOutcome::Completed);

    assert_eq!(*recorder.cancel_requests.lock(), [true, false]);
    assert_eq!(*recorder.states.lock(), [CancelState::Requested, CancelState::Completed]);
    assert_eq!(
        *log.lock(),
        ["started Processing...", "quickSave", "ended COMPLETED", "close"]
    );
}

#[test]
fn test_engine_listeners_run_before_result_listeners() {
    let dispatcher = Arc::new(QueuedDispatcher::new());
    let calls = event_log();
    let engine = engine_builder()
        .ui_dispatcher(dispatcher.clone())
        .thread_pool(ThreadPoolConfig::with_threads(1))
        .background_listener(Arc::new(Tagged {
            name: "engine",
            log: calls.clone(),
        }))
        .build()
        .unwrap();
    let tree = Node::new("JButton").with("name", "btnSave").with("onAction", "save");
    let result = engine.build(Arc::new(SaveForm::new(event_log())), &tree, Vec::new()).unwrap();
    result.add_background_listener(Arc::new(Tagged {
        name: "result",
        log: calls.clone(),
    }));

    let status = click(&result, "btnSave");
    assert_eq!(pump_until_finished(&dispatcher, &status), ChainOutcome::Completed);
    assert_eq!(
        *calls.lock(),
        ["engine started", "result started", "engine ended", "result ended"]
    );
}
