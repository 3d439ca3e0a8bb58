//! Tests for handler resolution and synchronous chain execution.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use horizon_forge::{
    AutoPrompt, BuildError, BuildResult, ChainError, ChainOutcome, ChainStatus, Node, Value,
};
use horizon_forge_core::{Caller, Event, EventType, MetaObject, ObjectRef, Property};

use common::{Button, TextField, click, engine, engine_builder};

/// Records which signature of `handle` ran.
#[derive(Default)]
struct SignatureForm {
    calls: Mutex<Vec<&'static str>>,
}

impl Caller for SignatureForm {
    fn meta_object() -> MetaObject {
        // Declared worst first; declaration order must not matter.
        MetaObject::builder::<SignatureForm>("SignatureForm")
            .method("handle", |form: &SignatureForm| form.calls.lock().push("()"))
            .method_with_source::<Button, _, _>("handle", |form: &SignatureForm, _: &Button| {
                form.calls.lock().push("(source)")
            })
            .method_with_event("handle", EventType::ACTION, |form: &SignatureForm, _: &Event| {
                form.calls.lock().push("(event)")
            })
            .method_with_source_and_event::<Button, _, _>(
                "handle",
                EventType::ACTION,
                |form: &SignatureForm, _: &Button, _: &Event| form.calls.lock().push("(source, event)"),
            )
            .method_with_source::<Button, _, _>("pick", |form: &SignatureForm, _: &Button| {
                form.calls.lock().push("(source)")
            })
            .method("pick", |form: &SignatureForm| form.calls.lock().push("()"))
            .build()
    }
}

#[test]
fn test_signature_preference_order() {
    let form = Arc::new(SignatureForm::default());
    let tree = Node::new("JPanel")
        .child(Node::new("JButton").with("name", "btnHandle").with("onAction", "handle"))
        .child(Node::new("JButton").with("name", "btnPick").with("onAction", "pick"))
        .child(Node::new("JTextField").with("name", "txtHandle").with("onAction", "handle"));
    let result = engine().build(form.clone(), &tree, Vec::new()).unwrap();

    click(&result, "btnHandle");
    click(&result, "btnPick");

    // The concrete source signatures do not accept a text field.
    let field = result.get_as::<TextField>("txtHandle").unwrap();
    field
        .on_action
        .get()
        .unwrap()
        .fire_from(result.get("txtHandle").unwrap().clone());

    assert_eq!(*form.calls.lock(), ["(source, event)", "(source)", "(event)"]);
}

#[test]
fn test_resolution_is_cached_per_source_type() {
    let engine = engine();
    let tree = Node::new("JPanel")
        .child(Node::new("JButton").with("name", "btnOne").with("onAction", "handle"))
        .child(Node::new("JButton").with("name", "btnTwo").with("onAction", "handle"));

    engine.build(Arc::new(SignatureForm::default()), &tree, Vec::new()).unwrap();
    assert_eq!(engine.handler_resolver().cached_resolutions(), 1);

    engine.build(Arc::new(SignatureForm::default()), &tree, Vec::new()).unwrap();
    assert_eq!(engine.handler_resolver().cached_resolutions(), 1);
}

#[derive(Default)]
struct CountingForm {
    a: AtomicUsize,
    b: AtomicUsize,
    c: AtomicUsize,
    allow: Property<bool>,
}

impl Caller for CountingForm {
    fn meta_object() -> MetaObject {
        MetaObject::builder::<CountingForm>("CountingForm")
            .method("a", |form: &CountingForm| {
                form.a.fetch_add(1, Ordering::SeqCst);
                form.allow.get()
            })
            .method("b", |form: &CountingForm| {
                form.b.fetch_add(1, Ordering::SeqCst);
            })
            .method("c", |form: &CountingForm| {
                form.c.fetch_add(1, Ordering::SeqCst);
                true
            })
            .method("broken", |_: &CountingForm| -> Result<(), String> { Err("disk full".to_string()) })
            .method("explode", |_: &CountingForm| -> bool { panic!("boom") })
            .build()
    }
}

fn chain_tree(chain: Value) -> Node {
    Node::new("JPanel").child(Node::new("JButton").with("name", "btnGo").with("onAction", chain))
}

fn counts(form: &CountingForm) -> [usize; 3] {
    [
        form.a.load(Ordering::SeqCst),
        form.b.load(Ordering::SeqCst),
        form.c.load(Ordering::SeqCst),
    ]
}

#[test]
fn test_false_aborts_the_rest_of_the_chain() {
    let form = Arc::new(CountingForm::default());
    let tree = chain_tree(Value::from(vec!["a", "b", "c"]));
    let result = engine().build(form.clone(), &tree, Vec::new()).unwrap();

    let status = click(&result, "btnGo");
    assert!(matches!(status, ChainStatus::Aborted));
    assert_eq!(counts(&form), [1, 0, 0]);

    form.allow.set(true);
    let status = click(&result, "btnGo");
    assert!(matches!(status, ChainStatus::Completed));
    assert_eq!(counts(&form), [2, 1, 1]);
}

#[test]
fn test_nested_chains_flatten_in_order() {
    let form = Arc::new(CountingForm {
        allow: Property::new(true),
        ..Default::default()
    });
    let chain = Value::List(vec![Value::from("c"), Value::from(vec!["a", "b"])]);
    let result = engine().build(form.clone(), &chain_tree(chain), Vec::new()).unwrap();

    let handler = result.get_as::<Button>("btnGo").unwrap().on_action.get().unwrap();
    let names: Vec<_> = handler.steps().iter().map(|step| step.name().to_string()).collect();
    assert_eq!(names, ["c", "a", "b"]);

    assert_eq!(click(&result, "btnGo").outcome(), Some(ChainOutcome::Completed));
    assert_eq!(counts(&form), [1, 1, 1]);
}

#[test]
fn test_handler_errors_fail_the_chain() {
    let form = Arc::new(CountingForm::default());
    let result = engine()
        .build(form.clone(), &chain_tree(Value::from(vec!["broken", "c"])), Vec::new())
        .unwrap();

    match click(&result, "btnGo").outcome() {
        Some(ChainOutcome::Failed(ChainError::HandlerFailed { method, message })) => {
            assert_eq!(method, "broken");
            assert_eq!(message, "disk full");
        }
        other => panic!("expected a handler failure, got {other:?}"),
    }
    assert_eq!(form.c.load(Ordering::SeqCst), 0);
}

#[test]
fn test_handler_panics_are_contained() {
    let form = Arc::new(CountingForm::default());
    let result = engine()
        .build(form.clone(), &chain_tree(Value::from(vec!["explode", "c"])), Vec::new())
        .unwrap();

    match click(&result, "btnGo").outcome() {
        Some(ChainOutcome::Failed(ChainError::HandlerPanicked { method, message })) => {
            assert_eq!(method, "explode");
            assert_eq!(message, "boom");
        }
        other => panic!("expected a handler panic, got {other:?}"),
    }
    assert_eq!(form.c.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unresolvable_tokens_fail_the_build() {
    let engine = engine();

    let err = engine
        .build(Arc::new(CountingForm::default()), &chain_tree(Value::from("missing")), Vec::new())
        .unwrap_err();
    match err {
        BuildError::UnresolvedHandler { token, node, .. } => {
            assert_eq!(token, "missing");
            assert_eq!(node, "JPanel/JButton(btnGo)");
        }
        other => panic!("expected an unresolved handler, got {other}"),
    }

    let err = engine
        .build(Arc::new(CountingForm::default()), &chain_tree(Value::from(vec!["a", "$nope"])), Vec::new())
        .unwrap_err();
    assert!(matches!(err, BuildError::UnresolvedHandler { ref token, .. } if token == "$nope"));
}

#[test]
fn test_confirm_command_asks_the_prompt() {
    let prompt = Arc::new(AutoPrompt::no());
    let engine = engine_builder().prompt(prompt.clone()).build().unwrap();
    let form = Arc::new(CountingForm::default());
    let result = engine
        .build(form.clone(), &chain_tree(Value::from(vec!["$confirm", "c"])), Vec::new())
        .unwrap();

    assert!(matches!(click(&result, "btnGo"), ChainStatus::Aborted));
    assert_eq!(form.c.load(Ordering::SeqCst), 0);
    assert_eq!(
        prompt.questions(),
        [("Confirmation".to_string(), "Are you sure?".to_string())]
    );
}

#[test]
fn test_validate_command_reports_and_aborts() {
    let prompt = Arc::new(AutoPrompt::yes());
    let engine = engine_builder().prompt(prompt.clone()).build().unwrap();
    let form = Arc::new(CountingForm::default());
    let tree = Node::new("JPanel")
        .child(Node::new("JTextField").with("name", "txtUser"))
        .child(
            Node::new("JButton")
                .with("name", "btnGo")
                .with("onAction", Value::from(vec!["$validate", "c"])),
        )
        .child(Node::new("validate").with("txtUser.text", "mandatory"));
    let result = engine.build(form.clone(), &tree, Vec::new()).unwrap();

    assert!(matches!(click(&result, "btnGo"), ChainStatus::Aborted));
    assert_eq!(form.c.load(Ordering::SeqCst), 0);
    let reports = prompt.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0][0].message, "text is required");

    result.get_as::<TextField>("txtUser").unwrap().text.set("ada".to_string());
    assert!(matches!(click(&result, "btnGo"), ChainStatus::Completed));
    assert_eq!(form.c.load(Ordering::SeqCst), 1);
}

#[test]
fn test_custom_command_sees_result_and_source() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();
    let engine = engine_builder()
        .command("audit", move |result: &BuildResult, source: &ObjectRef| {
            let name = result
                .names()
                .find(|name| result.get(name).is_some_and(|object| object.same_object(source)));
            record.lock().push(name.unwrap_or("?").to_string());
            true
        })
        .build()
        .unwrap();
    let form = Arc::new(CountingForm::default());
    let result = engine
        .build(form.clone(), &chain_tree(Value::from(vec!["$audit", "c"])), Vec::new())
        .unwrap();

    assert!(matches!(click(&result, "btnGo"), ChainStatus::Completed));
    assert_eq!(*seen.lock(), ["btnGo"]);
}

#[test]
fn test_nested_build_shadows_parent_methods() {
    #[derive(Default)]
    struct Outer {
        log: Mutex<Vec<&'static str>>,
    }
    impl Caller for Outer {
        fn meta_object() -> MetaObject {
            MetaObject::builder::<Outer>("Outer")
                .method("close", |outer: &Outer| outer.log.lock().push("outer close"))
                .method("help", |outer: &Outer| outer.log.lock().push("outer help"))
                .build()
        }
    }

    #[derive(Default)]
    struct Inner {
        log: Mutex<Vec<&'static str>>,
    }
    impl Caller for Inner {
        fn meta_object() -> MetaObject {
            MetaObject::builder::<Inner>("Inner")
                .method("close", |inner: &Inner| inner.log.lock().push("inner close"))
                .build()
        }
    }

    let engine = engine();
    let outer = Arc::new(Outer::default());
    let parent = engine.build(outer.clone(), &Node::new("JPanel"), Vec::new()).unwrap();

    let inner = Arc::new(Inner::default());
    let tree = Node::new("JPanel").child(
        Node::new("JButton")
            .with("name", "btnGo")
            .with("onAction", Value::from(vec!["close", "help"])),
    );
    let result = engine.build_nested(&parent, inner.clone(), &tree, Vec::new()).unwrap();
    assert_eq!(result.callers().len(), 2);
    assert_eq!(result.caller().type_name(), "Inner");

    click(&result, "btnGo");
    assert_eq!(*inner.log.lock(), ["inner close"]);
    assert_eq!(*outer.log.lock(), ["outer help"]);
}

#[test]
fn test_handlers_fail_once_the_result_is_dropped() {
    let form = Arc::new(CountingForm::default());
    let result = engine()
        .build(form.clone(), &chain_tree(Value::from("c")), Vec::new())
        .unwrap();
    let button = result.get("btnGo").unwrap().clone();
    let handler = result.get_as::<Button>("btnGo").unwrap().on_action.get().unwrap();
    drop(result);

    let status = handler.fire_from(button);
    assert!(matches!(status, ChainStatus::Failed(ChainError::ResultDropped)));
    assert_eq!(form.c.load(Ordering::SeqCst), 0);
}
