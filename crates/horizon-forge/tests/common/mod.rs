//! Widget fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use horizon_forge::{
    BuildResult, ChainOutcome, ChainStatus, EngineBuilder, Engine, EventHandler, TypeDescriptor, Value,
};
use horizon_forge_core::{Bound, EventType, ObjectRef, Property, QueuedDispatcher};

/// A top-level window.
#[derive(Default)]
pub struct Frame {
    pub title: Property<String>,
    pub children: Mutex<Vec<ObjectRef>>,
}

/// A container.
#[derive(Default)]
pub struct Panel {
    pub children: Mutex<Vec<ObjectRef>>,
}

/// A push button.
#[derive(Default)]
pub struct Button {
    pub text: Property<String>,
    pub on_action: Bound<EventHandler>,
}

/// A single-line text input.
#[derive(Default)]
pub struct TextField {
    pub text: Property<String>,
    pub columns: Property<i64>,
    pub on_action: Bound<EventHandler>,
}

/// A read-only text.
#[derive(Default)]
pub struct Label {
    pub text: Property<String>,
}

/// Ordered record of side effects, shared between threads.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Route engine logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An engine builder knowing the fixture widgets.
pub fn engine_builder() -> EngineBuilder {
    init_tracing();
    Engine::builder()
        .register_type(
            TypeDescriptor::builder::<Frame>("JFrame", Frame::default)
                .extends("Container")
                .localized("title", |frame, title| {
                    frame.title.set(title);
                })
                .children(|frame, child| {
                    frame.children.lock().push(child.clone());
                    Ok(())
                })
                .build(),
        )
        .register_type(
            TypeDescriptor::builder::<Panel>("JPanel", Panel::default)
                .extends("Container")
                .extends("JComponent")
                .children(|panel, child| {
                    panel.children.lock().push(child.clone());
                    Ok(())
                })
                .build(),
        )
        .register_type(
            TypeDescriptor::builder::<Button>("JButton", Button::default)
                .extends("AbstractButton")
                .localized("text", |button, text| {
                    button.text.set(text);
                })
                .event("onAction", EventType::ACTION, |button, handler| button.on_action.set(handler))
                .reader("text", |button| Value::Str(button.text.get()))
                .build(),
        )
        .register_type(
            TypeDescriptor::builder::<TextField>("JTextField", TextField::default)
                .extends("JComponent")
                .string("text", |field, text| {
                    field.text.set(text);
                })
                .int("columns", |field, columns| {
                    field.columns.set(columns);
                })
                .event("onAction", EventType::ACTION, |field, handler| field.on_action.set(handler))
                .reader("text", |field| Value::Str(field.text.get()))
                .reader("columns", |field| Value::Int(field.columns.get()))
                .build(),
        )
        .register_type(
            TypeDescriptor::builder::<Label>("JLabel", Label::default)
                .extends("JComponent")
                .localized("text", |label, text| {
                    label.text.set(text);
                })
                .reader("text", |label| Value::Str(label.text.get()))
                .build(),
        )
        .register_type(
            TypeDescriptor::builder::<()>("AbstractButton", || ())
                .extends("JComponent")
                .build(),
        )
}

/// An engine with the fixture widgets and default settings.
pub fn engine() -> Engine {
    engine_builder().build().unwrap()
}

/// Fire the action handler of the button named `name`.
pub fn click(result: &BuildResult, name: &str) -> ChainStatus {
    let source = result.get(name).unwrap().clone();
    let handler = result
        .get_as::<Button>(name)
        .and_then(|button| button.on_action.get())
        .unwrap();
    handler.fire_from(source)
}

/// Pump `dispatcher` until the pending chain behind `status` finished.
pub fn pump_until_finished(dispatcher: &QueuedDispatcher, status: &ChainStatus) -> ChainOutcome {
    let Some(ticket) = status.ticket() else {
        return status.outcome().unwrap();
    };
    let deadline = Instant::now() + Duration::from_secs(5);
    while !ticket.is_finished() {
        assert!(Instant::now() < deadline, "chain did not finish in time");
        dispatcher.wait_and_process(Duration::from_millis(10));
    }
    // Run anything the last step queued after resolving the ticket.
    dispatcher.process_pending();
    ticket.outcome().unwrap()
}
