//! Core systems for Horizon Forge.
//!
//! This crate provides the runtime plumbing the builder engine stands on:
//!
//! - **Object Model**: Type-erased shared objects with safe downcasting
//! - **Meta-objects**: Explicit caller introspection (fields, handler methods)
//! - **Signal/Slot System**: Type-safe notifications with queued delivery
//! - **Property System**: Interior-mutable reactive values and bound slots
//! - **UI Dispatch**: The "run this on the initiating thread" primitive
//! - **Thread Pool**: Background execution on rayon workers
//! - **Cancellation & Progress**: Forward-only cancel state and progress reporting
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_forge_core::{Property, Signal};
//!
//! struct Counter {
//!     value: Property<i32>,
//!     value_changed: Signal<i32>,
//! }
//!
//! impl Counter {
//!     fn increment(&self) {
//!         let new_value = self.value.get() + 1;
//!         if self.value.set(new_value) {
//!             self.value_changed.emit(new_value);
//!         }
//!     }
//! }
//!
//! let counter = Counter { value: Property::new(0), value_changed: Signal::new() };
//! counter.value_changed.connect(|value| println!("now {value}"));
//! counter.increment();
//! assert_eq!(counter.value.get(), 1);
//! ```
//!
//! # Background Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use horizon_forge_core::{QueuedDispatcher, ThreadPool};
//!
//! let pool = ThreadPool::global().expect("thread pool");
//! let ui = Arc::new(QueuedDispatcher::new());
//!
//! pool.spawn_with_callback(ui.clone(), || 40 + 2, |answer| {
//!     println!("answer delivered on the UI thread: {answer:?}");
//! });
//!
//! ui.wait_and_process(std::time::Duration::from_secs(1));
//! ```

pub mod cancel;
mod error;
pub mod event;
pub mod invocation;
pub mod logging;
pub mod meta;
pub mod object;
pub mod progress;
pub mod property;
pub mod signal;
pub mod task;
pub mod threadpool;

pub use cancel::{CancelState, CancelStatus};
pub use error::{CancelStateError, ForgeError, ObjectError, Result, ThreadPoolError};
pub use event::{Event, EventPayload, EventType};
pub use invocation::{
    DirectDispatcher, QueuedDispatcher, QueuedInvocation, UiDispatcher, install_ui_dispatcher,
    ui_dispatcher,
};
pub use logging::PerfSpan;
pub use meta::{
    Caller, CallerRef, DeclaredType, FieldMeta, HandlerOutcome, Invocable, MetaObject,
    MetaObjectBuilder, MethodMeta,
};
pub use object::{Object, ObjectRef, object_cast};
pub use progress::{ProgressReporter, ProgressUpdate};
pub use property::{Bound, Property};
pub use signal::{ConnectionId, ConnectionType, Signal};
pub use task::{BackgroundEvent, BackgroundTaskDescriptor};
pub use threadpool::{ThreadPool, ThreadPoolConfig};
