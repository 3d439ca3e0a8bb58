//! Background task descriptors and the live handle given to background handlers.
//!
//! A handler method flagged for the background lane carries a
//! [`BackgroundTaskDescriptor`]. Each time the step runs, the engine creates a
//! fresh [`BackgroundEvent`] binding the descriptor to one [`CancelStatus`] and
//! one [`ProgressReporter`].
//!
//! # Example
//!
//! ```
//! use horizon_forge_core::task::{BackgroundEvent, BackgroundTaskDescriptor};
//!
//! let descriptor = BackgroundTaskDescriptor::new("save")
//!     .cancelable(true)
//!     .progress_range(0, 10);
//!
//! let event = BackgroundEvent::new(descriptor);
//! for step in 0..10 {
//!     if event.is_cancel_requested() {
//!         event.acknowledge_cancel();
//!         break;
//!     }
//!     event.set_progress_value(step + 1);
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::cancel::{CancelState, CancelStatus};
use crate::error::CancelStateError;
use crate::progress::{ProgressReporter, ProgressUpdate};
use crate::signal::Signal;

/// Default resource key for the progress message.
pub const DEFAULT_PROGRESS_MESSAGE_KEY: &str = "label.processing";

/// Static description of a background handler step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundTaskDescriptor {
    /// Name of the handler method.
    pub method: String,
    /// Resource key of the initial progress message.
    pub progress_message_key: String,
    /// Whether the initiator may request cancellation.
    pub cancelable: bool,
    /// Lower progress bound.
    pub progress_start: i32,
    /// Upper progress bound.
    pub progress_end: i32,
    /// Initial progress value.
    pub progress_value: i32,
    /// Whether the UI should block input while the task runs.
    pub blocking: bool,
    /// Whether the task cannot report meaningful progress.
    pub indeterminate: bool,
}

impl BackgroundTaskDescriptor {
    /// A descriptor with the default settings for `method`.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            progress_message_key: DEFAULT_PROGRESS_MESSAGE_KEY.to_string(),
            cancelable: false,
            progress_start: 1,
            progress_end: 100,
            progress_value: 1,
            blocking: true,
            indeterminate: true,
        }
    }

    /// Set the progress message resource key.
    pub fn message_key(mut self, key: impl Into<String>) -> Self {
        self.progress_message_key = key.into();
        self
    }

    /// Allow or forbid cancellation requests.
    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    /// Set the progress range. The initial value moves to `start`.
    ///
    /// Setting a range also marks the task as determinate.
    pub fn progress_range(mut self, start: i32, end: i32) -> Self {
        self.progress_start = start;
        self.progress_end = end;
        self.progress_value = start;
        self.indeterminate = false;
        self
    }

    /// Set the initial progress value.
    pub fn progress_value(mut self, value: i32) -> Self {
        self.progress_value = value;
        self
    }

    /// Whether the UI should block while the task runs.
    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Whether the task reports meaningful progress.
    pub fn indeterminate(mut self, indeterminate: bool) -> Self {
        self.indeterminate = indeterminate;
        self
    }

    /// Bind `method` to this descriptor's settings.
    pub(crate) fn for_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }
}

struct BackgroundInner {
    descriptor: BackgroundTaskDescriptor,
    cancel: CancelStatus,
    progress: ProgressReporter,
}

/// The live progress and cancellation handle of one background step run.
///
/// Cloning shares the same state; the initiator and the worker each hold one.
#[derive(Clone)]
pub struct BackgroundEvent {
    inner: Arc<BackgroundInner>,
}

impl BackgroundEvent {
    /// Create a handle in the `None` cancel state with the descriptor's
    /// initial progress.
    pub fn new(descriptor: BackgroundTaskDescriptor) -> Self {
        let progress = ProgressReporter::new(descriptor.progress_start, descriptor.progress_end);
        progress.set_indeterminate(descriptor.indeterminate);
        progress.set_value(descriptor.progress_value);
        Self {
            inner: Arc::new(BackgroundInner {
                cancel: CancelStatus::new(descriptor.cancelable),
                descriptor,
                progress,
            }),
        }
    }

    /// The descriptor this run was started from.
    pub fn descriptor(&self) -> &BackgroundTaskDescriptor {
        &self.inner.descriptor
    }

    /// The shared cancellation state.
    pub fn cancel_status(&self) -> &CancelStatus {
        &self.inner.cancel
    }

    /// Current cancellation state.
    pub fn cancel_state(&self) -> CancelState {
        self.inner.cancel.state()
    }

    /// Ask the worker to stop. See [`CancelStatus::request_cancel`].
    pub fn request_cancel(&self) -> Result<bool, CancelStateError> {
        self.inner.cancel.request_cancel()
    }

    /// Whether the initiator asked the worker to stop.
    ///
    /// Workers poll this at their own checkpoints.
    pub fn is_cancel_requested(&self) -> bool {
        self.inner.cancel.state() == CancelState::Requested
    }

    /// Worker side: acknowledge a cancellation request.
    pub fn acknowledge_cancel(&self) {
        if let Err(err) = self.inner.cancel.advance(CancelState::Processing) {
            tracing::debug!(target: "horizon_forge::background", %err, "cancel acknowledgement ignored");
        }
    }

    /// Whether the worker stopped at the initiator's request.
    ///
    /// A request the worker never acknowledged does not count: the worker ran
    /// to its normal end.
    pub fn was_cancelled(&self) -> bool {
        self.inner.cancel.was_cancel_acknowledged()
    }

    /// The progress reporter.
    pub fn progress(&self) -> &ProgressReporter {
        &self.inner.progress
    }

    /// Report a new progress value.
    pub fn set_progress_value(&self, value: i32) {
        self.inner.progress.set_value(value);
    }

    /// Report a new progress message.
    pub fn set_progress_message(&self, message: impl Into<String>) {
        self.inner.progress.set_message(message);
    }

    /// Signal emitted on every progress change.
    pub fn on_progress(&self) -> &Signal<ProgressUpdate> {
        self.inner.progress.on_updated()
    }

    /// Signal emitted on every cancel state transition.
    pub fn on_cancel_state(&self) -> &Signal<CancelState> {
        self.inner.cancel.on_changed()
    }
}

impl fmt::Debug for BackgroundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundEvent")
            .field("method", &self.inner.descriptor.method)
            .field("cancel", &self.cancel_state())
            .field("progress", &self.inner.progress.value())
            .finish()
    }
}

static_assertions::assert_impl_all!(BackgroundEvent: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = BackgroundTaskDescriptor::new("save");
        assert_eq!(descriptor.progress_message_key, "label.processing");
        assert!(!descriptor.cancelable);
        assert!(descriptor.blocking);
        assert!(descriptor.indeterminate);
        assert_eq!(
            (descriptor.progress_start, descriptor.progress_end, descriptor.progress_value),
            (1, 100, 1)
        );
    }

    #[test]
    fn test_event_starts_from_descriptor() {
        let event = BackgroundEvent::new(
            BackgroundTaskDescriptor::new("load").progress_range(0, 20).progress_value(5),
        );
        assert_eq!(event.progress().value(), 5);
        assert_eq!(event.progress().end(), 20);
        assert!(!event.progress().is_indeterminate());
        assert_eq!(event.cancel_state(), CancelState::None);
    }

    #[test]
    fn test_cooperative_cancel() {
        let event = BackgroundEvent::new(BackgroundTaskDescriptor::new("load").cancelable(true));
        let worker = event.clone();

        assert_eq!(event.request_cancel(), Ok(true));
        assert!(worker.is_cancel_requested());

        worker.acknowledge_cancel();
        assert_eq!(event.cancel_state(), CancelState::Processing);
        assert!(!worker.is_cancel_requested());
        assert!(event.was_cancelled());
    }

    #[test]
    fn test_late_request_is_not_a_cancellation() {
        let event = BackgroundEvent::new(BackgroundTaskDescriptor::new("load").cancelable(true));

        assert_eq!(event.request_cancel(), Ok(true));
        event.cancel_status().complete();
        assert!(!event.was_cancelled());
    }

    #[test]
    fn test_cancel_refused_when_not_cancelable() {
        let event = BackgroundEvent::new(BackgroundTaskDescriptor::new("load"));
        assert_eq!(event.request_cancel(), Err(CancelStateError::NotCancelable));
        assert!(!event.was_cancelled());
    }
}
