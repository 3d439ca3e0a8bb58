//! Progress reporting for background tasks.
//!
//! A [`ProgressReporter`] tracks an integer value inside a `[start, end]`
//! range plus an optional status message. Workers update it from their own
//! thread; the engine relays the `updated` signal to background listeners.
//!
//! # Example
//!
//! ```
//! use horizon_forge_core::progress::ProgressReporter;
//!
//! let reporter = ProgressReporter::new(1, 100);
//! reporter.on_updated().connect(|update| {
//!     println!("{}/{} {:?}", update.value, update.end, update.message);
//! });
//!
//! reporter.set_value(50);
//! reporter.set_message("Halfway there");
//! assert!((reporter.fraction() - 0.4949).abs() < 0.01);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use parking_lot::Mutex;

use crate::signal::Signal;

/// A progress update containing the value, its range and an optional message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Current progress value.
    pub value: i32,
    /// Lower bound of the range.
    pub start: i32,
    /// Upper bound of the range.
    pub end: i32,
    /// Optional status message describing the current operation.
    pub message: Option<String>,
}

struct ProgressInner {
    start: i32,
    end: i32,
    value: AtomicI32,
    indeterminate: AtomicBool,
    message: Mutex<Option<String>>,
    updated: Signal<ProgressUpdate>,
}

impl ProgressInner {
    fn snapshot(&self) -> ProgressUpdate {
        ProgressUpdate {
            value: self.value.load(Ordering::Acquire),
            start: self.start,
            end: self.end,
            message: self.message.lock().clone(),
        }
    }
}

/// A thread-safe progress reporter bounded to an integer range.
///
/// Values outside the range are clamped. The `updated` signal fires whenever
/// the value or the message changes.
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<ProgressInner>,
}

impl ProgressReporter {
    /// Create a reporter for `[start, end]`, starting at `start`.
    pub fn new(start: i32, end: i32) -> Self {
        let (start, end) = (start.min(end), start.max(end));
        Self {
            inner: Arc::new(ProgressInner {
                start,
                end,
                value: AtomicI32::new(start),
                indeterminate: AtomicBool::new(false),
                message: Mutex::new(None),
                updated: Signal::new(),
            }),
        }
    }

    /// Lower bound of the range.
    pub fn start(&self) -> i32 {
        self.inner.start
    }

    /// Upper bound of the range.
    pub fn end(&self) -> i32 {
        self.inner.end
    }

    /// Current value.
    pub fn value(&self) -> i32 {
        self.inner.value.load(Ordering::Acquire)
    }

    /// Set the value, clamped to the range. Emits `updated` on change.
    pub fn set_value(&self, value: i32) {
        let clamped = value.clamp(self.inner.start, self.inner.end);
        let old = self.inner.value.swap(clamped, Ordering::AcqRel);
        if old != clamped {
            self.inner.updated.emit(self.inner.snapshot());
        }
    }

    /// Current status message.
    pub fn message(&self) -> Option<String> {
        self.inner.message.lock().clone()
    }

    /// Set the status message. Always emits `updated`.
    pub fn set_message(&self, message: impl Into<String>) {
        *self.inner.message.lock() = Some(message.into());
        self.inner.updated.emit(self.inner.snapshot());
    }

    /// Update value and message together, emitting `updated` once.
    pub fn update(&self, value: i32, message: impl Into<String>) {
        let clamped = value.clamp(self.inner.start, self.inner.end);
        self.inner.value.store(clamped, Ordering::Release);
        *self.inner.message.lock() = Some(message.into());
        self.inner.updated.emit(self.inner.snapshot());
    }

    /// Whether the task cannot report a meaningful value.
    pub fn is_indeterminate(&self) -> bool {
        self.inner.indeterminate.load(Ordering::Acquire)
    }

    /// Switch between determinate and indeterminate display.
    pub fn set_indeterminate(&self, indeterminate: bool) {
        self.inner.indeterminate.store(indeterminate, Ordering::Release);
    }

    /// Progress as a fraction of the range, from 0.0 to 1.0.
    pub fn fraction(&self) -> f32 {
        let span = self.inner.end - self.inner.start;
        if span == 0 {
            return 1.0;
        }
        (self.value() - self.inner.start) as f32 / span as f32
    }

    /// A snapshot of the current state.
    pub fn snapshot(&self) -> ProgressUpdate {
        self.inner.snapshot()
    }

    /// Signal emitted whenever value or message changes.
    pub fn on_updated(&self) -> &Signal<ProgressUpdate> {
        &self.inner.updated
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("value", &self.value())
            .field("start", &self.inner.start)
            .field("end", &self.inner.end)
            .field("message", &self.message())
            .finish()
    }
}

static_assertions::assert_impl_all!(ProgressReporter: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_reporter_basic() {
        let reporter = ProgressReporter::new(1, 100);

        assert_eq!(reporter.value(), 1);
        assert_eq!(reporter.message(), None);

        reporter.set_value(40);
        assert_eq!(reporter.value(), 40);

        reporter.update(75, "Almost done");
        assert_eq!(reporter.value(), 75);
        assert_eq!(reporter.message().as_deref(), Some("Almost done"));
    }

    #[test]
    fn test_value_clamping() {
        let reporter = ProgressReporter::new(0, 10);

        reporter.set_value(-5);
        assert_eq!(reporter.value(), 0);

        reporter.set_value(50);
        assert_eq!(reporter.value(), 10);
        assert_eq!(reporter.fraction(), 1.0);
    }

    #[test]
    fn test_reversed_bounds_are_normalized() {
        let reporter = ProgressReporter::new(100, 1);
        assert_eq!((reporter.start(), reporter.end()), (1, 100));
    }

    #[test]
    fn test_updated_signal_skips_unchanged_value() {
        let reporter = ProgressReporter::new(0, 10);
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = count.clone();
        reporter.on_updated().connect(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        reporter.set_value(3);
        reporter.set_value(3);
        reporter.set_message("working");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_snapshot_carries_range() {
        let reporter = ProgressReporter::new(1, 5);
        reporter.update(2, "step two");

        let snapshot = reporter.snapshot();
        assert_eq!(
            snapshot,
            ProgressUpdate {
                value: 2,
                start: 1,
                end: 5,
                message: Some("step two".to_string()),
            }
        );
    }

    #[test]
    fn test_reporter_clone_shares_state() {
        let a = ProgressReporter::new(0, 100);
        let b = a.clone();

        a.set_value(50);
        assert_eq!(b.value(), 50);
        b.set_indeterminate(true);
        assert!(a.is_indeterminate());
    }
}
