//! Cooperative cancellation for background tasks.
//!
//! A background task and the thread that started it share exactly one
//! [`CancelStatus`]. Its [`CancelState`] only ever moves forward:
//!
//! ```text
//! None ──▶ Requested ──▶ Processing ──▶ Completed
//! ```
//!
//! States may be skipped (a task that finishes normally goes straight from
//! `None` to `Completed`) but never revisited. The initiator may only request
//! cancellation; the worker acknowledges it at its own checkpoints by moving
//! to `Processing` and finally `Completed`. Nothing is ever forcibly stopped.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::CancelStateError;
use crate::signal::Signal;

/// The forward-only state of a cancelable task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum CancelState {
    /// No cancellation has been requested.
    #[default]
    None = 0,
    /// The initiator asked the task to stop.
    Requested = 1,
    /// The task observed the request and is winding down.
    Processing = 2,
    /// The task has finished, cancelled or not.
    Completed = 3,
}

impl CancelState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Requested,
            2 => Self::Processing,
            _ => Self::Completed,
        }
    }
}

impl fmt::Display for CancelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Requested => "REQUESTED",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}

struct CancelInner {
    state: AtomicU8,
    cancelable: bool,
    /// Set once a cancellation request has been accepted.
    requested: AtomicU8,
    /// Set once the task moved from `Requested` to `Processing`.
    acknowledged: AtomicU8,
    changed: Signal<CancelState>,
}

/// Shared, forward-only cancellation state of one background task.
#[derive(Clone)]
pub struct CancelStatus {
    inner: Arc<CancelInner>,
}

impl CancelStatus {
    /// Create a status in the `None` state.
    pub fn new(cancelable: bool) -> Self {
        Self {
            inner: Arc::new(CancelInner {
                state: AtomicU8::new(CancelState::None as u8),
                cancelable,
                requested: AtomicU8::new(0),
                acknowledged: AtomicU8::new(0),
                changed: Signal::new(),
            }),
        }
    }

    /// The current state.
    #[inline]
    pub fn state(&self) -> CancelState {
        CancelState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Whether the task accepts cancellation requests.
    pub fn is_cancelable(&self) -> bool {
        self.inner.cancelable
    }

    /// Whether cancellation has been requested at any point.
    pub fn was_cancel_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire) != 0
    }

    /// Whether the task acknowledged a cancellation request, moving from
    /// `Requested` to `Processing`.
    pub fn was_cancel_acknowledged(&self) -> bool {
        self.inner.acknowledged.load(Ordering::Acquire) != 0
    }

    /// Ask the task to stop.
    ///
    /// Only moves `None` to `Requested`. Returns `Ok(true)` if this call made
    /// the transition and `Ok(false)` if the task was already past `None`
    /// (a repeated request is a no-op).
    pub fn request_cancel(&self) -> Result<bool, CancelStateError> {
        if !self.inner.cancelable {
            return Err(CancelStateError::NotCancelable);
        }
        let swapped = self.inner.state.compare_exchange(
            CancelState::None as u8,
            CancelState::Requested as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        match swapped {
            Ok(_) => {
                self.inner.requested.store(1, Ordering::Release);
                tracing::debug!(target: "horizon_forge::background", "cancellation requested");
                self.inner.changed.emit(CancelState::Requested);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Move the state forward to `to`.
    ///
    /// Setting the current state again is a no-op returning `Ok(false)`;
    /// moving backwards fails with [`CancelStateError::Regression`].
    pub fn advance(&self, to: CancelState) -> Result<bool, CancelStateError> {
        let mut current = self.inner.state.load(Ordering::Acquire);
        loop {
            let from = CancelState::from_u8(current);
            if from == to {
                return Ok(false);
            }
            if from > to {
                return Err(CancelStateError::Regression { from, to });
            }
            match self.inner.state.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if to == CancelState::Requested {
                        self.inner.requested.store(1, Ordering::Release);
                    }
                    if from == CancelState::Requested && to == CancelState::Processing {
                        self.inner.acknowledged.store(1, Ordering::Release);
                    }
                    self.inner.changed.emit(to);
                    return Ok(true);
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Mark the task finished, whatever state it reached.
    pub fn complete(&self) {
        // Completed is the last state, so this can never regress.
        let _ = self.advance(CancelState::Completed);
    }

    /// Signal emitted with the new state after every transition.
    pub fn on_changed(&self) -> &Signal<CancelState> {
        &self.inner.changed
    }
}

impl fmt::Debug for CancelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelStatus")
            .field("state", &self.state())
            .field("cancelable", &self.inner.cancelable)
            .finish()
    }
}

static_assertions::assert_impl_all!(CancelStatus: Send, Sync);
