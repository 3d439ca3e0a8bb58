//! Queued invocations and the "dispatch to UI thread" primitive.
//!
//! Horizon Forge never owns the host toolkit's event loop. Instead, anything
//! that must run on the initiating (UI) thread is wrapped in a
//! [`QueuedInvocation`] and handed to a [`UiDispatcher`]:
//!
//! - [`DirectDispatcher`] executes invocations immediately on whatever thread
//!   hands them over. This is the default for headless use.
//! - [`QueuedDispatcher`] buffers invocations in a channel that the host pumps
//!   from its UI thread via [`QueuedDispatcher::process_pending`].
//!
//! A process-wide dispatcher can be installed once with
//! [`install_ui_dispatcher`]; queued signal connections use it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::ThreadId;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;

use crate::error::ForgeError;

/// Global invocation counter for unique IDs.
static NEXT_INVOCATION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide dispatcher used by queued signal connections.
static UI_DISPATCHER: OnceLock<Arc<dyn UiDispatcher>> = OnceLock::new();

/// A type-erased invocation that can be executed later, possibly on another thread.
pub struct QueuedInvocation {
    id: u64,
    invoke: Box<dyn FnOnce() + Send>,
}

impl QueuedInvocation {
    /// Create a new queued invocation.
    pub fn new<F>(invoke: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: NEXT_INVOCATION_ID.fetch_add(1, Ordering::Relaxed),
            invoke: Box::new(invoke),
        }
    }

    /// The unique ID of this invocation.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Execute the invocation.
    pub fn execute(self) {
        (self.invoke)();
    }
}

impl std::fmt::Debug for QueuedInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedInvocation").field("id", &self.id).finish()
    }
}

/// Hands work over to the initiating (UI) execution context.
pub trait UiDispatcher: Send + Sync {
    /// Schedule an invocation on the UI context.
    fn dispatch(&self, invocation: QueuedInvocation);

    /// Whether the calling thread is the UI thread, if the dispatcher knows.
    fn is_ui_thread(&self) -> Option<bool> {
        None
    }
}

/// A dispatcher that runs every invocation immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectDispatcher;

impl UiDispatcher for DirectDispatcher {
    fn dispatch(&self, invocation: QueuedInvocation) {
        invocation.execute();
    }
}

/// A dispatcher backed by a channel that the UI thread pumps explicitly.
///
/// Invocations may be dispatched from any thread; they only run when the
/// owner calls [`process_pending`](Self::process_pending) or
/// [`wait_and_process`](Self::wait_and_process).
pub struct QueuedDispatcher {
    sender: Sender<QueuedInvocation>,
    receiver: Receiver<QueuedInvocation>,
    ui_thread: Mutex<Option<ThreadId>>,
}

impl QueuedDispatcher {
    /// Create a dispatcher whose UI thread is the calling thread.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            ui_thread: Mutex::new(Some(std::thread::current().id())),
        }
    }

    /// Number of invocations waiting to be processed.
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Run every invocation that is currently queued. Returns how many ran.
    pub fn process_pending(&self) -> usize {
        self.claim_ui_thread();
        let mut count = 0;
        while let Ok(invocation) = self.receiver.try_recv() {
            invocation.execute();
            count += 1;
        }
        count
    }

    /// Block up to `timeout` for one invocation, run it and everything queued
    /// behind it. Returns `true` if anything ran.
    pub fn wait_and_process(&self, timeout: Duration) -> bool {
        self.claim_ui_thread();
        match self.receiver.recv_timeout(timeout) {
            Ok(invocation) => {
                invocation.execute();
                self.process_pending();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    fn claim_ui_thread(&self) {
        *self.ui_thread.lock() = Some(std::thread::current().id());
    }
}

impl Default for QueuedDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl UiDispatcher for QueuedDispatcher {
    fn dispatch(&self, invocation: QueuedInvocation) {
        tracing::trace!(target: "horizon_forge_core::dispatch", id = invocation.id(), "queueing invocation");
        // The receiver lives as long as `self`, so sending cannot fail.
        let _ = self.sender.send(invocation);
    }

    fn is_ui_thread(&self) -> Option<bool> {
        let ui_thread = *self.ui_thread.lock();
        ui_thread.map(|id| id == std::thread::current().id())
    }
}

impl std::fmt::Debug for QueuedDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedDispatcher")
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Install the process-wide UI dispatcher.
///
/// Must happen before the first queued signal emission; fails if a
/// dispatcher is already installed.
pub fn install_ui_dispatcher(dispatcher: Arc<dyn UiDispatcher>) -> Result<(), ForgeError> {
    UI_DISPATCHER
        .set(dispatcher)
        .map_err(|_| ForgeError::DispatcherAlreadyInstalled)
}

/// The installed process-wide UI dispatcher, if any.
pub fn ui_dispatcher() -> Option<Arc<dyn UiDispatcher>> {
    UI_DISPATCHER.get().cloned()
}

static_assertions::assert_impl_all!(QueuedDispatcher: Send, Sync);
