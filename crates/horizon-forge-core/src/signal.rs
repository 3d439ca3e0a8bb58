//! Signal/slot system for Horizon Forge.
//!
//! Signals carry notifications out of the engine: built objects expose their
//! events as signals, the resource resolver reports missing keys through one,
//! and background progress is relayed through them.
//!
//! # Connection Types
//!
//! - **Direct**: Slot is called immediately in the emitting thread
//! - **Queued**: Slot execution is handed to the installed [`UiDispatcher`]
//! - **Auto**: Direct if same thread, Queued otherwise (default)
//!
//! [`UiDispatcher`]: crate::invocation::UiDispatcher
//!
//! # Example
//!
//! ```
//! use horizon_forge_core::Signal;
//!
//! let text_changed = Signal::<String>::new();
//! let conn_id = text_changed.connect(|text| {
//!     println!("Text changed to: {}", text);
//! });
//!
//! text_changed.emit("Hello, World!".to_string());
//! text_changed.disconnect(conn_id);
//! ```

use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::invocation::{QueuedInvocation, ui_dispatcher};

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    pub struct ConnectionId;
}

/// Specifies how a connected slot should be invoked when the signal is emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionType {
    /// Invoke the slot immediately in the emitting thread.
    Direct,

    /// Hand the slot invocation to the UI dispatcher.
    Queued,

    /// Direct when emitted on the connecting thread, Queued otherwise.
    #[default]
    Auto,
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

struct Connection<Args> {
    slot: Slot<Args>,
    connection_type: ConnectionType,
    target_thread: ThreadId,
}

/// A type-safe signal that can have multiple connected slots.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for signals
///   with no arguments, or a tuple for multiple arguments.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Connection<Args>>>,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
        }
    }

    /// Connect a slot with [`ConnectionType::Auto`].
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connect_with_type(slot, ConnectionType::Auto)
    }

    /// Connect a slot with a specific connection type.
    pub fn connect_with_type<F>(&self, slot: F, connection_type: ConnectionType) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let connection = Connection {
            slot: Arc::new(slot),
            connection_type,
            target_thread: std::thread::current().id(),
        };
        self.connections.lock().insert(connection)
    }

    /// Disconnect a specific slot. Returns `true` if it was connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Emit the signal, invoking all connected slots.
    ///
    /// Slots are collected first and invoked without holding the connection
    /// lock, so a slot may connect to or disconnect from this same signal.
    #[tracing::instrument(skip_all, target = "horizon_forge_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        let current_thread = std::thread::current().id();
        let slots: Vec<(Slot<Args>, bool)> = {
            let connections = self.connections.lock();
            connections
                .values()
                .map(|conn| {
                    let queued = match conn.connection_type {
                        ConnectionType::Direct => false,
                        ConnectionType::Queued => true,
                        ConnectionType::Auto => conn.target_thread != current_thread,
                    };
                    (conn.slot.clone(), queued)
                })
                .collect()
        };
        tracing::trace!(target: "horizon_forge_core::signal", connection_count = slots.len(), "emitting signal");

        for (slot, queued) in slots {
            if queued {
                Self::queue_invocation(slot, args.clone());
            } else {
                slot(&args);
            }
        }
    }

    fn queue_invocation(slot: Slot<Args>, args: Args) {
        let invocation = QueuedInvocation::new(move || {
            slot(&args);
        });

        if let Some(dispatcher) = ui_dispatcher() {
            dispatcher.dispatch(invocation);
        } else {
            // No UI context installed: this happens in tests and headless builds.
            tracing::warn!(
                target: "horizon_forge_core::signal",
                "No UI dispatcher installed for queued signal, executing immediately"
            );
            invocation.execute();
        }
    }
}

static_assertions::assert_impl_all!(Signal<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |value: &T| sink.lock().push(value.clone()))
    }

    #[test]
    fn test_missing_keys_reach_every_slot() {
        let missing = Signal::<String>::new();
        let (first, first_slot) = recorder();
        let (second, second_slot) = recorder();
        missing.connect(first_slot);
        let id = missing.connect(second_slot);

        missing.emit("title.main".into());
        assert!(missing.disconnect(id));
        assert!(!missing.disconnect(id));
        missing.emit("button.ok".into());

        assert_eq!(*first.lock(), ["title.main", "button.ok"]);
        assert_eq!(*second.lock(), ["title.main"]);
        assert_eq!(missing.connection_count(), 1);
    }

    #[test]
    fn test_slot_may_reconnect_during_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let inner = signal.clone();
        signal.connect(move |_| {
            inner.connect(|_| {});
        });

        signal.emit(());
        assert_eq!(signal.connection_count(), 2);
    }

    #[test]
    fn test_queued_without_dispatcher_runs_immediately() {
        let signal = Signal::<i32>::new();
        let (seen, slot) = recorder();
        signal.connect_with_type(slot, ConnectionType::Queued);

        signal.emit(7);
        assert_eq!(*seen.lock(), [7]);
    }
}
