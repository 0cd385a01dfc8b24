//! Signal/slot primitive used to fan lifecycle notifications out to listeners.
//!
//! A [`Signal`] owns a set of connected slots (closures). Emitting the signal
//! invokes every slot, in connection order, on the emitting thread. The whole
//! windowing subsystem runs on one control thread, so there is no queued
//! delivery; a slot sees the state exactly as it was when the signal fired.
//!
//! Slots are snapshotted before they run, so a slot may connect or
//! disconnect other slots (or itself) without deadlocking.
//!
//! # Example
//!
//! ```
//! use launchpad_core::Signal;
//!
//! let host_closed = Signal::<u32>::new();
//! let id = host_closed.connect(|code| println!("closed with {code}"));
//! host_closed.emit(0);
//! host_closed.disconnect(id);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// Identifier of a signal-slot connection.
    ///
    /// Pass it to [`Signal::disconnect`] to remove the slot.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A type-safe signal with any number of connected slots.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot, returning an id that can disconnect it later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Disconnect a slot. Returns `false` if the id was unknown.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Block or unblock emission. While blocked, [`emit`](Self::emit) does nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Invoke every connected slot with `args`.
    #[tracing::instrument(skip_all, target = "launchpad::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        for slot in slots {
            slot(&args);
        }
    }

    /// Connect a slot that is disconnected when the returned guard drops.
    pub fn connect_scoped<F>(self: &Arc<Self>, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            signal: Arc::downgrade(self),
            id,
        }
    }
}

/// RAII guard returned by [`Signal::connect_scoped`].
///
/// The guard only holds a weak reference, so it never keeps the signal alive.
#[must_use = "dropping the guard disconnects the slot immediately"]
pub struct ConnectionGuard<Args: 'static> {
    signal: Weak<Signal<Args>>,
    id: ConnectionId,
}

impl<Args: 'static> ConnectionGuard<Args> {
    /// The id of the guarded connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: 'static> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.upgrade() {
            signal.disconnect(self.id);
        }
    }
}
