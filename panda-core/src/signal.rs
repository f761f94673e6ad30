//! Change Notifications
//!
//! A [`Signal`] is a list of callbacks invoked when something happens in a
//! document (an object was added, an object became dirty, ...). Connecting a
//! callback returns a [`Subscription`]; dropping the subscription
//! disconnects the callback, so observers never outlive their interest.
//!
//! # Re-entrancy
//!
//! Callbacks run after the slot list lock has been released, so a callback
//! may connect or disconnect other callbacks on the same signal.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Unique identifier for a connected callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

type Slot<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Slots<T> = Mutex<Vec<(SubscriberId, Slot<T>)>>;

trait Disconnect: Send + Sync {
    fn disconnect(&self, id: SubscriberId);
}

impl<T: 'static> Disconnect for Slots<T> {
    fn disconnect(&self, id: SubscriberId) {
        self.lock().retain(|(slot_id, _)| *slot_id != id);
    }
}

/// A publish/subscribe channel carrying values of type `T`.
pub struct Signal<T> {
    slots: Arc<Slots<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a signal with no subscribers.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Connect a callback.
    ///
    /// The callback stays connected until the returned subscription is
    /// dropped (or [detached](Subscription::detach)).
    #[must_use = "dropping the subscription disconnects the callback"]
    pub fn connect<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriberId::new();
        self.slots.lock().push((id, Arc::new(callback)));

        let slots: Arc<dyn Disconnect> = self.slots.clone();
        Subscription {
            id,
            slots: Some(Arc::downgrade(&slots)),
        }
    }

    /// Invoke every connected callback, in connection order.
    pub fn emit(&self, value: &T) {
        let slots: Vec<Slot<T>> = self
            .slots
            .lock()
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();
        for slot in slots {
            slot(value);
        }
    }

    /// Get the number of connected callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.slots.lock().len()
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscriber_count", &self.slots.lock().len())
            .finish()
    }
}

/// Handle to a connected callback.
///
/// Dropping this handle disconnects the callback.
pub struct Subscription {
    id: SubscriberId,
    slots: Option<Weak<dyn Disconnect>>,
}

impl Subscription {
    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Keep the callback connected for as long as the signal lives.
    pub fn detach(mut self) {
        self.slots = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(slots) = self.slots.take().and_then(|weak| weak.upgrade()) {
            slots.disconnect(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.slots.is_some())
            .finish()
    }
}
