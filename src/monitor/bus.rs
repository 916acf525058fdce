//! Subscription bus.
//!
//! This module owns listener registrations and fans out change notifications.
//! Listeners run synchronously, in registration order, outside the registry
//! lock. Publishes are serialized per bus: one fan-out finishes before the next
//! begins. A panicking listener is caught, logged and counted; the remaining
//! listeners still run and the publisher never sees the failure.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::warn;

use super::stream::ChangeStream;

/// A zero-argument change listener.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Identifier of one registration on a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

struct Registration {
    id: ListenerId,
    listener: Listener,
    live: Arc<AtomicBool>,
}

struct BusInner {
    listeners: Mutex<Vec<Registration>>,
    dispatch: Mutex<()>,
    next_id: AtomicU64,
    sequence: AtomicU64,
    failed_deliveries: AtomicU64,
}

impl BusInner {
    fn listeners(&self) -> MutexGuard<'_, Vec<Registration>> {
        // Listeners never run under this lock, so poisoning leaves the list intact.
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

thread_local! {
    // (bus address, publish sequence) for every fan-out running on this thread.
    static DISPATCHING: RefCell<Vec<(usize, u64)>> = const { RefCell::new(Vec::new()) };
}

struct DispatchScope(usize);

impl DispatchScope {
    fn enter(key: usize, sequence: u64) -> Self {
        DISPATCHING.with(|d| d.borrow_mut().push((key, sequence)));
        Self(key)
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCHING.with(|d| {
            let mut d = d.borrow_mut();
            if let Some(pos) = d.iter().rposition(|(k, _)| *k == self.0) {
                d.remove(pos);
            }
        });
    }
}

/// Sequence of the innermost publish of bus `key` running on this thread.
pub(crate) fn dispatching_sequence(key: usize) -> Option<u64> {
    DISPATCHING.with(|d| {
        d.borrow()
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, sequence)| *sequence)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Ordered fan-out of change notifications.
///
/// Cloning a bus yields another handle to the same registry. Several stores
/// may share one bus; their publishes are still delivered one at a time.
#[derive(Clone)]
pub struct SubscriptionBus {
    inner: Arc<BusInner>,
}

impl Default for SubscriptionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriptionBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionBus")
            .field("listeners", &self.listener_count())
            .field("sequence", &self.sequence())
            .field("failed_deliveries", &self.failed_deliveries())
            .finish()
    }
}

impl SubscriptionBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: Mutex::new(Vec::new()),
                dispatch: Mutex::new(()),
                next_id: AtomicU64::new(1),
                sequence: AtomicU64::new(0),
                failed_deliveries: AtomicU64::new(0),
            }),
        }
    }

    /// Register a listener.
    ///
    /// Every call yields an independently removable registration.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_shared(Arc::new(listener))
    }

    /// Register an already shared listener.
    ///
    /// The same `Listener` may be registered several times; each registration
    /// is removed only by its own [`Subscription`].
    pub fn subscribe_shared(&self, listener: Listener) -> Subscription {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let live = Arc::new(AtomicBool::new(true));
        self.inner.listeners().push(Registration {
            id,
            listener,
            live: Arc::clone(&live),
        });
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
            active: live,
        }
    }

    /// Subscribe a bounded channel-backed stream of change notices.
    #[must_use]
    pub fn watch(&self, capacity: usize) -> ChangeStream {
        ChangeStream::attach(self, capacity)
    }

    /// Notify every listener registered at call time, in registration order.
    ///
    /// Concurrent publishes on one bus are serialized: the sequence number is
    /// taken and the fan-out completes under the bus dispatch lock. A listener
    /// removed earlier in the same fan-out is skipped. A publish issued by a
    /// listener on the dispatching thread runs nested inside the current
    /// fan-out; a listener that blocks on a publish from another thread
    /// deadlocks.
    pub fn publish(&self) {
        let key = self.dispatch_key();
        let _serial = if self.is_dispatching() {
            None
        } else {
            Some(
                self.inner
                    .dispatch
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            )
        };

        let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let snapshot: Vec<(ListenerId, Listener, Arc<AtomicBool>)> = self
            .inner
            .listeners()
            .iter()
            .map(|r| (r.id, Arc::clone(&r.listener), Arc::clone(&r.live)))
            .collect();

        let _scope = DispatchScope::enter(key, sequence);
        for (id, listener, live) in snapshot {
            if !live.load(Ordering::Acquire) {
                continue;
            }
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener())) {
                self.inner.failed_deliveries.fetch_add(1, Ordering::Relaxed);
                warn!(
                    listener = %id,
                    sequence,
                    reason = panic_message(payload.as_ref()),
                    "change listener panicked"
                );
            }
        }
    }

    /// Number of live registrations.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }

    /// Number of publishes so far.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.inner.sequence.load(Ordering::SeqCst)
    }

    /// Number of listener invocations that panicked.
    #[must_use]
    pub fn failed_deliveries(&self) -> u64 {
        self.inner.failed_deliveries.load(Ordering::Relaxed)
    }

    /// True while this bus is dispatching on the current thread.
    #[must_use]
    pub fn is_dispatching(&self) -> bool {
        dispatching_sequence(self.dispatch_key()).is_some()
    }

    pub(crate) fn dispatch_key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

/// Removal capability for one registration.
///
/// Dropping a `Subscription` leaves the listener registered.
#[must_use = "the listener stays registered; keep the Subscription to remove it later"]
pub struct Subscription {
    id: ListenerId,
    bus: Weak<BusInner>,
    active: Arc<AtomicBool>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    /// The registration this handle removes.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// False once `unsubscribe` has been called.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Remove exactly this registration.
    ///
    /// Idempotent. Returns true if a registration was removed by this call.
    /// Takes effect immediately, including for a fan-out already in progress.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        let Some(inner) = self.bus.upgrade() else {
            return false;
        };

        let mut listeners = inner.listeners();
        let before = listeners.len();
        listeners.retain(|r| r.id != self.id);
        listeners.len() != before
    }
}
