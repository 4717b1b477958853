use crate::runtime::{Revalidate, Runtime};
use crate::wire::selector::{Scope, Source};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Write-through hook invoked with each accepted value, installed by
/// `create_persisted_wire`. Must not fail; persistence errors are handled
/// (logged) inside the hook.
pub(crate) type PersistHook<T> = Box<dyn Fn(&T) + Send + Sync>;

/// An observable mutable value cell.
///
/// A wire holds a value, an ordered subscriber list and a revision counter
/// that is bumped on every accepted write. Writes notify every subscriber
/// synchronously, in subscription order, before `set` returns — with no
/// value-equality deduplication: setting an equal value still notifies.
/// Callers wanting dedupe compare before calling.
///
/// Values returned from [`get`](Wire::get) are snapshots; mutating a returned
/// composite in place bypasses notification and is outside the contract. All
/// mutation goes through [`set`](Wire::set) or [`update`](Wire::update).
///
/// # Examples
///
/// ```
/// use wirestore::{Runtime, Wire};
///
/// let rt = Runtime::new();
/// let count = Wire::new(&rt, 0);
/// assert_eq!(count.get(), 0);
/// count.set(42);
/// assert_eq!(count.get(), 42);
/// ```
pub struct Wire<T> {
    inner: Arc<WireInner<T>>,
}

pub(crate) struct WireInner<T> {
    id: usize,
    runtime: Arc<Runtime>,
    value: RwLock<T>,
    revision: AtomicU64,
    subscribers: Mutex<Vec<(usize, Callback<T>)>>,
    persist: Option<PersistHook<T>>,
}

impl<T: Clone + Send + Sync + 'static> Wire<T> {
    /// Create a new wire with the given initial value. Always succeeds.
    pub fn new(runtime: &Arc<Runtime>, initial: T) -> Self {
        Self::build(runtime, initial, None)
    }

    pub(crate) fn with_persist(runtime: &Arc<Runtime>, initial: T, hook: PersistHook<T>) -> Self {
        Self::build(runtime, initial, Some(hook))
    }

    fn build(runtime: &Arc<Runtime>, initial: T, persist: Option<PersistHook<T>>) -> Self {
        Self {
            inner: Arc::new(WireInner {
                id: runtime.next_id(),
                runtime: Arc::clone(runtime),
                value: RwLock::new(initial),
                revision: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
                persist,
            }),
        }
    }

    /// Get a clone of the current value. No side effects.
    pub fn get(&self) -> T {
        self.inner.value.read().unwrap().clone()
    }

    /// Read the value with a function, without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.inner.value.read().unwrap();
        f(&value)
    }

    /// Store a new value, bump the revision and notify every subscriber.
    ///
    /// Notification iterates over a snapshot of the subscriber list taken at
    /// the start of the call, so unsubscribing mid-pass never disturbs the
    /// pass in flight. Subscribers may re-entrantly call `set` on this or any
    /// other wire; no lock is held while callbacks run.
    pub fn set(&self, value: T) {
        {
            let mut slot = self.inner.value.write().unwrap();
            *slot = value.clone();
        }
        self.inner.revision.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.inner.persist {
            hook(&value);
        }
        self.notify(&value);
    }

    /// Mutate the value in place, then notify as a single accepted write.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let value = {
            let mut slot = self.inner.value.write().unwrap();
            f(&mut slot);
            slot.clone()
        };
        self.inner.revision.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.inner.persist {
            hook(&value);
        }
        self.notify(&value);
    }

    /// Register a callback invoked with each value written after this call.
    ///
    /// The returned [`Subscription`] removes the callback when dropped or
    /// explicitly unsubscribed; a notification pass that starts after removal
    /// returns will never invoke it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.runtime.next_id();
        self.inner
            .subscribers
            .lock()
            .unwrap()
            .push((id, Arc::new(callback)));

        let weak: Weak<WireInner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .subscribers
                        .lock()
                        .unwrap()
                        .retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    /// The wire's unique id within its runtime.
    pub fn id(&self) -> usize {
        self.inner.id
    }

    fn notify(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = {
            let subs = self.inner.subscribers.lock().unwrap();
            subs.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in snapshot {
            callback(value);
        }
    }
}

impl<T> Clone for Wire<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync> Revalidate for WireInner<T> {
    fn cell_id(&self) -> usize {
        self.id
    }

    fn latest_revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send + Sync + 'static> Source<T> for Wire<T> {
    fn read_in(&self, scope: &Scope) -> T {
        let value = self.inner.value.read().unwrap().clone();
        let revision = self.inner.revision.load(Ordering::SeqCst);
        scope
            .runtime()
            .record_read(Arc::clone(&self.inner) as Arc<dyn Revalidate>, revision);
        value
    }
}

/// Create a new wire on the given runtime.
pub fn create_wire<T>(runtime: &Arc<Runtime>, initial: T) -> Wire<T>
where
    T: Clone + Send + Sync + 'static,
{
    Wire::new(runtime, initial)
}

/// Handle for a registered subscriber.
///
/// Dropping the handle (or calling [`unsubscribe`](Subscription::unsubscribe))
/// removes the callback. Call [`detach`](Subscription::detach) to keep the
/// callback subscribed for the life of the wire.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Remove the callback from the wire's subscriber list.
    pub fn unsubscribe(mut self) {
        self.run_cancel();
    }

    /// Leave the callback subscribed and discard the handle.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn get_returns_last_accepted_write() {
        let rt = Runtime::new();
        let wire = Wire::new(&rt, 1);
        for v in [5, 5, 9, 0] {
            wire.set(v);
            assert_eq!(wire.get(), v);
        }
    }

    #[test]
    fn equal_writes_each_notify() {
        let rt = Runtime::new();
        let wire = Wire::new(&rt, 0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let sub = wire.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        wire.set(1);
        wire.set(1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        drop(sub);
    }

    #[test]
    fn subscriber_receives_written_value() {
        let rt = Runtime::new();
        let wire = Wire::new(&rt, String::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let _sub = wire.subscribe(move |v: &String| {
            seen_clone.lock().unwrap().push(v.clone());
        });

        wire.set("a".to_string());
        wire.set("b".to_string());
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn unsubscribe_stops_future_notifications() {
        let rt = Runtime::new();
        let wire = Wire::new(&rt, 0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let sub = wire.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        wire.set(1);
        sub.unsubscribe();
        wire.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_unsubscribes() {
        let rt = Runtime::new();
        let wire = Wire::new(&rt, 0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        {
            let _sub = wire.subscribe(move |_| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            });
            wire.set(1);
        }
        wire.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detach_keeps_subscription_alive() {
        let rt = Runtime::new();
        let wire = Wire::new(&rt, 0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        wire.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })
        .detach();

        wire.set(1);
        wire.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn self_unsubscribe_during_notification() {
        let rt = Runtime::new();
        let wire = Wire::new(&rt, 0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot_clone = slot.clone();
        let sub = wire.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = slot_clone.lock().unwrap().take() {
                sub.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(sub);

        wire.set(1);
        wire.set(2);
        wire.set(3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reentrant_set_from_subscriber() {
        let rt = Runtime::new();
        let wire = Wire::new(&rt, 0);
        let wire_clone = wire.clone();

        // Climb back to 3 via re-entrant writes.
        let sub = wire.subscribe(move |v| {
            if *v < 3 {
                wire_clone.set(v + 1);
            }
        });

        wire.set(1);
        assert_eq!(wire.get(), 3);
        drop(sub);
    }

    #[test]
    fn subscriber_sees_current_value_through_get() {
        let rt = Runtime::new();
        let wire = Wire::new(&rt, 0);
        let wire_clone = wire.clone();
        let observed = Arc::new(AtomicUsize::new(999));
        let observed_clone = observed.clone();

        let _sub = wire.subscribe(move |_| {
            observed_clone.store(wire_clone.get(), Ordering::SeqCst);
        });

        wire.set(7);
        assert_eq!(observed.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn update_mutates_in_place() {
        let rt = Runtime::new();
        let wire = Wire::new(&rt, vec![1, 2]);
        wire.update(|v| v.push(3));
        assert_eq!(wire.get(), vec![1, 2, 3]);
    }
}
