use crate::error::StoreError;
use crate::runtime::{CycleDetected, Dependency, Revalidate, Runtime};
use std::panic::{catch_unwind, panic_any, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A cell readable inside a selector evaluation.
///
/// Implemented by [`Wire`](crate::Wire) and [`Selector`]; user code reads
/// through [`Scope::get`], which records the dependency against the selector
/// currently evaluating.
pub trait Source<T> {
    /// Read the current value and record the read in the given scope.
    fn read_in(&self, scope: &Scope) -> T;
}

/// Evaluation scope handed to a selector's compute function.
///
/// All reads a compute function performs must go through [`Scope::get`]; that
/// is what records the dependency (and its revision) for later invalidation
/// checks. Reads outside the scope are untracked.
pub struct Scope {
    runtime: Arc<Runtime>,
}

impl Scope {
    pub(crate) fn new(runtime: &Arc<Runtime>) -> Self {
        Self {
            runtime: Arc::clone(runtime),
        }
    }

    /// Read a wire or selector, recording it as a dependency.
    pub fn get<T>(&self, source: &impl Source<T>) -> T {
        source.read_in(self)
    }

    pub(crate) fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }
}

/// A derived, memoized, read-only value.
///
/// Selectors recompute lazily: a [`get`](Selector::get) re-runs the compute
/// function only when no cached value exists yet or when some dependency's
/// revision has moved since it was last recorded. Each evaluation replaces
/// the previous dependency set, so conditional reads drop dependencies that
/// are no longer taken. A selector never owns its dependencies; it only
/// observes their revisions.
///
/// # Examples
///
/// ```
/// use wirestore::{Runtime, Selector, Wire};
///
/// let rt = Runtime::new();
/// let a = Wire::new(&rt, 5);
/// let b = Wire::new(&rt, 10);
/// let sum = Selector::new(&rt, {
///     let (a, b) = (a.clone(), b.clone());
///     move |scope| scope.get(&a) + scope.get(&b)
/// });
/// assert_eq!(sum.get().unwrap(), 15);
///
/// a.set(20);
/// assert_eq!(sum.get().unwrap(), 30);
/// ```
pub struct Selector<T> {
    inner: Arc<SelectorInner<T>>,
}

struct SelectorInner<T> {
    id: usize,
    runtime: Arc<Runtime>,
    compute: Box<dyn Fn(&Scope) -> T + Send + Sync>,
    revision: AtomicU64,
    cache: RwLock<Option<CacheEntry<T>>>,
}

struct CacheEntry<T> {
    value: T,
    deps: Vec<Dependency>,
}

impl<T: Clone + Send + Sync + 'static> Selector<T> {
    /// Create a new selector with the given compute function.
    pub fn new<F>(runtime: &Arc<Runtime>, compute: F) -> Self
    where
        F: Fn(&Scope) -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(SelectorInner {
                id: runtime.next_id(),
                runtime: Arc::clone(runtime),
                compute: Box::new(compute),
                revision: AtomicU64::new(0),
                cache: RwLock::new(None),
            }),
        }
    }

    /// Get the current value, recomputing if any dependency changed.
    ///
    /// Fails with [`StoreError::CyclicDependency`] when the evaluation
    /// re-enters this selector, directly or through a chain of selectors.
    /// The error is deterministic: every read of a cyclic selector fails.
    pub fn get(&self) -> Result<T, StoreError> {
        if self.inner.runtime.tracking_depth() == 0 {
            // Outermost read: a cycle anywhere below unwinds to here.
            let inner = Arc::clone(&self.inner);
            match catch_unwind(AssertUnwindSafe(move || {
                inner.ensure_fresh();
                inner.current()
            })) {
                Ok(value) => Ok(value),
                Err(payload) => match payload.downcast::<CycleDetected>() {
                    Ok(_) => Err(StoreError::CyclicDependency),
                    Err(other) => resume_unwind(other),
                },
            }
        } else {
            self.inner.ensure_fresh();
            Ok(self.inner.current())
        }
    }

    /// The selector's unique id within its runtime.
    pub fn id(&self) -> usize {
        self.inner.id
    }
}

impl<T: Clone + Send + Sync + 'static> SelectorInner<T> {
    /// Recompute if stale. On return the cache holds a value whose recorded
    /// dependencies are all at their current revisions.
    fn ensure_fresh(&self) {
        if self.runtime.is_evaluating(self.id) {
            panic_any(CycleDetected { cell: self.id });
        }

        // Validate against a copy of the recorded dependencies; bringing a
        // selector dependency up to date may recurse and must not happen
        // under our own cache lock.
        let recorded: Option<Vec<Dependency>> = self
            .cache
            .read()
            .unwrap()
            .as_ref()
            .map(|entry| entry.deps.clone());
        if let Some(deps) = recorded {
            if deps
                .iter()
                .all(|dep| dep.handle.latest_revision() == dep.seen)
            {
                return;
            }
        }

        self.runtime.push_frame(self.id);
        let scope = Scope::new(&self.runtime);
        let result = catch_unwind(AssertUnwindSafe(|| (self.compute)(&scope)));
        let frame = self.runtime.pop_frame();

        match result {
            Ok(value) => {
                *self.cache.write().unwrap() = Some(CacheEntry {
                    value,
                    deps: frame.into_deps(),
                });
                self.revision.fetch_add(1, Ordering::SeqCst);
            }
            Err(payload) => resume_unwind(payload),
        }
    }

    fn current(&self) -> T {
        self.cache.read().unwrap().as_ref().unwrap().value.clone()
    }
}

impl<T> Clone for Selector<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Revalidate for SelectorInner<T> {
    fn cell_id(&self) -> usize {
        self.id
    }

    fn latest_revision(&self) -> u64 {
        self.ensure_fresh();
        self.revision.load(Ordering::SeqCst)
    }
}

impl<T: Clone + Send + Sync + 'static> Source<T> for Selector<T> {
    fn read_in(&self, scope: &Scope) -> T {
        self.inner.ensure_fresh();
        let revision = self.inner.revision.load(Ordering::SeqCst);
        scope
            .runtime()
            .record_read(Arc::clone(&self.inner) as Arc<dyn Revalidate>, revision);
        self.inner.current()
    }
}

/// Create a new selector on the given runtime.
pub fn create_selector<T, F>(runtime: &Arc<Runtime>, compute: F) -> Selector<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&Scope) -> T + Send + Sync + 'static,
{
    Selector::new(runtime, compute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Wire;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn selector_basic() {
        let rt = Runtime::new();
        let count = Wire::new(&rt, 5);
        let doubled = Selector::new(&rt, {
            let count = count.clone();
            move |scope| scope.get(&count) * 2
        });

        assert_eq!(doubled.get().unwrap(), 10);

        count.set(10);
        assert_eq!(doubled.get().unwrap(), 20);
    }

    #[test]
    fn unrelated_writes_do_not_recompute() {
        let rt = Runtime::new();
        let a = Wire::new(&rt, 1);
        let b = Wire::new(&rt, 2);
        let unrelated = Wire::new(&rt, 0);
        let computes = Arc::new(AtomicUsize::new(0));

        let sum = Selector::new(&rt, {
            let (a, b) = (a.clone(), b.clone());
            let computes = computes.clone();
            move |scope| {
                computes.fetch_add(1, Ordering::SeqCst);
                scope.get(&a) + scope.get(&b)
            }
        });

        assert_eq!(sum.get().unwrap(), 3);
        assert_eq!(sum.get().unwrap(), 3);
        assert_eq!(computes.load(Ordering::SeqCst), 1);

        unrelated.set(99);
        assert_eq!(sum.get().unwrap(), 3);
        assert_eq!(computes.load(Ordering::SeqCst), 1);

        a.set(5);
        assert_eq!(sum.get().unwrap(), 7);
        assert_eq!(computes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nested_selectors_track_the_inner_identity() {
        let rt = Runtime::new();
        let input = Wire::new(&rt, 1);
        let outer_computes = Arc::new(AtomicUsize::new(0));

        let doubled = Selector::new(&rt, {
            let input = input.clone();
            move |scope| scope.get(&input) * 2
        });
        let quadrupled = Selector::new(&rt, {
            let doubled = doubled.clone();
            let outer_computes = outer_computes.clone();
            move |scope| {
                outer_computes.fetch_add(1, Ordering::SeqCst);
                scope.get(&doubled) * 2
            }
        });

        assert_eq!(quadrupled.get().unwrap(), 4);
        assert_eq!(outer_computes.load(Ordering::SeqCst), 1);

        input.set(5);
        assert_eq!(quadrupled.get().unwrap(), 20);
        assert_eq!(outer_computes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn conditional_reads_swap_dependencies() {
        let rt = Runtime::new();
        let flag = Wire::new(&rt, true);
        let left = Wire::new(&rt, 10);
        let right = Wire::new(&rt, 20);
        let computes = Arc::new(AtomicUsize::new(0));

        let picked = Selector::new(&rt, {
            let (flag, left, right) = (flag.clone(), left.clone(), right.clone());
            let computes = computes.clone();
            move |scope| {
                computes.fetch_add(1, Ordering::SeqCst);
                if scope.get(&flag) {
                    scope.get(&left)
                } else {
                    scope.get(&right)
                }
            }
        });

        assert_eq!(picked.get().unwrap(), 10);
        flag.set(false);
        assert_eq!(picked.get().unwrap(), 20);
        assert_eq!(computes.load(Ordering::SeqCst), 2);

        // `left` is no longer a dependency after the swap.
        left.set(11);
        assert_eq!(picked.get().unwrap(), 20);
        assert_eq!(computes.load(Ordering::SeqCst), 2);

        right.set(21);
        assert_eq!(picked.get().unwrap(), 21);
        assert_eq!(computes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn direct_cycle_fails_deterministically() {
        let rt = Runtime::new();
        let slot: Arc<Mutex<Option<Selector<i32>>>> = Arc::new(Mutex::new(None));

        let looped = Selector::new(&rt, {
            let slot = slot.clone();
            move |scope| {
                let me = slot.lock().unwrap().clone().unwrap();
                scope.get(&me)
            }
        });
        *slot.lock().unwrap() = Some(looped.clone());

        for _ in 0..3 {
            assert!(matches!(looped.get(), Err(StoreError::CyclicDependency)));
        }
    }

    #[test]
    fn transitive_cycle_fails() {
        let rt = Runtime::new();
        let slot: Arc<Mutex<Option<Selector<i32>>>> = Arc::new(Mutex::new(None));

        let first = Selector::new(&rt, {
            let slot = slot.clone();
            move |scope| {
                let other = slot.lock().unwrap().clone().unwrap();
                scope.get(&other) + 1
            }
        });
        let second = Selector::new(&rt, {
            let first = first.clone();
            move |scope| scope.get(&first) + 1
        });
        *slot.lock().unwrap() = Some(second.clone());

        assert!(matches!(first.get(), Err(StoreError::CyclicDependency)));
        assert!(matches!(second.get(), Err(StoreError::CyclicDependency)));
    }

    #[test]
    fn usable_after_cycle_error() {
        let rt = Runtime::new();
        let value = Wire::new(&rt, 7);
        let slot: Arc<Mutex<Option<Selector<i32>>>> = Arc::new(Mutex::new(None));

        let looped = Selector::new(&rt, {
            let slot = slot.clone();
            move |scope| {
                let me = slot.lock().unwrap().clone().unwrap();
                scope.get(&me)
            }
        });
        *slot.lock().unwrap() = Some(looped.clone());
        assert!(looped.get().is_err());

        // The evaluation stack is clean: unrelated selectors still work.
        let doubled = Selector::new(&rt, {
            let value = value.clone();
            move |scope| scope.get(&value) * 2
        });
        assert_eq!(doubled.get().unwrap(), 14);
    }
}
