use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Reactive runtime shared by every cell created from it.
///
/// The runtime owns two pieces of state: a monotonic id allocator for cells
/// and subscriptions, and the evaluation stack used for dependency tracking.
/// While a selector's compute function runs, a frame for that selector sits on
/// the stack and every tracked read is recorded against the innermost frame.
/// Nested selector evaluations push nested frames, so an inner selector's
/// dependencies never leak onto the outer one.
///
/// Runtimes are explicit: cells are constructed from a runtime handle rather
/// than from ambient global state, so each test (or embedded consumer) can
/// hold a fully isolated instance.
///
/// # Examples
///
/// ```
/// use wirestore::{Runtime, Wire};
///
/// let rt = Runtime::new();
/// let wire = Wire::new(&rt, 42);
/// assert_eq!(wire.get(), 42);
/// ```
pub struct Runtime {
    next_id: AtomicUsize,
    eval: Mutex<Vec<Frame>>,
}

/// One in-progress selector evaluation.
pub(crate) struct Frame {
    owner: usize,
    deps: HashMap<usize, Dependency>,
}

impl Frame {
    pub(crate) fn into_deps(self) -> Vec<Dependency> {
        self.deps.into_values().collect()
    }
}

/// A recorded read: which cell, and the revision observed at read time.
#[derive(Clone)]
pub(crate) struct Dependency {
    pub(crate) handle: Arc<dyn Revalidate>,
    pub(crate) seen: u64,
}

/// Type-erased handle a selector keeps to each of its dependencies.
///
/// Wires answer with their stored revision; selectors first bring themselves
/// up to date (possibly recomputing) and then answer with their own revision.
pub(crate) trait Revalidate: Send + Sync {
    fn cell_id(&self) -> usize;
    fn latest_revision(&self) -> u64;
}

/// Panic payload used to unwind out of a cyclic selector evaluation.
///
/// Raised by the re-entrant read and caught at the outermost `Selector::get`
/// call, where it becomes `StoreError::CyclicDependency`. Never escapes the
/// crate.
pub(crate) struct CycleDetected {
    #[allow(dead_code)]
    pub(crate) cell: usize,
}

impl Runtime {
    /// Create a new isolated runtime.
    pub fn new() -> Arc<Self> {
        Arc::new(Runtime {
            next_id: AtomicUsize::new(0),
            eval: Mutex::new(Vec::new()),
        })
    }

    /// Allocate the next unique id for a cell or subscription.
    pub(crate) fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Whether a selector with this id is currently mid-evaluation.
    pub(crate) fn is_evaluating(&self, cell: usize) -> bool {
        self.eval
            .lock()
            .unwrap()
            .iter()
            .any(|frame| frame.owner == cell)
    }

    /// Number of evaluation frames currently on the stack.
    pub(crate) fn tracking_depth(&self) -> usize {
        self.eval.lock().unwrap().len()
    }

    /// Open a tracking frame for the given selector.
    pub(crate) fn push_frame(&self, owner: usize) {
        self.eval.lock().unwrap().push(Frame {
            owner,
            deps: HashMap::new(),
        });
    }

    /// Close the innermost tracking frame, yielding the dependencies it saw.
    pub(crate) fn pop_frame(&self) -> Frame {
        self.eval
            .lock()
            .unwrap()
            .pop()
            .expect("pop_frame without matching push_frame")
    }

    /// Record a tracked read against the innermost frame, if one is open.
    ///
    /// Re-reading the same cell within one evaluation keeps a single entry,
    /// updated to the most recently observed revision.
    pub(crate) fn record_read(&self, handle: Arc<dyn Revalidate>, seen: u64) {
        let mut eval = self.eval.lock().unwrap();
        if let Some(frame) = eval.last_mut() {
            frame
                .deps
                .insert(handle.cell_id(), Dependency { handle, seen });
        }
    }
}
