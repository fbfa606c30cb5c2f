// alloc.rs — Session memory accounting.
//
// The decoder engine obtains every internal buffer through the
// `alloc_no_stdlib::Allocator<T>` trait (re-exported by
// `brotli-decompressor`).  `TrackingAlloc` satisfies that trait with
// plain heap allocations and charges each cell against an explicit
// `AllocToken`, so the embedding application can observe the session's
// memory without any global or static state.  All allocators belonging
// to one session share a single token by `Rc` identity.

use std::cell::Cell;
use std::rc::Rc;

use brotli_decompressor::{Allocator, SliceWrapper, SliceWrapperMut};

/// Accounting token shared by the allocators of one decode session.
///
/// Counters live in `Cell`s: the driver is strictly single-threaded,
/// and the token is shared by `Rc` identity, never by copying.
#[derive(Debug, Default)]
pub struct AllocToken {
    live_cells: Cell<usize>,
    live_bytes: Cell<usize>,
    total_allocs: Cell<usize>,
    peak_live_bytes: Cell<usize>,
}

impl AllocToken {
    pub fn new() -> Rc<AllocToken> {
        Rc::new(AllocToken::default())
    }

    fn charge(&self, bytes: usize) {
        self.live_cells.set(self.live_cells.get() + 1);
        self.live_bytes.set(self.live_bytes.get() + bytes);
        self.total_allocs.set(self.total_allocs.get() + 1);
        if self.live_bytes.get() > self.peak_live_bytes.get() {
            self.peak_live_bytes.set(self.live_bytes.get());
        }
    }

    fn credit(&self, bytes: usize) {
        self.live_cells.set(self.live_cells.get() - 1);
        self.live_bytes.set(self.live_bytes.get() - bytes);
    }

    /// Cells currently allocated and not yet freed.
    pub fn live_cells(&self) -> usize {
        self.live_cells.get()
    }

    /// Bytes currently allocated and not yet freed.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.get()
    }

    /// Cumulative number of `alloc_cell` calls over the token's lifetime.
    pub fn total_allocs(&self) -> usize {
        self.total_allocs.get()
    }

    /// High-water mark of `live_bytes`.
    pub fn peak_live_bytes(&self) -> usize {
        self.peak_live_bytes.get()
    }
}

/// Heap slice handed out by [`TrackingAlloc`].
pub struct TrackedMem<T>(Box<[T]>);

impl<T> Default for TrackedMem<T> {
    fn default() -> Self {
        TrackedMem(Vec::new().into_boxed_slice())
    }
}

impl<T> SliceWrapper<T> for TrackedMem<T> {
    fn slice(&self) -> &[T] {
        &self.0
    }
}

impl<T> SliceWrapperMut<T> for TrackedMem<T> {
    fn slice_mut(&mut self) -> &mut [T] {
        &mut self.0
    }
}

/// Heap allocator that records every cell against an [`AllocToken`].
pub struct TrackingAlloc<T: Clone> {
    token: Rc<AllocToken>,
    default_value: T,
}

impl<T: Clone> TrackingAlloc<T> {
    pub fn new(token: Rc<AllocToken>, default_value: T) -> Self {
        TrackingAlloc {
            token,
            default_value,
        }
    }

    /// The token this allocator charges; identical (by `Rc` identity)
    /// to the token supplied at construction.
    pub fn token(&self) -> &Rc<AllocToken> {
        &self.token
    }
}

impl<T: Clone> Allocator<T> for TrackingAlloc<T> {
    type AllocatedMemory = TrackedMem<T>;

    fn alloc_cell(&mut self, len: usize) -> TrackedMem<T> {
        // Zero-length cells are indistinguishable from the `Default`
        // placeholders the engine swaps in; neither is accounted.
        if len == 0 {
            return TrackedMem::default();
        }
        self.token.charge(len * core::mem::size_of::<T>());
        TrackedMem(vec![self.default_value.clone(); len].into_boxed_slice())
    }

    fn free_cell(&mut self, cell: TrackedMem<T>) {
        if !cell.0.is_empty() {
            self.token.credit(cell.0.len() * core::mem::size_of::<T>());
        }
        // cell dropped here; the backing Box returns to the heap.
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
