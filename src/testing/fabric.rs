//! An in-process symmetric-memory fabric: one heap per PE, one thread per PE.
//!
//! [`TestFabric`] gives every PE a [`FabricPe`] handle implementing
//! [`Transport`] and [`SymmetricAlloc`] against heaps shared through an
//! `Arc`. Operations complete synchronously under the destination heap's
//! lock, which makes the transport's ordering obligations hold trivially:
//! per-destination issue order, self-atomic coherence, and quiet-on-return
//! for every initiation. `put_wait` and `quiet` are therefore no-ops and
//! handles are plain operation counters.
//!
//! # Atomic fold semantics
//!
//! The transport contract requires that a pre-zeroed region receiving N
//! atomic folds ends up holding the N-way fold for every operation — also
//! the ones whose identity is not zero (AND, MIN, MAX, PROD). The fabric
//! implements this with first-contribution-stores semantics: the first fold
//! into an element since the last local write or put over it stores the
//! contribution verbatim; later folds combine under the operation. Local
//! writes, puts, and zeroing all reset the element. Under the caller's
//! zero-on-entry invariant this is indistinguishable from folding into the
//! identity.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use tracing::trace;

use crate::reduce::{ReduceDesc, fold_in_place};
use crate::transport::{
    AllocError, CmpOp, Handle, Pe, SymAddr, SymmetricAlloc, Transport,
};

const ALLOC_ALIGN: usize = 16;

/// A simulated job: `n_pes` symmetric heaps addressable from any PE.
pub struct TestFabric {
    shared: Arc<Shared>,
}

struct Shared {
    heaps: Vec<Mutex<PeHeap>>,
    capacity: Option<usize>,
}

#[derive(Default)]
struct PeHeap {
    data: Vec<u8>,
    /// Element offsets folded into since the last overwrite; see the module
    /// docs on atomic fold semantics.
    folded: HashSet<usize>,
    next: usize,
}

impl PeHeap {
    fn ensure(&mut self, len: usize) {
        if self.data.len() < len {
            self.data.resize(len, 0);
        }
    }

    fn overwrite(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset + bytes.len();
        self.ensure(end);
        self.data[offset..end].copy_from_slice(bytes);
        self.folded.retain(|&o| o < offset || o >= end);
    }
}

impl TestFabric {
    /// A fabric of `n_pes` PEs with unbounded heaps.
    pub fn new(n_pes: usize) -> Self {
        Self::with_heap_capacity(n_pes, None)
    }

    /// A fabric whose per-PE heaps refuse allocations past `capacity` bytes.
    ///
    /// `None` means unbounded. The bound applies to allocation only; remote
    /// writes still land (the caller vouched for symmetry, so a write past a
    /// heap's current extent targets memory some allocation will cover).
    pub fn with_heap_capacity(n_pes: usize, capacity: Option<usize>) -> Self {
        assert!(n_pes >= 1, "a fabric needs at least one PE");
        Self {
            shared: Arc::new(Shared {
                heaps: (0..n_pes).map(|_| Mutex::new(PeHeap::default())).collect(),
                capacity,
            }),
        }
    }

    /// Number of PEs in the fabric.
    pub fn n_pes(&self) -> usize {
        self.shared.heaps.len()
    }

    /// The transport handle for rank `pe`.
    pub fn pe(&self, pe: Pe) -> FabricPe {
        assert!(pe < self.n_pes(), "rank {pe} outside a {}-PE fabric", self.n_pes());
        FabricPe {
            shared: Arc::clone(&self.shared),
            pe,
        }
    }
}

/// One PE's handle onto a [`TestFabric`].
#[derive(Clone)]
pub struct FabricPe {
    shared: Arc<Shared>,
    pe: Pe,
}

impl FabricPe {
    fn heap(&self, pe: Pe) -> MutexGuard<'_, PeHeap> {
        self.shared.heaps[pe].lock().unwrap()
    }

    fn read_local(&self, src: SymAddr, len: usize) -> Vec<u8> {
        let mut heap = self.heap(self.pe);
        let start = src.offset();
        heap.ensure(start + len);
        heap.data[start..start + len].to_vec()
    }

    fn deposit(&self, pe: Pe, dst: SymAddr, bytes: &[u8]) {
        self.heap(pe).overwrite(dst.offset(), bytes);
    }

    fn fold_into(&self, pe: Pe, dst: SymAddr, bytes: &[u8], desc: ReduceDesc) {
        let width = desc.elem_size();
        assert_eq!(
            bytes.len() % width,
            0,
            "atomic length {} is not a multiple of the {:?} element width",
            bytes.len(),
            desc.dtype
        );
        let mut heap = self.heap(pe);
        let base = dst.offset();
        heap.ensure(base + bytes.len());
        let PeHeap { data, folded, .. } = &mut *heap;
        for (i, contribution) in bytes.chunks_exact(width).enumerate() {
            let offset = base + i * width;
            if folded.contains(&offset) {
                fold_in_place(desc, &mut data[offset..offset + width], contribution);
            } else {
                data[offset..offset + width].copy_from_slice(contribution);
                folded.insert(offset);
            }
        }
    }
}

impl Transport for FabricPe {
    fn my_pe(&self) -> Pe {
        self.pe
    }

    fn n_pes(&self) -> usize {
        self.shared.heaps.len()
    }

    fn put(&self, dst: SymAddr, src: &[u8], pe: Pe) -> Handle {
        self.deposit(pe, dst, src);
        Handle::new(1)
    }

    fn put_from(&self, dst: SymAddr, src: SymAddr, len: usize, pe: Pe) -> Handle {
        let bytes = self.read_local(src, len);
        self.deposit(pe, dst, &bytes);
        Handle::new(1)
    }

    fn atomic(&self, dst: SymAddr, src: &[u8], pe: Pe, desc: ReduceDesc) -> Handle {
        self.fold_into(pe, dst, src, desc);
        Handle::new(1)
    }

    fn atomic_from(
        &self,
        dst: SymAddr,
        src: SymAddr,
        len: usize,
        pe: Pe,
        desc: ReduceDesc,
    ) -> Handle {
        let bytes = self.read_local(src, len);
        self.fold_into(pe, dst, &bytes, desc);
        Handle::new(1)
    }

    fn put_wait(&self, _handle: Handle) {
        // Deposits complete under the destination lock before initiation
        // returns; there is never outstanding local work.
    }

    fn quiet(&self) {}

    fn wait_until(&self, cell: SymAddr, cmp: CmpOp, value: i64) {
        loop {
            let observed = {
                let mut heap = self.heap(self.pe);
                let start = cell.offset();
                heap.ensure(start + 8);
                i64::from_ne_bytes(heap.data[start..start + 8].try_into().unwrap())
            };
            if cmp.eval(observed, value) {
                return;
            }
            thread::yield_now();
        }
    }

    fn read(&self, src: SymAddr, dst: &mut [u8]) {
        let bytes = self.read_local(src, dst.len());
        dst.copy_from_slice(&bytes);
    }

    fn write(&self, dst: SymAddr, src: &[u8]) {
        self.deposit(self.pe, dst, src);
    }
}

impl SymmetricAlloc for FabricPe {
    fn symmetric_alloc(&self, len: usize) -> Result<SymAddr, AllocError> {
        let mut heap = self.heap(self.pe);
        let offset = heap.next.next_multiple_of(ALLOC_ALIGN);
        if let Some(capacity) = self.shared.capacity {
            if offset + len > capacity {
                return Err(AllocError::OutOfMemory {
                    requested: len,
                    available: capacity.saturating_sub(offset),
                });
            }
        }
        heap.next = offset + len;
        heap.ensure(offset + len);
        trace!(pe = self.pe, offset, len, "symmetric_alloc");
        Ok(SymAddr::new(offset))
    }
}

/// Run `f` once per PE on a fresh fabric, one thread per PE, and return the
/// per-PE results in rank order.
///
/// Panics in any PE thread propagate.
pub fn run_spmd<R, F>(n_pes: usize, f: F) -> Vec<R>
where
    F: Fn(FabricPe) -> R + Sync,
    R: Send,
{
    let fabric = TestFabric::new(n_pes);
    run_spmd_on(&fabric, f)
}

/// [`run_spmd`] over an existing fabric.
pub fn run_spmd_on<R, F>(fabric: &TestFabric, f: F) -> Vec<R>
where
    F: Fn(FabricPe) -> R + Sync,
    R: Send,
{
    thread::scope(|scope| {
        let f = &f;
        let joins: Vec<_> = (0..fabric.n_pes())
            .map(|pe| {
                let transport = fabric.pe(pe);
                scope.spawn(move || f(transport))
            })
            .collect();
        joins
            .into_iter()
            .map(|join| join.join().expect("PE thread panicked"))
            .collect()
    })
}
