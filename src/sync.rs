//! Conventions for the caller-supplied synchronization scratch.
//!
//! Collectives do not own the memory they signal through. The caller
//! allocates two symmetric scratch arrays and passes them in:
//!
//! - **pSync** -- [`SyncArray`], [`SYNC_SIZE`] cells of `i64`. Cell 0 is the
//!   primary counter/release flag; cell 1 is the auxiliary slot used by the
//!   variable-length collect. Every cell must be zero on entry to a
//!   collective; every collective re-establishes all-zero on exit, so one
//!   array can be reused back-to-back on the same group.
//! - **pWrk** -- [`WorkArray`], at least [`REDUCE_MIN_WRKDATA_SIZE`] elements
//!   of the reduced type. Reductions land remote atomic folds here on the
//!   root; the zero-on-entry rule is what lets the first fold behave as the
//!   identity.
//!
//! A single cell with its signaling protocol is a [`SignalCell`]: atomic
//! remote increment, remote set, wait-equal / wait-nonzero, and local reset.
//! The storage behind the abstraction is still the caller's symmetric
//! allocation; `SignalCell` only fixes the access patterns.

use crate::reduce::{DataType, ReduceDesc, ReduceOp};
use crate::transport::{AllocError, CmpOp, Handle, Pe, SymAddr, SymSlice, SymmetricAlloc, Transport};

/// Number of `i64` cells in a synchronization array.
pub const SYNC_SIZE: usize = 16;

/// Minimum element count of a reduction work array.
pub const REDUCE_MIN_WRKDATA_SIZE: usize = 8;

const SUM_I64: ReduceDesc = ReduceDesc::new(ReduceOp::Sum, DataType::I64);

/// One `i64` synchronization cell in symmetric memory.
#[derive(Clone, Copy, Debug)]
pub struct SignalCell {
    addr: SymAddr,
}

impl SignalCell {
    /// View the cell at `addr`.
    pub const fn new(addr: SymAddr) -> Self {
        Self { addr }
    }

    /// The cell's symmetric address.
    pub const fn addr(self) -> SymAddr {
        self.addr
    }

    /// Atomically add `delta` to the cell on `pe`.
    pub fn add_remote(self, transport: &dyn Transport, delta: i64, pe: Pe) -> Handle {
        transport.atomic(self.addr, &delta.to_ne_bytes(), pe, SUM_I64)
    }

    /// Overwrite the cell on `pe` with `value`.
    pub fn set_remote(self, transport: &dyn Transport, value: i64, pe: Pe) -> Handle {
        transport.put(self.addr, &value.to_ne_bytes(), pe)
    }

    /// Block until the local cell equals `value`.
    pub fn wait_eq(self, transport: &dyn Transport, value: i64) {
        transport.wait_until(self.addr, CmpOp::Eq, value);
    }

    /// Block until the local cell is nonzero.
    ///
    /// This is the release predicate: a peer stores a nonzero flag, the
    /// waiter wakes on *not equal to zero*.
    pub fn wait_nonzero(self, transport: &dyn Transport) {
        transport.wait_until(self.addr, CmpOp::Ne, 0);
    }

    /// Read the local cell.
    pub fn load(self, transport: &dyn Transport) -> i64 {
        transport.read_i64(self.addr)
    }

    /// Reset the local cell to zero.
    pub fn reset(self, transport: &dyn Transport) {
        transport.write_i64(self.addr, 0);
    }
}

/// The caller's pSync scratch: [`SYNC_SIZE`] symmetric `i64` cells.
#[derive(Clone, Copy, Debug)]
pub struct SyncArray {
    cells: SymSlice<i64>,
}

impl SyncArray {
    /// Adopt a caller allocation as a synchronization array.
    ///
    /// Panics if the slice is shorter than [`SYNC_SIZE`]. The cells must be
    /// zero before the array's first use in a collective.
    pub fn new(cells: SymSlice<i64>) -> Self {
        assert!(
            cells.len() >= SYNC_SIZE,
            "synchronization array needs {SYNC_SIZE} cells, got {}",
            cells.len()
        );
        Self { cells }
    }

    /// Allocate and zero a fresh synchronization array.
    pub fn alloc<T>(transport: &T) -> Result<Self, AllocError>
    where
        T: Transport + SymmetricAlloc,
    {
        let cells = transport.alloc_slice::<i64>(SYNC_SIZE)?;
        transport.fill_zero(cells.addr(), cells.byte_len());
        Ok(Self::new(cells))
    }

    /// The underlying cells.
    pub const fn as_slice(&self) -> SymSlice<i64> {
        self.cells
    }

    /// Cell `i` as a [`SignalCell`].
    pub fn cell(&self, i: usize) -> SignalCell {
        SignalCell::new(self.cells.index(i))
    }

    /// Cell 0: the primary counter / release flag.
    pub fn primary(&self) -> SignalCell {
        self.cell(0)
    }

    /// Cell 1: the auxiliary slot used by collect's offset chain.
    pub fn aux(&self) -> SignalCell {
        self.cell(1)
    }
}

/// The caller's pWrk scratch: the reduction's symmetric landing pad.
#[derive(Clone, Copy, Debug)]
pub struct WorkArray<T> {
    buf: SymSlice<T>,
}

impl<T> WorkArray<T> {
    /// Adopt a caller allocation as a reduction work array.
    ///
    /// Panics if shorter than [`REDUCE_MIN_WRKDATA_SIZE`]. For a reduction of
    /// `count` elements the array must hold at least
    /// `max(REDUCE_MIN_WRKDATA_SIZE, count / 2 + 1)` elements — the work-unit
    /// size the reduction chunks by. The elements must be zero on entry.
    pub fn new(buf: SymSlice<T>) -> Self {
        assert!(
            buf.len() >= REDUCE_MIN_WRKDATA_SIZE,
            "work array needs at least {REDUCE_MIN_WRKDATA_SIZE} elements, got {}",
            buf.len()
        );
        Self { buf }
    }

    /// Allocate and zero a work array sized for a reduction of `count`
    /// elements.
    pub fn alloc_for<X>(transport: &X, count: usize) -> Result<Self, AllocError>
    where
        X: Transport + SymmetricAlloc,
    {
        let len = REDUCE_MIN_WRKDATA_SIZE.max(count / 2 + 1);
        let buf = transport.alloc_slice::<T>(len)?;
        transport.fill_zero(buf.addr(), buf.byte_len());
        Ok(Self::new(buf))
    }

    /// The underlying slice.
    pub const fn as_slice(&self) -> SymSlice<T> {
        self.buf
    }

    /// Base address of the landing pad.
    pub const fn addr(&self) -> SymAddr {
        self.buf.addr()
    }

    /// Capacity in elements.
    pub const fn len(&self) -> usize {
        self.buf.len()
    }

    /// Always false; the constructor rejects empty arrays.
    pub const fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
