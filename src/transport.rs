//! The one-sided transport capability the collectives are built on.
//!
//! Every collective in this crate is expressed against the narrow interface
//! defined here: remote put, remote atomic fold, local completion wait, a
//! transport-wide quiet, and a spin/suspend wait on a local synchronization
//! cell. A production deployment implements [`Transport`] over its fabric
//! (RDMA verbs, Portals, shared segments); the in-process implementation used
//! by the test suite lives in [`crate::testing`].
//!
//! # Addressing model
//!
//! All buffers that collectives touch remotely live in the **symmetric heap**:
//! memory allocated in the same order on every PE, so that a single byte
//! offset — a [`SymAddr`] — names the "same" object everywhere. [`SymSlice`]
//! is the typed view of such an allocation. The crate never verifies symmetry;
//! passing a non-symmetric address to a collective is a caller contract
//! violation with undefined results, exactly as in the underlying PGAS model.
//!
//! # Completion and ordering
//!
//! Initiation calls return a [`Handle`]. Handles are additive: the canonical
//! pattern is to accumulate the handles of a batch and issue one
//! [`Transport::put_wait`] for the sum. `put_wait` guarantees *local*
//! completion only — source buffers are reusable, but remote visibility needs
//! either [`Transport::quiet`] or the per-destination ordering rule:
//! two operations issued by one PE to the **same** destination PE under one
//! completion scope become visible there in issue order. The broadcast and
//! reduction fan-outs depend on that rule ("data, then signal").
//!
//! Atomics carry one more obligation: after a region is zeroed locally (or
//! overwritten by a put), the folds that subsequently land there must combine
//! into exactly the fold of the contributions, for every [`ReduceOp`] — the
//! first contribution must behave as a store. Transports that cannot provide
//! this natively must layer it in their adapter.

use std::iter::Sum;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign};

use thiserror::Error;

use crate::reduce::ReduceDesc;

/// Integer rank of a processing element within the job, in `[0, n_pes)`.
pub type Pe = usize;

/// A byte offset into the symmetric heap.
///
/// The same `SymAddr` names corresponding storage on every PE; which PE's copy
/// an operation touches is decided by the `pe` argument of the transport call.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SymAddr(usize);

impl SymAddr {
    /// Wrap a raw byte offset.
    pub const fn new(offset: usize) -> Self {
        Self(offset)
    }

    /// The raw byte offset.
    pub const fn offset(self) -> usize {
        self.0
    }

    /// The address `bytes` past this one.
    pub const fn byte_add(self, bytes: usize) -> Self {
        Self(self.0 + bytes)
    }
}

/// A typed view of a symmetric allocation: base address plus element count.
///
/// `SymSlice` is a handle, not a borrow — it is `Copy`, carries no lifetime,
/// and grants no direct access. All reads and writes go through a
/// [`Transport`] (remotely via put/atomic, locally via
/// [`Transport::read`]/[`Transport::write`] or the [`read_slice`] /
/// [`write_slice`] helpers).
pub struct SymSlice<T> {
    addr: SymAddr,
    len: usize,
    _elem: PhantomData<T>,
}

impl<T> SymSlice<T> {
    /// Build a typed view over `len` elements starting at `addr`.
    pub const fn new(addr: SymAddr, len: usize) -> Self {
        Self {
            addr,
            len,
            _elem: PhantomData,
        }
    }

    /// Base address of element 0.
    pub const fn addr(&self) -> SymAddr {
        self.addr
    }

    /// Number of elements.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if the slice covers no elements.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total extent in bytes.
    pub const fn byte_len(&self) -> usize {
        self.len * size_of::<T>()
    }

    /// Address of element `i`.
    pub fn index(&self, i: usize) -> SymAddr {
        debug_assert!(i <= self.len, "index {i} out of bounds for length {}", self.len);
        self.addr.byte_add(i * size_of::<T>())
    }
}

impl<T> Clone for SymSlice<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SymSlice<T> {}

impl<T> std::fmt::Debug for SymSlice<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymSlice")
            .field("addr", &self.addr)
            .field("len", &self.len)
            .finish()
    }
}

/// Completion token for initiated one-sided operations.
///
/// A handle counts outstanding work; [`Handle::NONE`] means none. Handles add,
/// so a batch of initiations can be drained with a single
/// [`Transport::put_wait`] on the accumulated sum.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Handle(u64);

impl Handle {
    /// No outstanding work.
    pub const NONE: Handle = Handle(0);

    /// A handle covering `ops` initiated operations.
    pub const fn new(ops: u64) -> Self {
        Self(ops)
    }

    /// Number of operations this handle covers.
    pub const fn pending(self) -> u64 {
        self.0
    }

    /// True if nothing is outstanding.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl Add for Handle {
    type Output = Handle;

    fn add(self, rhs: Handle) -> Handle {
        Handle(self.0 + rhs.0)
    }
}

impl AddAssign for Handle {
    fn add_assign(&mut self, rhs: Handle) {
        self.0 += rhs.0;
    }
}

impl Sum for Handle {
    fn sum<I: Iterator<Item = Handle>>(iter: I) -> Handle {
        iter.fold(Handle::NONE, Add::add)
    }
}

/// Comparison tags accepted by [`Transport::wait_until`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CmpOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Ge,
    /// Less than or equal.
    Le,
}

impl CmpOp {
    /// Evaluate `lhs <cmp> rhs`.
    pub fn eval(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Le => lhs <= rhs,
        }
    }
}

/// The one-sided operations consumed by the collective algorithms.
///
/// Implementations must be usable from the single thread that runs the
/// collectives on this PE; `Send + Sync` is required only so the handle can be
/// shared behind an `Arc`. The blocking calls ([`Transport::put_wait`],
/// [`Transport::wait_until`], [`Transport::quiet`]) may spin or suspend
/// cooperatively; transports that need manual progress must poke it inside
/// their spins.
pub trait Transport: Send + Sync {
    /// This PE's rank.
    fn my_pe(&self) -> Pe;

    /// Total number of PEs in the job.
    fn n_pes(&self) -> usize;

    /// Initiate a one-sided write of the private buffer `src` to `dst` on `pe`.
    ///
    /// The bytes are captured before the call returns; `src` is immediately
    /// reusable.
    fn put(&self, dst: SymAddr, src: &[u8], pe: Pe) -> Handle;

    /// Initiate a one-sided write of `len` bytes sourced from this PE's view
    /// of the symmetric heap at `src`, to `dst` on `pe`.
    fn put_from(&self, dst: SymAddr, src: SymAddr, len: usize, pe: Pe) -> Handle;

    /// Initiate a one-sided element-wise atomic fold of the private buffer
    /// `src` into `dst` on `pe`, under `desc`.
    fn atomic(&self, dst: SymAddr, src: &[u8], pe: Pe, desc: ReduceDesc) -> Handle;

    /// Initiate a one-sided element-wise atomic fold of `len` bytes sourced
    /// from this PE's symmetric heap at `src`, into `dst` on `pe`.
    fn atomic_from(
        &self,
        dst: SymAddr,
        src: SymAddr,
        len: usize,
        pe: Pe,
        desc: ReduceDesc,
    ) -> Handle;

    /// Block until all operations counted by `handle` are locally complete.
    fn put_wait(&self, handle: Handle);

    /// Block until every one-sided operation previously initiated by this PE
    /// is globally complete.
    fn quiet(&self);

    /// Block until the `i64` cell at `cell` in this PE's symmetric heap
    /// compares `cmp` against `value`.
    fn wait_until(&self, cell: SymAddr, cmp: CmpOp, value: i64);

    /// Copy out of this PE's symmetric heap.
    fn read(&self, src: SymAddr, dst: &mut [u8]);

    /// Store into this PE's symmetric heap.
    fn write(&self, dst: SymAddr, src: &[u8]);

    /// Read one `i64` cell from this PE's symmetric heap.
    fn read_i64(&self, addr: SymAddr) -> i64 {
        let mut bytes = [0u8; 8];
        self.read(addr, &mut bytes);
        i64::from_ne_bytes(bytes)
    }

    /// Store one `i64` cell into this PE's symmetric heap.
    fn write_i64(&self, addr: SymAddr, value: i64) {
        self.write(addr, &value.to_ne_bytes());
    }

    /// Zero `len` bytes of this PE's symmetric heap starting at `dst`.
    fn fill_zero(&self, dst: SymAddr, len: usize) {
        self.write(dst, &vec![0u8; len]);
    }

    /// Copy `len` bytes between two ranges of this PE's symmetric heap.
    fn local_copy(&self, dst: SymAddr, src: SymAddr, len: usize) {
        let mut buf = vec![0u8; len];
        self.read(src, &mut buf);
        self.write(dst, &buf);
    }
}

/// The symmetric-heap allocator the library consumes at initialization.
///
/// Symmetric allocation is a collective convention: every PE must perform
/// the same sequence of allocations, and corresponding calls yield the same
/// offset on every PE. The allocator itself enforces nothing across PEs.
pub trait SymmetricAlloc {
    /// Reserve `len` bytes of zeroed symmetric storage.
    fn symmetric_alloc(&self, len: usize) -> Result<SymAddr, AllocError>;

    /// Reserve a typed symmetric slice of `len` elements.
    fn alloc_slice<T>(&self, len: usize) -> Result<SymSlice<T>, AllocError>
    where
        Self: Sized,
    {
        Ok(SymSlice::new(self.symmetric_alloc(len * size_of::<T>())?, len))
    }
}

/// Failure to reserve symmetric storage.
#[derive(Debug, Error)]
pub enum AllocError {
    /// The symmetric heap cannot satisfy the request.
    #[error("symmetric heap exhausted: requested {requested} bytes, {available} available")]
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
        /// Bytes left in the heap.
        available: usize,
    },
}

/// Element types that can live in symmetric memory.
///
/// The conversion is by value through native-endian bytes; both sides of a
/// transfer run the same binary, so no cross-format concerns arise.
pub trait SymElem: Copy + Send + Sync + 'static {
    /// Serialize into `out`, which is exactly `size_of::<Self>()` bytes.
    fn write_to(&self, out: &mut [u8]);

    /// Deserialize from `buf`, which is exactly `size_of::<Self>()` bytes.
    fn read_from(buf: &[u8]) -> Self;
}

macro_rules! sym_elem_primitive {
    ($($ty:ty),+ $(,)?) => {$(
        impl SymElem for $ty {
            fn write_to(&self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }

            fn read_from(buf: &[u8]) -> Self {
                <$ty>::from_ne_bytes(buf.try_into().expect("element buffer width"))
            }
        }
    )+};
}

sym_elem_primitive!(u8, i16, u16, i32, u32, i64, u64, f32, f64);

/// Write `values` into this PE's copy of `dst`.
///
/// Local store; no remote traffic. Panics if `values` is longer than `dst`.
pub fn write_slice<T: SymElem>(transport: &dyn Transport, dst: SymSlice<T>, values: &[T]) {
    assert!(
        values.len() <= dst.len(),
        "writing {} elements into a slice of {}",
        values.len(),
        dst.len()
    );
    let mut bytes = vec![0u8; values.len() * size_of::<T>()];
    for (chunk, value) in bytes.chunks_exact_mut(size_of::<T>()).zip(values) {
        value.write_to(chunk);
    }
    transport.write(dst.addr(), &bytes);
}

/// Read this PE's copy of `src` into a vector.
pub fn read_slice<T: SymElem>(transport: &dyn Transport, src: SymSlice<T>) -> Vec<T> {
    let mut bytes = vec![0u8; src.byte_len()];
    transport.read(src.addr(), &mut bytes);
    bytes.chunks_exact(size_of::<T>()).map(T::read_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_additive() {
        let mut h = Handle::NONE;
        assert!(h.is_none());
        h += Handle::new(2);
        h = h + Handle::new(3);
        assert_eq!(h.pending(), 5);

        let total: Handle = [Handle::new(1), Handle::NONE, Handle::new(4)]
            .into_iter()
            .sum();
        assert_eq!(total, Handle::new(5));
    }

    #[test]
    fn cmp_op_covers_all_orderings() {
        assert!(CmpOp::Eq.eval(3, 3));
        assert!(!CmpOp::Eq.eval(3, 4));
        assert!(CmpOp::Ne.eval(1, 0));
        assert!(CmpOp::Gt.eval(2, 1));
        assert!(!CmpOp::Gt.eval(1, 1));
        assert!(CmpOp::Lt.eval(-1, 0));
        assert!(CmpOp::Ge.eval(1, 1));
        assert!(CmpOp::Le.eval(0, 1));
    }

    #[test]
    fn sym_slice_indexing_is_in_element_units() {
        let s = SymSlice::<i64>::new(SymAddr::new(64), 4);
        assert_eq!(s.byte_len(), 32);
        assert_eq!(s.index(0), SymAddr::new(64));
        assert_eq!(s.index(3), SymAddr::new(64 + 24));
    }
}
