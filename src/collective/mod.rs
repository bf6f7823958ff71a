//! The collective algorithms and the library handle that runs them.
//!
//! [`Collectives`] owns the transport and the one piece of process-wide
//! mutable state in the crate: the barrier synchronization array, allocated
//! at [`Collectives::init`] and reused by every [`Collectives::barrier_all`].
//! Everything else lives in caller-owned scratch ([`SyncArray`],
//! [`WorkArray`]) passed per call.
//!
//! All topologies are linear in the group size: signals gather at the root
//! and results fan back out peer by peer. A tree-shaped replacement would be
//! an internal change only — nothing in the external contract depends on the
//! topology.
//!
//! # Blocking model
//!
//! Each collective runs to completion on the calling thread. A collective
//! returning on one PE does **not** mean every other member has returned;
//! non-root members are released as soon as their local signal cell flips.
//! Callers needing full two-sided rendezvous pair the collective with a
//! barrier. There are no timeouts; a missing member blocks the group
//! forever.

mod barrier;
mod broadcast;
mod gather;
mod reduce;

use std::sync::Arc;

use thiserror::Error;

use crate::group::ActiveSet;
use crate::reduce::{ReduceDesc, ReduceElem, ReduceOp};
use crate::sync::{REDUCE_MIN_WRKDATA_SIZE, SYNC_SIZE, SyncArray, WorkArray};
use crate::transport::{AllocError, Pe, SymAddr, SymSlice, SymmetricAlloc, Transport};

/// Failure to bring the collective layer up.
#[derive(Debug, Error)]
pub enum InitError {
    /// The barrier synchronization array could not be allocated.
    #[error("failed to allocate the barrier synchronization array: {0}")]
    BarrierAlloc(#[from] AllocError),
}

/// The collective-communication layer over one PE's transport.
///
/// Each PE constructs exactly one `Collectives` from its transport handle;
/// construction is collective (it performs a symmetric allocation, so every
/// PE must construct in the same allocation order). The handle is not usable
/// from two overlapping collectives at once — one collective at a time per
/// PE, per the blocking model.
pub struct Collectives {
    transport: Arc<dyn Transport>,
    barrier_sync: SyncArray,
}

impl Collectives {
    /// Allocate the internal barrier array and wrap the transport.
    pub fn init<T>(transport: Arc<T>) -> Result<Self, InitError>
    where
        T: Transport + SymmetricAlloc + 'static,
    {
        let cells = transport.alloc_slice::<i64>(SYNC_SIZE)?;
        transport.fill_zero(cells.addr(), cells.byte_len());
        Ok(Self {
            barrier_sync: SyncArray::new(cells),
            transport,
        })
    }

    /// The transport this layer drives.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// This PE's rank.
    pub fn my_pe(&self) -> Pe {
        self.transport.my_pe()
    }

    /// Total number of PEs in the job.
    pub fn n_pes(&self) -> usize {
        self.transport.n_pes()
    }

    /// Barrier across every PE in the job, over the internal array.
    pub fn barrier_all(&self) {
        let set = ActiveSet::full(self.n_pes());
        barrier::barrier(self.transport(), &set, &self.barrier_sync);
    }

    /// Barrier across `set`.
    ///
    /// Returns only after every member has entered; drains this PE's prior
    /// one-sided traffic on entry, so local effects ordered before the call
    /// are globally visible by the time it returns.
    pub fn barrier(&self, set: &ActiveSet, psync: &SyncArray) {
        barrier::barrier(self.transport(), set, psync);
    }

    /// Element-wise reduction of `count` elements across `set`, delivered to
    /// every member's `target`.
    ///
    /// `source` and `target` may alias. `pwrk` must hold at least
    /// `max(REDUCE_MIN_WRKDATA_SIZE, count / 2 + 1)` elements. Panics if
    /// `(op, T)` is outside the supported matrix.
    pub fn reduce<T: ReduceElem>(
        &self,
        op: ReduceOp,
        target: SymSlice<T>,
        source: SymSlice<T>,
        count: usize,
        set: &ActiveSet,
        pwrk: &WorkArray<T>,
        psync: &SyncArray,
    ) {
        let work_unit = REDUCE_MIN_WRKDATA_SIZE.max(count / 2 + 1);
        self.reduce_with_work_unit(op, target, source, count, set, pwrk, psync, work_unit);
    }

    /// [`Collectives::reduce`] with an explicit work-unit size.
    ///
    /// The result is invariant under the choice of `work_unit` (any value of
    /// at least [`REDUCE_MIN_WRKDATA_SIZE`] that fits in `pwrk`); the default
    /// `max(REDUCE_MIN_WRKDATA_SIZE, count / 2 + 1)` merely bounds the number
    /// of round trips.
    #[allow(clippy::too_many_arguments)]
    pub fn reduce_with_work_unit<T: ReduceElem>(
        &self,
        op: ReduceOp,
        target: SymSlice<T>,
        source: SymSlice<T>,
        count: usize,
        set: &ActiveSet,
        pwrk: &WorkArray<T>,
        psync: &SyncArray,
        work_unit: usize,
    ) {
        let desc = ReduceDesc::new(op, T::DATATYPE);
        assert!(
            desc.is_supported(),
            "unsupported reduction {:?} over {:?}",
            op,
            T::DATATYPE
        );
        assert!(
            work_unit >= REDUCE_MIN_WRKDATA_SIZE && work_unit <= pwrk.len(),
            "work unit {work_unit} outside [{REDUCE_MIN_WRKDATA_SIZE}, {}]",
            pwrk.len()
        );
        reduce::reduce(
            self.transport(),
            desc,
            target,
            source,
            count,
            set,
            pwrk.addr(),
            psync,
            work_unit,
        );
    }

    /// Copy `len` bytes from `root`'s `source` into every member's `target`.
    ///
    /// The root's own `target` is written through a self-put only when
    /// `source != target`. Only the root reads `len`; released members learn
    /// the extent from the arriving data.
    pub fn broadcast(
        &self,
        target: SymAddr,
        source: SymAddr,
        len: usize,
        root: Pe,
        set: &ActiveSet,
        psync: &SyncArray,
    ) {
        broadcast::broadcast(self.transport(), target, source, len, root, set, psync);
    }

    /// Concatenate per-member contributions of *varying* byte lengths into
    /// every member's `target`, in group-rank order.
    pub fn collect(
        &self,
        target: SymAddr,
        source: SymAddr,
        len: usize,
        set: &ActiveSet,
        psync: &SyncArray,
    ) {
        gather::collect(self.transport(), target, source, len, set, psync);
    }

    /// Concatenate per-member contributions of exactly `len` bytes each into
    /// every member's `target`, in group-rank order.
    pub fn fcollect(
        &self,
        target: SymAddr,
        source: SymAddr,
        len: usize,
        set: &ActiveSet,
        psync: &SyncArray,
    ) {
        gather::fcollect(self.transport(), target, source, len, set, psync);
    }
}
