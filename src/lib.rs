//! # Symmem
//!
//! The **collective-communication core** of a partitioned-global-address-space
//! (PGAS) runtime: synchronizing group operations for a set of processing
//! elements (PEs), built on a narrow one-sided transport (put, remote atomic
//! fold, completion wait, quiet, wait-on-cell).
//!
//! ## Operations
//!
//! - **Barrier** - [`Collectives::barrier`] / [`Collectives::barrier_all`]:
//!   gather-release synchronization with quiet-on-entry semantics.
//! - **Reduction** - [`Collectives::reduce`] and the typed
//!   `{type}_{op}_to_all` surface in [`api`]: element-wise AND/OR/XOR/MIN/
//!   MAX/SUM/PROD over integer, float, and complex domains, delivered to
//!   every member.
//! - **Broadcast** - [`Collectives::broadcast`] and
//!   [`api::broadcast32`]/[`api::broadcast64`]: root-driven fan-out.
//! - **Collect** - [`Collectives::collect`]: rank-ordered concatenation of
//!   *variable-length* contributions.
//! - **Fcollect** - [`Collectives::fcollect`]: rank-ordered concatenation of
//!   *fixed-length* contributions.
//!
//! ## Core concepts
//!
//! ### PEs and active sets
//!
//! A PE is an integer rank in `[0, n_pes)`; each runs one instance of this
//! library. The subset participating in a collective is an [`ActiveSet`]:
//! the arithmetic progression `(PE_start, logPE_stride, PE_size)`.
//!
//! ### The symmetric heap
//!
//! Buffers touched remotely are *symmetric*: allocated at the same offset on
//! every PE, so one [`transport::SymAddr`] names corresponding storage
//! everywhere. [`transport::SymSlice`] is the typed handle. Symmetry is a
//! caller contract the library never checks.
//!
//! ### Scratch arrays as signaling channels
//!
//! Callers supply the synchronization scratch each collective signals
//! through: a [`SyncArray`] (pSync, [`SYNC_SIZE`] cells) and, for
//! reductions, a [`WorkArray`] (pWrk, at least
//! [`REDUCE_MIN_WRKDATA_SIZE`] elements). Both must be all-zero on entry and
//! are all-zero again on exit, so one allocation serves back-to-back
//! collectives on the same group. Overlapping collectives must not share
//! scratch; the library does not detect violations.
//!
//! ## Quick start
//!
//! The snippet below runs a 4-PE job on the in-process [`testing`] fabric;
//! with a production [`transport::Transport`] the collective code is
//! unchanged.
//!
//! ```
//! use std::sync::Arc;
//! use symmem::testing::run_spmd;
//! use symmem::transport::{SymmetricAlloc, read_slice, write_slice};
//! use symmem::{ActiveSet, Collectives, SyncArray, Transport, api};
//!
//! let results = run_spmd(3, |t| {
//!     let buf = t.alloc_slice::<u64>(4).unwrap();
//!     let psync = SyncArray::alloc(&t).unwrap();
//!     if t.my_pe() == 0 {
//!         write_slice(&t, buf, &[7, 8, 9, 10]);
//!     }
//!
//!     let c = Collectives::init(Arc::new(t.clone())).unwrap();
//!     // In-place broadcast from PE 0 to the whole job.
//!     api::broadcast64(&c, buf, buf, 4, 0, &ActiveSet::full(3), &psync);
//!     c.barrier_all();
//!     read_slice(&t, buf)
//! });
//! for per_pe in &results {
//!     assert_eq!(per_pe, &[7, 8, 9, 10]);
//! }
//! ```
//!
//! ## Completion model
//!
//! Collectives block the calling thread until locally complete. Completion on
//! one PE does not imply completion on the others: non-root members are
//! released as soon as their signal cell flips, while stragglers may still be
//! arriving. Pair a collective with a barrier when full rendezvous matters.
//! There is no cancellation and there are no timeouts; recovery from a lost
//! PE belongs to the application, per the PGAS contract.
//!
//! ## Module overview
//!
//! - [`transport`] - the one-sided capability set the algorithms consume,
//!   plus symmetric addressing types.
//! - [`sync`] - pSync/pWrk conventions and the [`SignalCell`] protocol.
//! - [`group`] - active-set descriptors.
//! - [`reduce`] - reduction descriptors and element fold semantics.
//! - [`collective`] - the five algorithms behind [`Collectives`].
//! - [`api`] - the typed SHMEM-shaped entry points.
//! - [`testing`] - the in-process fabric and SPMD harness.

pub mod api;
pub mod collective;
pub mod group;
pub mod reduce;
pub mod sync;
pub mod testing;
pub mod transport;

pub use collective::{Collectives, InitError};
pub use group::ActiveSet;
pub use reduce::{Complex32, Complex64, DataType, ReduceDesc, ReduceElem, ReduceOp};
pub use sync::{REDUCE_MIN_WRKDATA_SIZE, SYNC_SIZE, SignalCell, SyncArray, WorkArray};
pub use transport::{CmpOp, Handle, Pe, SymAddr, SymSlice, Transport};
