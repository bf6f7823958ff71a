//! Testing utilities: an in-process multi-PE world and result assertions.
//!
//! Collectives only mean something across a set of PEs, so the test story
//! starts with [`TestFabric`]: a simulated job whose symmetric heaps live in
//! one address space and whose "PEs" are threads. [`run_spmd`] spawns one
//! thread per rank, hands each a [`FabricPe`] transport handle, and gathers
//! the per-rank results.
//!
//! ```
//! use std::sync::Arc;
//! use symmem::testing::{assert_all_pes_equal, run_spmd};
//! use symmem::transport::{SymmetricAlloc, read_slice, write_slice};
//! use symmem::{ActiveSet, Collectives, ReduceOp, SyncArray, Transport, WorkArray};
//!
//! let results = run_spmd(4, |t| {
//!     let target = t.alloc_slice::<i64>(3).unwrap();
//!     let source = t.alloc_slice::<i64>(3).unwrap();
//!     let pwrk = WorkArray::alloc_for(&t, 3).unwrap();
//!     let psync = SyncArray::alloc(&t).unwrap();
//!     let contribution = t.my_pe() as i64 + 1;
//!     write_slice(&t, source, &[contribution; 3]);
//!
//!     let c = Collectives::init(Arc::new(t.clone())).unwrap();
//!     c.reduce(ReduceOp::Sum, target, source, 3, &ActiveSet::full(4), &pwrk, &psync);
//!     read_slice(&t, target)
//! });
//! assert_all_pes_equal(&results, &[10, 10, 10]);
//! ```
//!
//! The fabric is a faithful implementation of the transport contract, not a
//! stub: deposits are synchronous under the destination heap's lock, waits
//! spin with a yield, and atomic folds honor the pre-zeroed-region rule for
//! every operation (see the [`fabric`] module docs). This keeps every
//! interleaving the algorithms can see in a real fabric reachable — threads
//! race for real.

pub mod assertions;
pub mod fabric;

pub use assertions::{assert_all_pes_equal, assert_pes_converged, assert_zeroed};
pub use fabric::{FabricPe, TestFabric, run_spmd, run_spmd_on};
