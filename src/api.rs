//! The typed entry-point surface.
//!
//! Free functions in the classic SHMEM shape: the reduction matrix
//! (`{type}_{op}_to_all`), plus byte-width variants of broadcast, collect,
//! and fcollect. Each is a thin adapter over one generic path on
//! [`Collectives`] — the matrix is generated, never hand-repeated.

use num_complex::{Complex32, Complex64};
use paste::paste;

use crate::collective::Collectives;
use crate::group::ActiveSet;
use crate::reduce::ReduceOp;
use crate::sync::{SyncArray, WorkArray};
use crate::transport::{Pe, SymSlice};

macro_rules! reduce_entry_points {
    ($($prefix:ident / $ty:ty => [$($op:ident),+ $(,)?]);+ $(;)?) => { paste! { $($(
        #[doc = concat!(
            "Element-wise `", stringify!($op), "` over `", stringify!($ty),
            "` values: after return, `target[i]` on every member of `set` holds the fold of ",
            "the members' `source[i]`.",
        )]
        #[doc = ""]
        #[doc = "`nreduce` values of zero or less are a no-op."]
        pub fn [<$prefix _ $op:lower _to_all>](
            collectives: &Collectives,
            target: SymSlice<$ty>,
            source: SymSlice<$ty>,
            nreduce: i32,
            set: &ActiveSet,
            pwrk: &WorkArray<$ty>,
            psync: &SyncArray,
        ) {
            if nreduce <= 0 {
                return;
            }
            collectives.reduce(
                ReduceOp::$op,
                target,
                source,
                nreduce as usize,
                set,
                pwrk,
                psync,
            );
        }
    )+)+ } };
}

reduce_entry_points! {
    i16 / i16 => [And, Or, Xor, Min, Max, Sum, Prod];
    i32 / i32 => [And, Or, Xor, Min, Max, Sum, Prod];
    i64 / i64 => [And, Or, Xor, Min, Max, Sum, Prod];
    f32 / f32 => [Min, Max, Sum, Prod];
    f64 / f64 => [Min, Max, Sum, Prod];
    c32 / Complex32 => [Sum, Prod];
    c64 / Complex64 => [Sum, Prod];
}

/// Broadcast `nelems` 4-byte elements from `root`'s `source` to every
/// member's `target`.
pub fn broadcast32(
    collectives: &Collectives,
    target: SymSlice<u32>,
    source: SymSlice<u32>,
    nelems: usize,
    root: Pe,
    set: &ActiveSet,
    psync: &SyncArray,
) {
    collectives.broadcast(target.addr(), source.addr(), nelems * 4, root, set, psync);
}

/// Broadcast `nelems` 8-byte elements from `root`'s `source` to every
/// member's `target`.
pub fn broadcast64(
    collectives: &Collectives,
    target: SymSlice<u64>,
    source: SymSlice<u64>,
    nelems: usize,
    root: Pe,
    set: &ActiveSet,
    psync: &SyncArray,
) {
    collectives.broadcast(target.addr(), source.addr(), nelems * 8, root, set, psync);
}

/// Rank-ordered concatenation of per-member contributions of `nelems` 4-byte
/// elements (lengths may differ across members).
pub fn collect32(
    collectives: &Collectives,
    target: SymSlice<u32>,
    source: SymSlice<u32>,
    nelems: usize,
    set: &ActiveSet,
    psync: &SyncArray,
) {
    collectives.collect(target.addr(), source.addr(), nelems * 4, set, psync);
}

/// Rank-ordered concatenation of per-member contributions of `nelems` 8-byte
/// elements (lengths may differ across members).
pub fn collect64(
    collectives: &Collectives,
    target: SymSlice<u64>,
    source: SymSlice<u64>,
    nelems: usize,
    set: &ActiveSet,
    psync: &SyncArray,
) {
    collectives.collect(target.addr(), source.addr(), nelems * 8, set, psync);
}

/// Rank-ordered concatenation of exactly `nelems` 4-byte elements from every
/// member.
pub fn fcollect32(
    collectives: &Collectives,
    target: SymSlice<u32>,
    source: SymSlice<u32>,
    nelems: usize,
    set: &ActiveSet,
    psync: &SyncArray,
) {
    collectives.fcollect(target.addr(), source.addr(), nelems * 4, set, psync);
}

/// Rank-ordered concatenation of exactly `nelems` 8-byte elements from every
/// member.
pub fn fcollect64(
    collectives: &Collectives,
    target: SymSlice<u64>,
    source: SymSlice<u64>,
    nelems: usize,
    set: &ActiveSet,
    psync: &SyncArray,
) {
    collectives.fcollect(target.addr(), source.addr(), nelems * 8, set, psync);
}
