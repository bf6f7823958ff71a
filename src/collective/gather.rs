//! Rank-ordered concatenation: variable-length `collect` and fixed-length
//! `fcollect`.
//!
//! Both gather into the first member's `target` and finish with a broadcast
//! of the assembled buffer over the same synchronization array. They differ
//! in how placement offsets are found: `collect` threads a running offset
//! serially through the group (no member knows the others' lengths), while
//! `fcollect` places in parallel at `rank * len` and counts arrivals with an
//! atomic.

use tracing::trace;

use super::broadcast::broadcast;
use crate::group::ActiveSet;
use crate::sync::SyncArray;
use crate::transport::{Handle, Pe, SymAddr, Transport};

/// Concatenate contributions of varying byte lengths, rank order.
///
/// The offset chain travels through `pSync[0..2]` as one 16-byte put:
/// `[running_offset, ready_flag]`. The last member wraps the chain back to
/// the first, carrying the total length the terminal broadcast uses.
pub(crate) fn collect(
    transport: &dyn Transport,
    target: SymAddr,
    source: SymAddr,
    len: usize,
    set: &ActiveSet,
    psync: &SyncArray,
) {
    trace!(pe = transport.my_pe(), len, size = set.size(), "collect");

    if set.size() == 1 {
        if target != source {
            transport.local_copy(target, source, len);
        }
        return;
    }

    let me = transport.my_pe();
    let first = set.start();
    let offset_cell = psync.primary();
    let ready_cell = psync.aux();
    let mut bcast_len = 0;

    if me == first {
        let mut pending = Handle::NONE;
        if target != source {
            pending += transport.put_from(target, source, len, me);
        }
        pending += put_chain_link(transport, psync, len as i64, first + set.stride());
        ready_cell.wait_nonzero(transport);
        transport.put_wait(pending);
        bcast_len = offset_cell.load(transport) as usize;
        offset_cell.reset(transport);
        ready_cell.reset(transport);
    } else {
        ready_cell.wait_nonzero(transport);
        let my_offset = offset_cell.load(transport) as usize;
        let mut pending = transport.put_from(target.byte_add(my_offset), source, len, first);
        let next = if me == set.last() {
            first
        } else {
            me + set.stride()
        };
        let total = (my_offset + len) as i64;
        offset_cell.reset(transport);
        ready_cell.reset(transport);
        pending += put_chain_link(transport, psync, total, next);
        transport.put_wait(pending);
    }

    broadcast(transport, target, target, bcast_len, first, set, psync);
}

/// Concatenate contributions of exactly `len` bytes each, rank order.
pub(crate) fn fcollect(
    transport: &dyn Transport,
    target: SymAddr,
    source: SymAddr,
    len: usize,
    set: &ActiveSet,
    psync: &SyncArray,
) {
    trace!(pe = transport.my_pe(), len, size = set.size(), "fcollect");

    let me = transport.my_pe();
    let first = set.start();
    let cell = psync.primary();

    if me == first {
        let mut pending = Handle::NONE;
        if source != target {
            pending += transport.put_from(target, source, len, me);
        }
        cell.wait_eq(transport, (set.size() - 1) as i64);
        transport.put_wait(pending);
        cell.reset(transport);
    } else {
        let rank = set
            .rank_of(me)
            .expect("calling PE is not a member of the active set");
        let mut pending = transport.put_from(target.byte_add(rank * len), source, len, first);
        pending += cell.add_remote(transport, 1, first);
        transport.put_wait(pending);
    }

    broadcast(transport, target, target, len * set.size(), first, set, psync);
}

/// Forward `[offset, 1]` into `pSync[0..2]` on `pe` as a single put, so the
/// ready flag cannot become visible before the offset.
fn put_chain_link(transport: &dyn Transport, psync: &SyncArray, offset: i64, pe: Pe) -> Handle {
    let mut link = [0u8; 16];
    link[..8].copy_from_slice(&offset.to_ne_bytes());
    link[8..].copy_from_slice(&1i64.to_ne_bytes());
    transport.put(psync.as_slice().addr(), &link, pe)
}
