//! Chunked all-reduce through the root's landing pad.
//!
//! Every member (the root included) folds its chunk into the root's `pWrk`
//! with a remote atomic, so contributions and the root's own share arrive
//! through one transport-ordered path. The root validates the arrival
//! quorum, copies the folded chunk out, re-zeroes the pad, and fans the
//! chunk result back with a data-then-signal put pair per peer.

use tracing::trace;

use crate::group::ActiveSet;
use crate::reduce::{ReduceDesc, ReduceElem};
use crate::sync::SyncArray;
use crate::transport::{Handle, SymAddr, SymSlice, Transport};

#[allow(clippy::too_many_arguments)]
pub(crate) fn reduce<T: ReduceElem>(
    transport: &dyn Transport,
    desc: ReduceDesc,
    target: SymSlice<T>,
    source: SymSlice<T>,
    count: usize,
    set: &ActiveSet,
    pwrk: SymAddr,
    psync: &SyncArray,
    work_unit: usize,
) {
    trace!(
        pe = transport.my_pe(),
        op = ?desc.op,
        dtype = ?desc.dtype,
        count,
        work_unit,
        "reduce"
    );

    let elem = desc.elem_size();
    let root = set.root();
    let cell = psync.primary();

    let mut sent = 0;
    while sent < count {
        let chunk = work_unit.min(count - sent);
        let len = chunk * elem;
        let chunk_src = source.index(sent);
        let chunk_dst = target.index(sent);

        if transport.my_pe() == root {
            let fold = transport.atomic_from(pwrk, chunk_src, len, root, desc);
            cell.wait_eq(transport, (set.size() - 1) as i64);
            transport.put_wait(fold);
            cell.reset(transport);
            transport.local_copy(chunk_dst, pwrk, len);
            transport.fill_zero(pwrk, len);

            let mut pending = Handle::NONE;
            for pe in set.pes().skip(1) {
                pending += transport.put_from(chunk_dst, chunk_dst, len, pe);
                pending += cell.set_remote(transport, 1, pe);
            }
            transport.put_wait(pending);
        } else {
            let mut pending = transport.atomic_from(pwrk, chunk_src, len, root, desc);
            pending += cell.add_remote(transport, 1, root);
            transport.put_wait(pending);
            cell.wait_nonzero(transport);
            cell.reset(transport);
        }

        sent += chunk;
    }
}
