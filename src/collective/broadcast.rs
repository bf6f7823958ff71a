//! Root-driven linear fan-out.

use tracing::trace;

use crate::group::ActiveSet;
use crate::sync::SyncArray;
use crate::transport::{Handle, Pe, SymAddr, Transport};

/// Copy `len` bytes of `root`'s `source` into each member's `target`.
///
/// Data and release flag go to each peer in that order within one completion
/// scope, so a peer that observes the flag is guaranteed to see the payload.
/// Only the root reads `len`.
pub(crate) fn broadcast(
    transport: &dyn Transport,
    target: SymAddr,
    source: SymAddr,
    len: usize,
    root: Pe,
    set: &ActiveSet,
    psync: &SyncArray,
) {
    trace!(pe = transport.my_pe(), root, len, "broadcast");

    let cell = psync.primary();
    if transport.my_pe() == root {
        let mut pending = Handle::NONE;
        for pe in set.pes() {
            if pe == root && source == target {
                continue;
            }
            pending += transport.put_from(target, source, len, pe);
            if pe != root {
                pending += cell.set_remote(transport, 1, pe);
            }
        }
        transport.put_wait(pending);
    } else {
        cell.wait_nonzero(transport);
        cell.reset(transport);
    }
}
