//! Gather-release barrier at the group root.

use tracing::trace;

use crate::group::ActiveSet;
use crate::sync::SyncArray;
use crate::transport::Transport;

/// Block until every member of `set` has entered.
///
/// Non-root members increment the root's counter cell and park on their own;
/// the root waits for the full count, re-zeroes, and releases each peer with
/// a flag put. Every member leaves its cell at zero.
pub(crate) fn barrier(transport: &dyn Transport, set: &ActiveSet, psync: &SyncArray) {
    trace!(
        pe = transport.my_pe(),
        start = set.start(),
        size = set.size(),
        "barrier"
    );
    transport.quiet();

    let cell = psync.primary();
    if transport.my_pe() == set.root() {
        cell.wait_eq(transport, (set.size() - 1) as i64);
        cell.reset(transport);
        for pe in set.pes().skip(1) {
            // Flag puts are not waited on; the peer's next quiet covers them.
            cell.set_remote(transport, 1, pe);
        }
    } else {
        cell.add_remote(transport, 1, set.root());
        cell.wait_nonzero(transport);
        cell.reset(transport);
    }
}
