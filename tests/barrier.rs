use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use symmem::testing::{assert_zeroed, run_spmd};
use symmem::{ActiveSet, Collectives, SyncArray, Transport};

fn read_psync_bytes(t: &dyn Transport, psync: &SyncArray) -> Vec<u8> {
    let cells = psync.as_slice();
    let mut bytes = vec![0u8; cells.byte_len()];
    t.read(cells.addr(), &mut bytes);
    bytes
}

#[test]
fn back_to_back_barriers_return_on_every_pe() -> anyhow::Result<()> {
    let results = run_spmd(4, |t| {
        let psync = SyncArray::alloc(&t).unwrap();
        let before = read_psync_bytes(&t, &psync);

        let c = Collectives::init(Arc::new(t.clone())).unwrap();
        c.barrier_all();
        c.barrier_all();

        let set = ActiveSet::full(4);
        c.barrier(&set, &psync);
        c.barrier(&set, &psync);
        (before, read_psync_bytes(&t, &psync))
    });

    for (before, after) in results {
        assert_zeroed(&before, "pSync on entry");
        assert_zeroed(&after, "pSync on exit");
    }
    Ok(())
}

#[test]
fn no_pe_passes_a_barrier_the_others_have_not_entered() -> anyhow::Result<()> {
    let n = 4;
    let phases: Vec<AtomicUsize> = (0..n).map(|_| AtomicUsize::new(0)).collect();
    let phases = &phases;

    run_spmd(n, |t| {
        let psync = SyncArray::alloc(&t).unwrap();
        let c = Collectives::init(Arc::new(t.clone())).unwrap();
        let set = ActiveSet::full(n);
        for round in 1..=5 {
            phases[t.my_pe()].store(round, Ordering::SeqCst);
            c.barrier(&set, &psync);
            for (pe, phase) in phases.iter().enumerate() {
                let seen = phase.load(Ordering::SeqCst);
                assert!(
                    seen >= round,
                    "PE {} released from round {round} while PE {pe} was in round {seen}",
                    t.my_pe()
                );
            }
        }
    });
    Ok(())
}

#[test]
fn strided_barrier_ignores_non_members() -> anyhow::Result<()> {
    // PEs 1 and 3 synchronize; 0 and 2 never touch the scratch.
    let n = 4;
    let set = ActiveSet::new(1, 1, 2);
    let phases: Vec<AtomicUsize> = (0..n).map(|_| AtomicUsize::new(0)).collect();
    let phases = &phases;

    run_spmd(n, |t| {
        if !set.contains(t.my_pe()) {
            return;
        }
        let psync = SyncArray::alloc(&t).unwrap();
        let c = Collectives::init(Arc::new(t.clone())).unwrap();
        for round in 1..=3 {
            phases[t.my_pe()].store(round, Ordering::SeqCst);
            c.barrier(&set, &psync);
            for pe in set.pes() {
                assert!(phases[pe].load(Ordering::SeqCst) >= round);
            }
        }
    });
    Ok(())
}

#[test]
fn singleton_barrier_returns_immediately() -> anyhow::Result<()> {
    run_spmd(3, |t| {
        if t.my_pe() != 2 {
            return;
        }
        let psync = SyncArray::alloc(&t).unwrap();
        let c = Collectives::init(Arc::new(t.clone())).unwrap();
        c.barrier(&ActiveSet::new(2, 0, 1), &psync);
    });
    Ok(())
}
