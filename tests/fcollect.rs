use std::sync::Arc;

use symmem::api::{fcollect32, fcollect64};
use symmem::testing::{assert_all_pes_equal, assert_zeroed, run_spmd};
use symmem::transport::{SymmetricAlloc, read_slice, write_slice};
use symmem::{ActiveSet, Collectives, SyncArray, Transport};

#[test]
fn four_pes_two_words_each() -> anyhow::Result<()> {
    // PE k contributes 8 bytes of value k; the assembled 32 bytes are four
    // contiguous runs in rank order on every PE.
    let results = run_spmd(4, |t| {
        let target = t.alloc_slice::<u32>(8).unwrap();
        let source = t.alloc_slice::<u32>(2).unwrap();
        let psync = SyncArray::alloc(&t).unwrap();
        let stamp = u32::from_ne_bytes([t.my_pe() as u8; 4]);
        write_slice(&t, source, &[stamp; 2]);

        let c = Collectives::init(Arc::new(t.clone())).unwrap();
        fcollect32(&c, target, source, 2, &ActiveSet::full(4), &psync);

        let mut scratch = vec![0u8; psync.as_slice().byte_len()];
        t.read(psync.as_slice().addr(), &mut scratch);
        assert_zeroed(&scratch, "pSync after fcollect");
        read_slice(&t, target)
    });

    let run = |k: u8| u32::from_ne_bytes([k; 4]);
    let expected = [
        run(0), run(0), run(1), run(1), run(2), run(2), run(3), run(3),
    ];
    assert_all_pes_equal(&results, &expected);
    Ok(())
}

#[test]
fn fcollect64_three_pes() -> anyhow::Result<()> {
    let results = run_spmd(3, |t| {
        let target = t.alloc_slice::<u64>(3).unwrap();
        let source = t.alloc_slice::<u64>(1).unwrap();
        let psync = SyncArray::alloc(&t).unwrap();
        write_slice(&t, source, &[1000 + t.my_pe() as u64]);

        let c = Collectives::init(Arc::new(t.clone())).unwrap();
        fcollect64(&c, target, source, 1, &ActiveSet::full(3), &psync);
        read_slice(&t, target)
    });
    assert_all_pes_equal(&results, &[1000, 1001, 1002]);
    Ok(())
}

#[test]
fn strided_group_packs_by_group_rank() -> anyhow::Result<()> {
    // Members 0 and 2: group ranks 0 and 1, so slots are rank-indexed, not
    // PE-indexed.
    let set = ActiveSet::new(0, 1, 2);
    let results = run_spmd(4, |t| {
        let target = t.alloc_slice::<u64>(2).unwrap();
        let source = t.alloc_slice::<u64>(1).unwrap();
        let psync = SyncArray::alloc(&t).unwrap();
        write_slice(&t, source, &[t.my_pe() as u64 + 40]);
        if !set.contains(t.my_pe()) {
            return Vec::new();
        }

        let c = Collectives::init(Arc::new(t.clone())).unwrap();
        fcollect64(&c, target, source, 1, &set, &psync);
        read_slice(&t, target)
    });

    assert_eq!(results[0], vec![40, 42]);
    assert_eq!(results[2], vec![40, 42]);
    assert!(results[1].is_empty() && results[3].is_empty());
    Ok(())
}

#[test]
fn singleton_group() -> anyhow::Result<()> {
    let results = run_spmd(1, |t| {
        let target = t.alloc_slice::<u32>(2).unwrap();
        let source = t.alloc_slice::<u32>(2).unwrap();
        let psync = SyncArray::alloc(&t).unwrap();
        write_slice(&t, source, &[5, 6]);

        let c = Collectives::init(Arc::new(t.clone())).unwrap();
        fcollect32(&c, target, source, 2, &ActiveSet::full(1), &psync);
        read_slice(&t, target)
    });
    assert_all_pes_equal(&results, &[5, 6]);
    Ok(())
}
