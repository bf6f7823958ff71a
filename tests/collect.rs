use std::sync::Arc;

use symmem::api::collect32;
use symmem::testing::{assert_all_pes_equal, assert_zeroed, run_spmd};
use symmem::transport::{SymmetricAlloc, read_slice, write_slice};
use symmem::{ActiveSet, Collectives, SyncArray, Transport};

/// Gather byte contributions of varying lengths across the full job and
/// return every PE's assembled target prefix.
fn collect_job(contributions: &[&[u8]], capacity: usize) -> Vec<Vec<u8>> {
    let total: usize = contributions.iter().map(|c| c.len()).sum();
    run_spmd(contributions.len(), |t| {
        let target = t.alloc_slice::<u8>(capacity).unwrap();
        let source = t.alloc_slice::<u8>(capacity).unwrap();
        let psync = SyncArray::alloc(&t).unwrap();
        let mine = contributions[t.my_pe()];
        write_slice(&t, source, mine);

        let c = Collectives::init(Arc::new(t.clone())).unwrap();
        c.collect(
            target.addr(),
            source.addr(),
            mine.len(),
            &ActiveSet::full(contributions.len()),
            &psync,
        );

        let mut scratch = vec![0u8; psync.as_slice().byte_len()];
        t.read(psync.as_slice().addr(), &mut scratch);
        assert_zeroed(&scratch, "pSync after collect");

        let mut assembled = vec![0u8; total];
        t.read(target.addr(), &mut assembled);
        assembled
    })
}

#[test]
fn three_pes_concatenate_in_rank_order() -> anyhow::Result<()> {
    let results = collect_job(&[b"AB", b"CDE", b"F"], 8);
    assert_all_pes_equal(&results, b"ABCDEF");
    Ok(())
}

#[test]
fn two_pes() -> anyhow::Result<()> {
    let results = collect_job(&[b"xyz", b"w"], 8);
    assert_all_pes_equal(&results, b"xyzw");
    Ok(())
}

#[test]
fn four_pes_with_an_empty_contribution() -> anyhow::Result<()> {
    let results = collect_job(&[b"a", b"", b"bc", b"d"], 8);
    assert_all_pes_equal(&results, b"abcd");
    Ok(())
}

#[test]
fn singleton_group_copies_locally() -> anyhow::Result<()> {
    let results = collect_job(&[b"hello"], 8);
    assert_all_pes_equal(&results, b"hello");
    Ok(())
}

#[test]
fn singleton_group_aliased_is_a_no_op() -> anyhow::Result<()> {
    let results = run_spmd(1, |t| {
        let buf = t.alloc_slice::<u8>(4).unwrap();
        let psync = SyncArray::alloc(&t).unwrap();
        write_slice(&t, buf, b"spmd");

        let c = Collectives::init(Arc::new(t.clone())).unwrap();
        c.collect(buf.addr(), buf.addr(), 4, &ActiveSet::full(1), &psync);
        read_slice(&t, buf)
    });
    assert_all_pes_equal(&results, b"spmd");
    Ok(())
}

#[test]
fn collect32_concatenates_element_counts() -> anyhow::Result<()> {
    // PE k contributes k+1 elements stamped with its rank.
    let results = run_spmd(3, |t| {
        let target = t.alloc_slice::<u32>(6).unwrap();
        let source = t.alloc_slice::<u32>(3).unwrap();
        let psync = SyncArray::alloc(&t).unwrap();
        let me = t.my_pe();
        write_slice(&t, source, &vec![me as u32 * 100; me + 1]);

        let c = Collectives::init(Arc::new(t.clone())).unwrap();
        collect32(&c, target, source, me + 1, &ActiveSet::full(3), &psync);
        read_slice(&t, target)
    });
    assert_all_pes_equal(&results, &[0, 100, 100, 200, 200, 200]);
    Ok(())
}
