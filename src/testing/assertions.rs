//! Assertions over per-PE collective results.

use std::fmt::Debug;

/// Assert that every PE produced exactly `expected`.
///
/// `per_pe` is the rank-ordered output of
/// [`run_spmd`](crate::testing::run_spmd); the panic message names the first
/// diverging rank.
pub fn assert_all_pes_equal<T: Debug + PartialEq>(per_pe: &[Vec<T>], expected: &[T]) {
    for (pe, result) in per_pe.iter().enumerate() {
        assert_eq!(
            result.as_slice(),
            expected,
            "PE {pe} diverged:\n  expected: {expected:?}\n  actual:   {result:?}"
        );
    }
}

/// Assert that every PE produced the same value, and return it.
pub fn assert_pes_converged<T: Debug + PartialEq + Clone>(per_pe: &[T]) -> T {
    let first = per_pe.first().expect("no PE results");
    for (pe, result) in per_pe.iter().enumerate().skip(1) {
        assert_eq!(
            result, first,
            "PE {pe} diverged from PE 0:\n  PE 0: {first:?}\n  PE {pe}: {result:?}"
        );
    }
    first.clone()
}

/// Assert a buffer is entirely zero — the exit invariant of every
/// synchronization and work array.
pub fn assert_zeroed(bytes: &[u8], what: &str) {
    if let Some(i) = bytes.iter().position(|&b| b != 0) {
        panic!("{what} not re-zeroed: byte {i} is {:#04x}", bytes[i]);
    }
}
