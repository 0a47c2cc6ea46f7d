//! Unbiased integer sampling, shuffling, and categorical selection on top of
//! an [`MrgState`] stream.
//!
//! The draw order and window constants here are part of the reproducibility
//! contract: changing either changes every downstream output.

use crate::mrg::MrgState;

/// Exclusive upper bound of a single integer draw (`2^31 - 1`).
const ONE_DRAW_BOUND: u64 = 0x7FFF_FFFF;

/// Exclusive upper bound of the two-draw composition, `(2^31 - 1)^2`.
const TWO_DRAW_BOUND: u64 = 0x3FFF_FFFF_0000_0001;

/// Uniform integer in `[0, n)` by rejection sampling.
///
/// Uses one 31-bit draw when `n` fits, otherwise a fixed-order two-draw
/// 62-bit composition; the acceptance window is truncated to a multiple of
/// `n` so the result is exactly uniform. `n == 1` consumes no draw.
pub fn uniform_below(st: &mut MrgState, n: u64) -> u64 {
    assert!(n > 0 && n <= TWO_DRAW_BOUND, "range {n} not representable");
    if n == 1 {
        0
    } else if n <= ONE_DRAW_BOUND {
        let window = (ONE_DRAW_BOUND / n) * n;
        loop {
            let v = st.next_uint() as u64;
            if v < window {
                return v % n;
            }
        }
    } else {
        let window = (TWO_DRAW_BOUND / n) * n;
        loop {
            // Two separate statements to pin the draw order.
            let mut v = st.next_uint() as u64 * ONE_DRAW_BOUND;
            v += st.next_uint() as u64;
            if v < window {
                return v % n;
            }
        }
    }
}

/// In-place Fisher–Yates shuffle, walking the index down from the back.
pub fn shuffle<T>(st: &mut MrgState, items: &mut [T]) {
    if items.len() <= 1 {
        return;
    }
    for i in (1..items.len()).rev() {
        let j = uniform_below(st, i as u64 + 1) as usize;
        if i != j {
            items.swap(i, j);
        }
    }
}

/// Select an index from a weight vector summing to (approximately) one.
///
/// Sweeps the weights against a single uniform double; the final index is
/// always reachable so floating-point slack in the sum cannot push the draw
/// off the end.
pub fn pick_weighted(st: &mut MrgState, weights: &[f64]) -> usize {
    debug_assert!(!weights.is_empty());
    let mut u = st.next_double();
    let last = weights.len() - 1;
    for (j, &w) in weights.iter().enumerate() {
        if u < w || j == last {
            return j;
        }
        u -= w;
    }
    unreachable!("weight sweep always terminates at the last index");
}
