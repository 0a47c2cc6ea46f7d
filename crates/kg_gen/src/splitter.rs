//! Distribution of a block's edges across its quadrants.

use kg_core::mrg::MrgState;
use kg_core::{pick_weighted, sample_binomial};

use crate::params::{INITIATOR_CELLS, INITIATOR_SIDE};

/// Edge counts at or below this are tallied by direct categorical draws;
/// larger counts use conditional binomials. The value is part of the
/// reproducibility contract: changing it changes the draw sequence.
pub(crate) const DIRECT_TALLY_CUTOFF: u64 = 20;

/// Partition `num_edges` across the quadrants, multinomially distributed
/// according to the initiator.
///
/// Small blocks draw one category per edge; large blocks reduce the
/// multinomial to a chain of conditional binomials so draw count stays
/// bounded regardless of `num_edges`. Both regimes sample the same
/// distribution.
pub fn quadrant_counts(
    num_edges: u64,
    initiator: &[f64; INITIATOR_CELLS],
    st: &mut MrgState,
) -> [u64; INITIATOR_CELLS] {
    let mut counts = [0u64; INITIATOR_CELLS];
    if num_edges <= DIRECT_TALLY_CUTOFF {
        for _ in 0..num_edges {
            counts[pick_weighted(st, initiator)] += 1;
        }
    } else {
        let mut edges_left = num_edges;
        let mut divisor = 1.0;
        for j in 0..INITIATOR_CELLS - 1 {
            counts[j] = sample_binomial(edges_left, initiator[j] / divisor, st);
            edges_left -= counts[j];
            divisor -= initiator[j];
        }
        counts[INITIATOR_CELLS - 1] = edges_left;
    }
    counts
}

/// Clip-and-flip for an undirected diagonal block: fold each strictly
/// below-diagonal quadrant onto its transpose so no edge descends below the
/// diagonal.
pub fn fold_below_diagonal(counts: &mut [u64; INITIATOR_CELLS]) {
    for i in 0..INITIATOR_SIDE {
        for j in i + 1..INITIATOR_SIDE {
            counts[i * INITIATOR_SIDE + j] += counts[j * INITIATOR_SIDE + i];
            counts[j * INITIATOR_SIDE + i] = 0;
        }
    }
}
