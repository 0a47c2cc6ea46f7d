//! Recursive placement of edges in the Kronecker quadtree.
//!
//! Every recursive call re-derives its stream position from the root state
//! and the block coordinates alone, so a worker may skip any subtree and
//! still produce draws identical to a worker that descended into it. That,
//! plus the fixed row-major quadrant walk, is the whole worker-count
//! invariance argument.

use kg_core::mrg::MrgState;
use kg_core::pick_weighted;

use crate::params::{GenParams, GraphKind, ParamError, INITIATOR_CELLS, INITIATOR_SIDE};
use crate::partition::EdgeRange;
use crate::splitter::{fold_below_diagonal, quadrant_counts};

/// Sentinel pair value marking a removed duplicate in the flat output
/// layout. This is the maximum representable count, not a negative number;
/// consumers must compare against it, not against zero or a sign.
pub const TOMBSTONE: u64 = u64::MAX;

/// One output record in the multiplicity-keeping layout. A zeroed record
/// (multiplicity 0) marks a slot that has not been written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneratedEdge {
    pub src: u64,
    pub tgt: u64,
    pub multiplicity: u64,
}

/// Caller-supplied output buffer, in one of the two supported layouts.
///
/// `Multiplicity` holds one record per assigned edge index and must be
/// zero-initialized; collapsed duplicates surface as `multiplicity > 1`.
/// `PairsWithTombstones` holds two words per assigned edge index; collapsed
/// duplicates surface as [`TOMBSTONE`] pairs following the real one.
#[derive(Debug)]
pub enum EdgeSink<'a> {
    Multiplicity(&'a mut [GeneratedEdge]),
    PairsWithTombstones(&'a mut [u64]),
}

/// How slots in the output buffer map onto global edge indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferScope {
    /// The buffer spans all `num_edges` indices (single address space).
    Global,
    /// The buffer spans only this worker's `[first, last)` slice.
    WorkerLocal,
}

fn checked_worker_range(rank: u32, size: u32, num_edges: u64) -> Result<EdgeRange, ParamError> {
    if size == 0 {
        Err(ParamError::EmptyWorkerSet)
    } else if rank >= size {
        Err(ParamError::WorkerOutOfRange { rank, size })
    } else {
        Ok(EdgeRange::for_worker(rank, size, num_edges))
    }
}

/// Number of edge slots worker `rank` of `size` must allocate (two words per
/// slot in the flat layout). Errors on out-of-range worker coordinates, like
/// every other public entry point.
pub fn compute_edge_array_size(rank: u32, size: u32, num_edges: u64) -> Result<u64, ParamError> {
    checked_worker_range(rank, size, num_edges).map(|r| r.len())
}

struct Placer<'a, 'b> {
    initiator: &'a [f64; INITIATOR_CELLS],
    range: EdgeRange,
    total_nverts: u64,
    /// Subtracted from a global edge index to obtain a buffer slot.
    write_base: u64,
    /// Exclusive bound on global edge indices the buffer can hold; tombstone
    /// tails of a leaf straddling this bound are clipped.
    write_limit: u64,
    undirected: bool,
    sink: &'a mut EdgeSink<'b>,
}

impl Placer<'_, '_> {
    fn place(
        &mut self,
        root: &MrgState,
        first_edge_index: u64,
        num_edges: u64,
        nverts: u64,
        base_src: u64,
        base_tgt: u64,
    ) {
        let mut st = *root;
        st.skip(
            0,
            (base_src + self.total_nverts) / nverts,
            (base_tgt + self.total_nverts) / nverts,
        );
        if self.undirected {
            debug_assert!(base_src <= base_tgt);
        }

        if nverts == 1 {
            debug_assert!(num_edges != 0);
            if self.range.contains(first_edge_index) {
                self.write_leaf(first_edge_index, base_src, base_tgt, num_edges);
            }
        } else if num_edges == 1 {
            if self.range.contains(first_edge_index) {
                self.place_single_edge(&mut st, first_edge_index, base_src, base_tgt, nverts);
            }
        } else {
            let mut counts = quadrant_counts(num_edges, self.initiator, &mut st);
            if self.undirected && base_src == base_tgt {
                fold_below_diagonal(&mut counts);
            }
            let sub_nverts = nverts / INITIATOR_SIDE as u64;
            let mut cursor = first_edge_index;
            for (j, &count) in counts.iter().enumerate() {
                if count != 0 {
                    if self.range.requires_descent(cursor, count) {
                        self.place(
                            root,
                            cursor,
                            count,
                            sub_nverts,
                            base_src + sub_nverts * (j / INITIATOR_SIDE) as u64,
                            base_tgt + sub_nverts * (j % INITIATOR_SIDE) as u64,
                        );
                    }
                    cursor += count;
                }
            }
        }
    }

    /// Cheap path for a subtree holding exactly one edge: one categorical
    /// draw per remaining level, no further recursion or skips.
    fn place_single_edge(
        &mut self,
        st: &mut MrgState,
        first_edge_index: u64,
        mut base_src: u64,
        mut base_tgt: u64,
        mut nverts: u64,
    ) {
        while nverts > 1 {
            let quadrant = pick_weighted(st, self.initiator);
            let mut src_off = quadrant / INITIATOR_SIDE;
            let mut tgt_off = quadrant % INITIATOR_SIDE;
            if self.undirected && base_src == base_tgt && src_off > tgt_off {
                std::mem::swap(&mut src_off, &mut tgt_off);
            }
            nverts /= INITIATOR_SIDE as u64;
            base_src += nverts * src_off as u64;
            base_tgt += nverts * tgt_off as u64;
        }
        self.write_leaf(first_edge_index, base_src, base_tgt, 1);
    }

    fn write_leaf(&mut self, first_edge_index: u64, src: u64, tgt: u64, multiplicity: u64) {
        let slot = (first_edge_index - self.write_base) as usize;
        match self.sink {
            EdgeSink::Multiplicity(out) => {
                let record = &mut out[slot];
                assert_eq!(
                    record.multiplicity, 0,
                    "edge slot {slot} written twice (buffer not zero-initialized?)"
                );
                // A leaf straddling write_limit keeps its full count: the edge
                // indices past the bound stay zeroed slots in every partition,
                // so rank-order concatenation is unaffected.
                *record = GeneratedEdge {
                    src,
                    tgt,
                    multiplicity,
                };
            }
            EdgeSink::PairsWithTombstones(out) => {
                out[2 * slot] = src;
                out[2 * slot + 1] = tgt;
                let writable = multiplicity.min(self.write_limit - first_edge_index);
                for k in 1..writable as usize {
                    out[2 * (slot + k)] = TOMBSTONE;
                    out[2 * (slot + k) + 1] = TOMBSTONE;
                }
            }
        }
    }
}

/// Generate this worker's share of the edge list.
///
/// The output is a function of the parameters alone, never of `(rank, size)`:
/// concatenating every worker's buffer in rank order yields the same array as
/// a single-worker run.
pub fn generate_kronecker(
    rank: u32,
    size: u32,
    params: &GenParams,
    scope: BufferScope,
    sink: &mut EdgeSink<'_>,
) -> Result<(), ParamError> {
    let num_edges = params.num_edges();
    let range = checked_worker_range(rank, size, num_edges)?;

    let needed = match scope {
        BufferScope::Global => num_edges,
        BufferScope::WorkerLocal => range.len(),
    } as usize;
    let got = match sink {
        EdgeSink::Multiplicity(out) => out.len(),
        EdgeSink::PairsWithTombstones(out) => out.len() / 2,
    };
    if got < needed {
        return Err(ParamError::BufferTooSmall { needed, got });
    }
    if num_edges == 0 {
        return Ok(());
    }

    let (write_base, write_limit) = match scope {
        BufferScope::Global => (0, num_edges),
        BufferScope::WorkerLocal => (range.first, range.last),
    };
    let root = MrgState::new(params.seed());
    let mut placer = Placer {
        initiator: params.initiator(),
        range,
        total_nverts: params.nverts(),
        write_base,
        write_limit,
        undirected: params.kind() == GraphKind::Undirected,
        sink,
    };
    placer.place(&root, 0, num_edges, params.nverts(), 0, 0);
    Ok(())
}
