// crates/kg_gen/src/params.rs
//
// Validated parameters for one generation run. Inputs are checked here,
// once, so the placer can treat every precondition as established.

use thiserror::Error;

use kg_core::mrg::MRG_MODULUS;

/// Side length of the initiator matrix. `nverts = INITIATOR_SIDE ^ log_nverts`.
pub const INITIATOR_SIDE: usize = 2;

/// Number of initiator cells, `INITIATOR_SIDE^2`.
pub const INITIATOR_CELLS: usize = INITIATOR_SIDE * INITIATOR_SIDE;

/// Normalization slack tolerated when checking that the initiator sums to one.
const INITIATOR_SUM_EPS: f64 = 1e-6;

/// Largest `log_nverts` for which block stream offsets stay within `u64`.
const MAX_LOG_NVERTS: u32 = 62;

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("seed word {pos} is {value}, outside [0, 2^31 - 1)")]
    SeedWordOutOfRange { pos: usize, value: u32 },
    #[error("seed must not be all zero")]
    SeedAllZero,
    #[error("initiator cell {pos} is {value}, outside [0, 1]")]
    InitiatorCellOutOfRange { pos: usize, value: f64 },
    #[error("initiator sums to {sum}, expected 1")]
    InitiatorNotNormalized { sum: f64 },
    #[error("log_nverts {0} exceeds the supported maximum of 62")]
    VertexCountOverflow(u32),
    #[error("worker rank {rank} out of range for size {size}")]
    WorkerOutOfRange { rank: u32, size: u32 },
    #[error("worker size must be at least 1")]
    EmptyWorkerSet,
    #[error("output buffer holds {got} slots, {needed} required")]
    BufferTooSmall { needed: usize, got: usize },
}

/// Whether emitted edges are ordered pairs or clipped to the upper triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GraphKind {
    Directed,
    /// Diagonal blocks are folded so every emitted edge has `src <= tgt`.
    Undirected,
}

/// Parameters of a generation run; constructed only through [`GenParams::new`],
/// which establishes every precondition the placer relies on.
#[derive(Clone, Debug, PartialEq)]
pub struct GenParams {
    seed: [u32; 5],
    log_nverts: u32,
    num_edges: u64,
    initiator: [f64; INITIATOR_CELLS],
    kind: GraphKind,
}

impl GenParams {
    pub fn new(
        seed: [u32; 5],
        log_nverts: u32,
        num_edges: u64,
        initiator: [f64; INITIATOR_CELLS],
        kind: GraphKind,
    ) -> Result<Self, ParamError> {
        for (pos, &value) in seed.iter().enumerate() {
            if value >= MRG_MODULUS {
                return Err(ParamError::SeedWordOutOfRange { pos, value });
            }
        }
        if seed.iter().all(|&w| w == 0) {
            return Err(ParamError::SeedAllZero);
        }
        for (pos, &value) in initiator.iter().enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParamError::InitiatorCellOutOfRange { pos, value });
            }
        }
        let sum: f64 = initiator.iter().sum();
        if (sum - 1.0).abs() > INITIATOR_SUM_EPS {
            return Err(ParamError::InitiatorNotNormalized { sum });
        }
        if log_nverts > MAX_LOG_NVERTS {
            return Err(ParamError::VertexCountOverflow(log_nverts));
        }
        Ok(GenParams {
            seed,
            log_nverts,
            num_edges,
            initiator,
            kind,
        })
    }

    pub fn seed(&self) -> [u32; 5] {
        self.seed
    }

    pub fn log_nverts(&self) -> u32 {
        self.log_nverts
    }

    pub fn num_edges(&self) -> u64 {
        self.num_edges
    }

    pub fn initiator(&self) -> &[f64; INITIATOR_CELLS] {
        &self.initiator
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    /// Total vertex count `INITIATOR_SIDE ^ log_nverts`.
    pub fn nverts(&self) -> u64 {
        (INITIATOR_SIDE as u64).pow(self.log_nverts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform() -> [f64; INITIATOR_CELLS] {
        [1.0 / INITIATOR_CELLS as f64; INITIATOR_CELLS]
    }

    #[test]
    fn accepts_reference_parameters() {
        let p = GenParams::new(
            [1, 2, 3, 4, 5],
            4,
            32,
            [0.57, 0.19, 0.19, 0.05],
            GraphKind::Directed,
        )
        .unwrap();
        assert_eq!(p.nverts(), 16);
    }

    #[test]
    fn rejects_all_zero_seed() {
        let err = GenParams::new([0; 5], 4, 32, uniform(), GraphKind::Directed).unwrap_err();
        assert_eq!(err, ParamError::SeedAllZero);
    }

    #[test]
    fn rejects_oversized_seed_word() {
        let err =
            GenParams::new([1, 2, 3, 4, u32::MAX], 4, 32, uniform(), GraphKind::Directed)
                .unwrap_err();
        assert!(matches!(err, ParamError::SeedWordOutOfRange { pos: 4, .. }));
    }

    #[test]
    fn rejects_unnormalized_initiator() {
        let err = GenParams::new(
            [1, 2, 3, 4, 5],
            4,
            32,
            [0.5, 0.5, 0.5, 0.5],
            GraphKind::Directed,
        )
        .unwrap_err();
        assert!(matches!(err, ParamError::InitiatorNotNormalized { .. }));
    }

    #[test]
    fn rejects_negative_initiator_cell() {
        let err = GenParams::new(
            [1, 2, 3, 4, 5],
            4,
            32,
            [1.2, -0.2, 0.0, 0.0],
            GraphKind::Directed,
        )
        .unwrap_err();
        assert!(matches!(err, ParamError::InitiatorCellOutOfRange { .. }));
    }

    #[test]
    fn rejects_excessive_log_nverts() {
        let err = GenParams::new([1, 2, 3, 4, 5], 63, 32, uniform(), GraphKind::Directed)
            .unwrap_err();
        assert_eq!(err, ParamError::VertexCountOverflow(63));
    }

    #[test]
    fn degenerate_single_vertex_graph_is_allowed() {
        let p = GenParams::new([1, 2, 3, 4, 5], 0, 7, uniform(), GraphKind::Directed).unwrap();
        assert_eq!(p.nverts(), 1);
    }
}
