// crates/kg_gen/src/lib.rs
#![forbid(unsafe_code)]

//! Deterministic Kronecker edge-list generation and reproducible random
//! permutation.
//!
//! The generator samples `num_edges` edges from the distribution induced by
//! the recursive Kronecker product of a small stochastic initiator matrix,
//! and the permutation produces a random arrangement of `[0, n)`. Both carry
//! the same guarantee: output bytes are a function of the parameters only,
//! never of how many workers computed them. Each worker owns a contiguous
//! slice of global edge indices, derives every stream position from block
//! coordinates (see `kg_core::mrg`), and prunes subtrees that cannot touch
//! its slice without any cross-worker communication.

pub mod params;
pub mod partition;
pub mod permute;
pub mod placer;
pub mod splitter;
pub mod transport;

pub use params::{GenParams, GraphKind, ParamError, INITIATOR_CELLS, INITIATOR_SIDE};
pub use partition::EdgeRange;
pub use permute::{rand_sort_distributed, rand_sort_shared, Slot};
pub use placer::{
    compute_edge_array_size, generate_kronecker, BufferScope, EdgeSink, GeneratedEdge, TOMBSTONE,
};
pub use transport::{with_mesh, AllToAll, ChannelMesh};
