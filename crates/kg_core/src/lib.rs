// crates/kg_core/src/lib.rs
#![forbid(unsafe_code)]

//! Deterministic randomness for the Kronecker edge generator.
//!
//! Everything in this crate is a pure function of its inputs: the PRNG state
//! is a plain `Copy` value, stream repositioning is `O(log offset)`, and no
//! OS randomness is ever consulted. Callers fork a stream by copying the
//! state, which is what makes the generator's output independent of how work
//! is divided among workers.

pub mod binomial;
pub mod mrg;
pub mod sampling;

pub use binomial::sample_binomial;
pub use mrg::MrgState;
pub use sampling::{pick_weighted, shuffle, uniform_below};
