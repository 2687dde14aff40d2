//! Solver backends
//!
//! Concrete engines behind the [`SolverBackend`](super::SolverBackend) boundary:
//! - MILP: `good_lp` front-end driving the pure-Rust `microlp` engine

pub mod milp;

pub use milp::*;
