//! hbal_algo — the cluster score function  and move semantics.
//!
//! This crate depends only on `hbal_core`: it is pure, total (aside from the //! well-defined `FailMode` failures), and holds no I/O or orchestration.

#![forbid(unsafe_code)]

pub mod moves;
pub mod score;

pub use moves::{apply_move, candidate_moves, MoveOptions, MoveOutcome};
pub use score::compute_score;
