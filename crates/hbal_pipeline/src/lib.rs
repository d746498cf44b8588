//! hbal_pipeline — orchestration: the greedy balancer , the allocator
//! , the node-group dispatcher , and jobset grouping.
//!
//! Everything here composes `hbal_core` value types with `hbal_algo`'s pure
//! move/score primitives; this crate adds control flow (loops, termination //! conditions, candidate search) but still produces no side effects itself.

#![forbid(unsafe_code)]

pub mod allocate;
pub mod balance;
pub mod errors;
pub mod group_dispatch;
pub mod jobsets;

pub use allocate::{
    bulk_allocate, evacuate_nodes, relocate, tiered_allocate, try_allocate, AllocSpec, AllocSuccess,
    EvacMode, EvacOutcome, RelocateError, TierResult, TieredReport,
};
pub use balance::{balance, BalanceOptions, BalanceResult};
pub use errors::{PipelineError, PipelineResult};
pub use group_dispatch::{allocation_order, select_group, sub_cluster_for_group};
pub use jobsets::group_into_jobsets;
