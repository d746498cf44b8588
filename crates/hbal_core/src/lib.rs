//! hbal_core — entities, containers, and the shared failure taxonomy.
//!
//! This crate is **I/O-free** and has no notion of balancing or scoring; it
//! defines the value types every other crate in the workspace (`hbal_io`, //! `hbal_algo`, `hbal_pipeline`, `hbal_report`, `hbal_cli`) builds on.
//!
//! - Keyed containers over entities
//! - Node / Instance / Group / IPolicy / ISpec / RSpec / DynUtil
//! - The closed `FailMode` taxonomy shared by move application and allocation
//!   statistics
//!
//! Entities are value-like: operations return new nodes/instances rather than
//! mutating in place ("Lifecycle"). Serialization derives are gated behind
//! the `serde` feature so downstream crates can opt in without forcing it on
//! embedders that only need the algorithm.

#![forbid(unsafe_code)]

pub mod container;
pub mod errors;
pub mod units;
pub mod group;
pub mod instance;
pub mod node;
pub mod cluster;

pub use container::{Container, Keyed};
pub use errors::{CoreError, FailMode};
pub use units::{DiskTemplate, DynUtil, IPolicy, ISpec, RSpec};
pub use group::{AllocPolicy, Group};
pub use instance::{Instance, MirrorType, Move, RunStatus};
pub use node::Node;
pub use cluster::{ClusterData, Placement};

/// Index type for nodes, instances, and groups. Internal indices, not pointers —
/// this keeps snapshots cheaply copyable and trivially serializable.
pub type Idx = i64;

/// Sentinel meaning "no node" / "no secondary", observable only at the
/// textual-serialization boundary (Question). Internally we always
/// use `Option<Idx>`.
pub const NO_IDX: Idx = -1;
