//! hbal_io — textual and remote-API cluster loaders, the loader/merge
//! algorithm , and unit parsing.
//!
//! This crate turns external representations into the pure value types
//! defined by `hbal_core`. It has no notion of scoring or balancing; those
//! live in `hbal_algo`/`hbal_pipeline`.

#![forbid(unsafe_code)]

pub mod dns;
pub mod errors;
#[cfg(feature = "serde")]
pub mod json;
pub mod merge;
pub mod roundtrip;
pub mod text;
pub mod units;

pub use errors::{IoError, IoResult};
pub use merge::{load_cluster, MergeInput};
pub use roundtrip::to_raw_cluster;
pub use text::{parse_text, serialize_text, RawCluster};
pub use units::{format_unit, parse_unit};
