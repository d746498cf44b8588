//! Orchestration-level errors : group selection and name resolution.

use thiserror::Error;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PipelineError {
    #[error("node group {0:?} not found")]
    GroupNotFound(String),
    #[error("multiple node groups present; pass --group to select one")]
    AmbiguousGroup,
    #[error("cluster has no node groups")]
    NoGroups,
    #[error("instance {0:?} not found")]
    InstanceNotFound(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
