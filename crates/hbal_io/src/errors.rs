//! Shared error type for every loader in this crate.
//!
//! Every variant carries an "owner" prefix identifying which stage raised it
//! (`"--text-data"`, `"loader"`, `"unit"`,...), matching the diagnostic style
//! described in §7: `"--disk option: unknown unit 'q'"`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("{owner}: malformed input: {detail}")]
    Parse { owner: &'static str, detail: String },

    #[error("{owner}: {detail}")]
    Loader { owner: &'static str, detail: String },

    #[error("unit: unknown unit {0:?}")]
    UnknownUnit(String),

    #[error("unit: negative or unparseable quantity {0:?}")]
    BadQuantity(String),

    #[cfg(feature = "serde")]
    #[error("rapi: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type IoResult<T> = Result<T, IoError>;
