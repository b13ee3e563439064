use thiserror::Error;

use crate::arrangement::ObjectId;

/// Errors surfaced by arrangement and configuration operations.
///
/// Pointer and frame paths never return these to the user; the stage logs
/// them and keeps the last good state.
#[derive(Debug, Error)]
pub enum CubesError {
    #[error("unknown chord symbol `{0}`")]
    UnknownSymbol(String),

    #[error("no chord object with id {0}")]
    UnknownObject(ObjectId),

    #[error("object {0} is not in the lineup")]
    NotInLineup(ObjectId),

    #[error("shelf map is not valid JSON: {0}")]
    ShelfMap(#[from] serde_json::Error),

    #[error("invalid shelf entry for `{symbol}`: {reason}")]
    InvalidShelfEntry { symbol: String, reason: String },

    #[error("arrangement invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, CubesError>;
