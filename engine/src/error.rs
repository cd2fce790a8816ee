use serde::Serialize;
use thiserror::Error;

/// Why a drop request was refused. The session is left untouched in every case.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MoveRejection {
    #[error("column {column} is out of bounds")]
    InvalidColumn { column: usize },
    #[error("column {column} is full")]
    ColumnFull { column: usize },
    #[error("session is not awaiting a move")]
    MoveWhileBusy,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("no legal moves remain")]
    NoMoves,
    #[error("depth {0} is out of range (1-{max})", max = crate::search::MAX_DEPTH)]
    DepthOutOfRange(u8),
}
