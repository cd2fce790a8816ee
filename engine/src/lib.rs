//! Connect Four engine: board, win detection, heuristic evaluation, an
//! alpha-beta minimax opponent and a turn controller for one game.
//! Boards default to 6x7; the AI searches a configurable number of plies
//! (default 5) for whichever side it is asked to move.
pub mod board;
pub mod error;
pub mod eval;
pub mod search;
pub mod session;
pub mod win;

pub use board::{Board, BoardSnapshot, Player, Slot, COLS, ROWS};
pub use error::{MoveRejection, SearchError};
pub use eval::evaluate;
pub use search::{best_move, best_move_weighted, score_columns, SearchConfig, SearchResult};
pub use session::{
    AiStrategy, Deferred, GameMode, GameState, MoveResult, Phase, PlayerLabels, Scheduled,
    Session, SessionConfig, SessionEvent, Ticket,
};
pub use win::{has_four_in_a_row, outcome_after, GameOutcome};
