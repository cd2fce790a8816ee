//! Four-in-a-row detection anchored on the piece just placed.
use serde::{Deserialize, Serialize};

use crate::board::{Board, Player};

const LINE: usize = 4;

/// Horizontal, vertical and the two diagonals as (row, col) steps.
pub(crate) const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "player", rename_all = "snake_case")]
pub enum GameOutcome {
    InProgress,
    Win(Player),
    Draw,
}

impl GameOutcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameOutcome::InProgress)
    }
}

/// True if the piece at `(row, col)` completes a line of four. Only lines
/// through that piece are inspected, since no other line can have changed.
pub fn has_four_in_a_row(board: &Board, row: usize, col: usize) -> bool {
    let slot = board.get(row, col);
    if slot.owner().is_none() {
        return false;
    }
    let (row, col) = (row as isize, col as isize);
    DIRECTIONS.iter().any(|&(dr, dc)| {
        let forward = run(board, row, col, dr, dc, LINE - 1);
        let backward = run(board, row, col, -dr, -dc, LINE - 1 - forward);
        1 + forward + backward >= LINE
    })
}

/// Counts same-owner pieces stepping away from `(row, col)`, stopping at `cap`.
fn run(board: &Board, row: isize, col: isize, dr: isize, dc: isize, cap: usize) -> usize {
    let owner = board.get(row as usize, col as usize);
    let mut count = 0;
    while count < cap {
        let step = count as isize + 1;
        match board.get_signed(row + dr * step, col + dc * step) {
            Some(slot) if slot == owner => count += 1,
            _ => break,
        }
    }
    count
}

/// Outcome of the position right after a piece landed at `(row, col)`.
pub fn outcome_after(board: &Board, row: usize, col: usize) -> GameOutcome {
    if has_four_in_a_row(board, row, col) {
        match board.get(row, col).owner() {
            Some(player) => GameOutcome::Win(player),
            None => GameOutcome::InProgress,
        }
    } else if board.is_full() {
        GameOutcome::Draw
    } else {
        GameOutcome::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Player, COLS};

    fn last_drop(columns: &[usize]) -> (Board, usize, usize) {
        let (&col, rest) = columns.split_last().unwrap();
        let mut board = Board::replay(rest).unwrap();
        let player = if rest.len() % 2 == 0 { Player::A } else { Player::B };
        let row = board.place(col, player).unwrap();
        (board, row, col)
    }

    #[test]
    fn vertical_four() {
        let (board, row, col) = last_drop(&[3, 0, 3, 1, 3, 0, 3]);
        assert!(has_four_in_a_row(&board, row, col));
        assert_eq!(outcome_after(&board, row, col), GameOutcome::Win(Player::A));
    }

    #[test]
    fn horizontal_four_completed_in_the_middle() {
        // A holds 0, 1 and 3 on the floor; the piece in 2 joins them.
        let (board, row, col) = last_drop(&[0, 0, 1, 1, 3, 3, 2]);
        assert_eq!(row, 5);
        assert!(has_four_in_a_row(&board, row, col));
    }

    #[test]
    fn diagonal_rising_to_the_right() {
        let (board, row, col) = last_drop(&[0, 1, 1, 2, 2, 3, 2, 3, 3, 6, 3]);
        assert_eq!((row, col), (2, 3));
        assert!(has_four_in_a_row(&board, row, col));
    }

    #[test]
    fn diagonal_falling_to_the_right() {
        let (board, row, col) = last_drop(&[6, 5, 5, 4, 4, 3, 4, 3, 3, 0, 3]);
        assert!(has_four_in_a_row(&board, row, col));
    }

    #[test]
    fn three_is_not_enough() {
        let (board, row, col) = last_drop(&[3, 0, 3, 1, 3]);
        assert!(!has_four_in_a_row(&board, row, col));
        assert_eq!(outcome_after(&board, row, col), GameOutcome::InProgress);
    }

    #[test]
    fn empty_slot_never_wins() {
        let board = Board::new();
        assert!(!has_four_in_a_row(&board, 5, 0));
    }

    #[test]
    fn symmetric_under_mirror_and_player_swap() {
        let (board, row, col) = last_drop(&[0, 1, 1, 2, 2, 3, 2, 3, 3, 6, 3]);
        let mirrored = board.mirrored();
        assert!(has_four_in_a_row(&mirrored, row, COLS - 1 - col));
        let swapped = board.swapped();
        assert!(has_four_in_a_row(&swapped, row, col));
        assert_eq!(outcome_after(&swapped, row, col), GameOutcome::Win(Player::B));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(GameOutcome::Win(Player::B)).unwrap();
        assert_eq!(json["status"], "win");
        assert_eq!(json["player"], "B");
    }
}
