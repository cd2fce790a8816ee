//! Static evaluation of a position from one player's point of view.
use crate::board::{Board, Player, Slot};
use crate::win::DIRECTIONS;

pub const FOUR: i32 = 100_000;
pub const OPEN_THREE: i32 = 1_000;
pub const OPEN_TWO: i32 = 100;
pub const OPPONENT_THREE: i32 = -900;
pub const CENTER_WEIGHT: i32 = -2;

const WINDOW: isize = 4;

/// Sums window scores over every 4-cell line on the grid plus a per-piece
/// center term. Not symmetric: only `player`'s prospects and the opponent's
/// open threes are counted.
pub fn evaluate(board: &Board, player: Player) -> i32 {
    let mine = player.slot();
    let theirs = player.opponent().slot();
    let mut score = 0;

    for row in 0..board.rows() as isize {
        for col in 0..board.cols() as isize {
            for &(dr, dc) in DIRECTIONS.iter() {
                let mut own = 0;
                let mut opp = 0;
                let mut empty = 0;
                for i in 0..WINDOW {
                    match board.get_signed(row + dr * i, col + dc * i) {
                        Some(slot) if slot == mine => own += 1,
                        Some(slot) if slot == theirs => opp += 1,
                        Some(_) => empty += 1,
                        None => break,
                    }
                }
                if own + opp + empty < WINDOW {
                    continue; // runs off the grid
                }
                score += score_window(own, opp, empty);
            }
        }
    }

    score + center_bias(board, mine)
}

fn score_window(own: isize, opp: isize, empty: isize) -> i32 {
    match (own, opp, empty) {
        (4, _, _) => FOUR,
        (3, _, 1) => OPEN_THREE,
        (2, _, 2) => OPEN_TWO,
        (_, 3, 1) => OPPONENT_THREE,
        _ => 0,
    }
}

/// `CENTER_WEIGHT * |cols/2 - c|` for each of `mine`'s pieces.
fn center_bias(board: &Board, mine: Slot) -> i32 {
    let center = board.cols() / 2;
    let mut bias = 0;
    for row in 0..board.rows() {
        for col in 0..board.cols() {
            if board.get(row, col) == mine {
                bias += CENTER_WEIGHT * center.abs_diff(col) as i32;
            }
        }
    }
    bias
}
