//! Depth-limited minimax with alpha-beta pruning.
//!
//! Only the searching player's score is ever computed: leaves are evaluated
//! from `player`'s point of view and the opponent's levels minimise that same
//! number. Before searching, an immediate win is taken and an immediate
//! opponent win is blocked.
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{Board, Player};
use crate::error::SearchError;
use crate::eval::evaluate;
use crate::win::has_four_in_a_row;

pub const DEFAULT_DEPTH: u8 = 5;
pub const MAX_DEPTH: u8 = 12;
pub const WIN_SCORE: i32 = 100_000;

const NEG_INF: i32 = i32::MIN / 2;
const POS_INF: i32 = i32::MAX / 2;

const TOP_CANDIDATES: usize = 3;
const TOP_PICK_PROBABILITY: f64 = 0.7;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Plies searched, counting the move being chosen.
    pub depth: u8,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
        }
    }
}

impl SearchConfig {
    pub fn with_depth(depth: u8) -> Self {
        Self { depth }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if !(1..=MAX_DEPTH).contains(&self.depth) {
            return Err(SearchError::DepthOutOfRange(self.depth));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub column: usize,
    pub score: i32,
}

/// Deterministic choice: the highest scoring column, lowest index on ties.
pub fn best_move(
    board: &Board,
    player: Player,
    config: &SearchConfig,
) -> Result<SearchResult, SearchError> {
    config.validate()?;
    let mut work = board.clone();
    let result = search_root(&mut work, player, config.depth)?;
    debug!(
        ?player,
        column = result.column,
        score = result.score,
        depth = config.depth,
        "search finished"
    );
    Ok(result)
}

/// Every legal column with its exact minimax score, in column order.
pub fn score_columns(
    board: &Board,
    player: Player,
    config: &SearchConfig,
) -> Result<Vec<SearchResult>, SearchError> {
    config.validate()?;
    let mut work = board.clone();
    let legal = work.legal_columns();
    if legal.is_empty() {
        return Err(SearchError::NoMoves);
    }
    Ok(score_all(&mut work, player, &legal, config.depth))
}

/// Exhibition play: ranks the columns, keeps the best three and picks the top
/// one 70% of the time, otherwise one of the runners-up uniformly. Forced wins
/// and blocks are still played without randomness.
pub fn best_move_weighted<R: Rng + ?Sized>(
    board: &Board,
    player: Player,
    config: &SearchConfig,
    rng: &mut R,
) -> Result<SearchResult, SearchError> {
    config.validate()?;
    let mut work = board.clone();
    let legal = work.legal_columns();
    if legal.is_empty() {
        return Err(SearchError::NoMoves);
    }
    if let Some(forced) = forced_move(&mut work, player, &legal) {
        return Ok(forced);
    }

    let mut ranked = score_all(&mut work, player, &legal, config.depth);
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(TOP_CANDIDATES);
    let pick = pick_weighted(&ranked, rng);
    debug!(
        ?player,
        column = pick.column,
        score = pick.score,
        candidates = ranked.len(),
        "weighted pick"
    );
    Ok(pick)
}

fn pick_weighted<R: Rng + ?Sized>(ranked: &[SearchResult], rng: &mut R) -> SearchResult {
    if ranked.len() == 1 || rng.gen_bool(TOP_PICK_PROBABILITY) {
        ranked[0]
    } else {
        ranked[rng.gen_range(1..ranked.len())]
    }
}

fn search_root(work: &mut Board, player: Player, depth: u8) -> Result<SearchResult, SearchError> {
    let legal = work.legal_columns();
    if legal.is_empty() {
        return Err(SearchError::NoMoves);
    }
    if let Some(forced) = forced_move(work, player, &legal) {
        return Ok(forced);
    }

    let mut alpha = NEG_INF;
    let mut best: Option<SearchResult> = None;
    for &column in &legal {
        let score = score_column(work, player, column, depth, alpha, POS_INF);
        if best.map_or(true, |b| score > b.score) {
            best = Some(SearchResult { column, score });
        }
        alpha = alpha.max(score);
    }
    best.ok_or(SearchError::NoMoves)
}

fn score_all(work: &mut Board, player: Player, legal: &[usize], depth: u8) -> Vec<SearchResult> {
    legal
        .iter()
        .map(|&column| SearchResult {
            column,
            score: score_column(work, player, column, depth, NEG_INF, POS_INF),
        })
        .collect()
}

/// Immediate win for `player`, else the column that stops the opponent's
/// immediate win.
fn forced_move(work: &mut Board, player: Player, legal: &[usize]) -> Option<SearchResult> {
    if let Some(column) = first_winning_column(work, player, legal) {
        return Some(SearchResult {
            column,
            score: WIN_SCORE,
        });
    }
    let column = first_winning_column(work, player.opponent(), legal)?;
    let row = work.place(column, player).expect("legal column must accept a piece");
    let score = evaluate(work, player);
    work.undo(row, column);
    Some(SearchResult { column, score })
}

fn first_winning_column(work: &mut Board, player: Player, legal: &[usize]) -> Option<usize> {
    legal.iter().copied().find(|&column| {
        let row = work.place(column, player).expect("legal column must accept a piece");
        let won = has_four_in_a_row(work, row, column);
        work.undo(row, column);
        won
    })
}

fn score_column(
    work: &mut Board,
    player: Player,
    column: usize,
    depth: u8,
    alpha: i32,
    beta: i32,
) -> i32 {
    let row = work.place(column, player).expect("legal column must accept a piece");
    let score = if has_four_in_a_row(work, row, column) {
        WIN_SCORE
    } else {
        minimax(work, player, depth.saturating_sub(1), alpha, beta, false)
    };
    work.undo(row, column);
    score
}

fn minimax(
    work: &mut Board,
    player: Player,
    depth: u8,
    mut alpha: i32,
    mut beta: i32,
    maximizing: bool,
) -> i32 {
    if depth == 0 {
        return evaluate(work, player);
    }
    let legal = work.legal_columns();
    if legal.is_empty() {
        return evaluate(work, player);
    }

    let mover = if maximizing { player } else { player.opponent() };
    let mut best = if maximizing { NEG_INF } else { POS_INF };
    for column in legal {
        let row = work.place(column, mover).expect("legal column must accept a piece");
        if has_four_in_a_row(work, row, column) {
            work.undo(row, column);
            return if maximizing { WIN_SCORE } else { -WIN_SCORE };
        }
        let score = minimax(work, player, depth - 1, alpha, beta, !maximizing);
        work.undo(row, column);

        if maximizing {
            best = best.max(score);
            alpha = alpha.max(score);
        } else {
            best = best.min(score);
            beta = beta.min(score);
        }
        if beta <= alpha {
            break;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Same tree walk without any pruning.
    fn plain_minimax(work: &mut Board, player: Player, depth: u8, maximizing: bool) -> i32 {
        if depth == 0 || work.is_full() {
            return evaluate(work, player);
        }
        let mover = if maximizing { player } else { player.opponent() };
        let mut scores = Vec::new();
        for column in work.legal_columns() {
            let row = work.place(column, mover).unwrap();
            if has_four_in_a_row(work, row, column) {
                work.undo(row, column);
                return if maximizing { WIN_SCORE } else { -WIN_SCORE };
            }
            scores.push(plain_minimax(work, player, depth - 1, !maximizing));
            work.undo(row, column);
        }
        if maximizing {
            scores.into_iter().max().unwrap()
        } else {
            scores.into_iter().min().unwrap()
        }
    }

    fn plain_scores(board: &Board, player: Player, depth: u8) -> Vec<SearchResult> {
        let mut work = board.clone();
        work.legal_columns()
            .into_iter()
            .map(|column| {
                let row = work.place(column, player).unwrap();
                let score = if has_four_in_a_row(&work, row, column) {
                    WIN_SCORE
                } else {
                    plain_minimax(&mut work, player, depth - 1, false)
                };
                work.undo(row, column);
                SearchResult { column, score }
            })
            .collect()
    }

    fn quiet_positions() -> Vec<Board> {
        [
            vec![],
            vec![3],
            vec![3, 3, 2, 4],
            vec![3, 2, 4, 4, 2, 5, 1],
            vec![0, 6, 1, 5, 3, 3, 5, 2],
        ]
        .iter()
        .map(|moves| Board::replay(moves).unwrap())
        .collect()
    }

    #[test]
    fn takes_immediate_win_at_any_depth() {
        // A owns the floor in 0, 1 and 2.
        let board = Board::replay(&[0, 6, 1, 6, 2, 5]).unwrap();
        for depth in 1..=6 {
            let res = best_move(&board, Player::A, &SearchConfig::with_depth(depth)).unwrap();
            assert_eq!(res.column, 3);
            assert_eq!(res.score, WIN_SCORE);
        }
    }

    #[test]
    fn blocks_opponent_win() {
        // B owns the floor in 3, 4 and 5; 6 is taken by A, so 2 must be blocked.
        let board = Board::replay(&[0, 3, 0, 4, 6, 5]).unwrap();
        let res = best_move(&board, Player::A, &SearchConfig::default()).unwrap();
        assert_eq!(res.column, 2);
    }

    #[test]
    fn winning_beats_blocking() {
        // A can win in 3 while B threatens the top of column 6.
        let board = Board::replay(&[0, 6, 1, 6, 2, 6]).unwrap();
        let res = best_move(&board, Player::A, &SearchConfig::with_depth(3)).unwrap();
        assert_eq!(res.column, 3);
    }

    #[test]
    fn blocks_vertical_threat() {
        let board = Board::replay(&[1, 0, 2, 0, 1, 0]).unwrap();
        let res = best_move(&board, Player::A, &SearchConfig::with_depth(4)).unwrap();
        assert_eq!(res.column, 0);
    }

    #[test]
    fn ties_go_to_the_lowest_column() {
        // Center column filled; the position is mirror symmetric.
        let board = Board::replay(&[3, 3, 3, 3, 3, 3]).unwrap();
        let config = SearchConfig::with_depth(1);
        let res = best_move(&board, Player::A, &config).unwrap();
        assert_eq!(res.column, 2);
        let scores = score_columns(&board, Player::A, &config).unwrap();
        let four = scores.iter().find(|r| r.column == 4).unwrap();
        assert_eq!(four.score, res.score);
    }

    #[test]
    fn pruning_never_changes_the_answer() {
        for board in quiet_positions() {
            for depth in 1..=4 {
                let plain = plain_scores(&board, Player::A, depth);
                let expected = plain
                    .iter()
                    .fold(None::<SearchResult>, |best, r| match best {
                        Some(b) if b.score >= r.score => Some(b),
                        _ => Some(*r),
                    })
                    .unwrap();
                let mut work = board.clone();
                assert_eq!(search_root(&mut work, Player::A, depth), Ok(expected));

                let config = SearchConfig::with_depth(depth);
                assert_eq!(score_columns(&board, Player::A, &config).unwrap(), plain);
            }
        }
    }

    #[test]
    fn search_leaves_the_board_untouched() {
        for board in quiet_positions() {
            let mut work = board.clone();
            search_root(&mut work, Player::B, 5).unwrap();
            assert_eq!(work, board);
        }
        let threatened = Board::replay(&[0, 3, 0, 4, 6, 5]).unwrap();
        let mut work = threatened.clone();
        forced_move(&mut work, Player::A, &threatened.legal_columns());
        assert_eq!(work, threatened);
    }

    #[test]
    fn depth_is_validated() {
        let board = Board::new();
        assert_eq!(
            best_move(&board, Player::A, &SearchConfig::with_depth(0)),
            Err(SearchError::DepthOutOfRange(0))
        );
        assert_eq!(
            best_move(&board, Player::A, &SearchConfig::with_depth(MAX_DEPTH + 1)),
            Err(SearchError::DepthOutOfRange(MAX_DEPTH + 1))
        );
        assert_eq!(SearchConfig::default().depth, 5);
    }

    #[test]
    fn full_board_has_no_moves() {
        let mut board = Board::with_size(1, 1);
        board.place(0, Player::A).unwrap();
        assert_eq!(
            best_move(&board, Player::B, &SearchConfig::default()),
            Err(SearchError::NoMoves)
        );
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            best_move_weighted(&board, Player::B, &SearchConfig::default(), &mut rng),
            Err(SearchError::NoMoves)
        );
    }

    #[test]
    fn weighted_pick_favours_the_top_candidate() {
        let board = Board::new();
        let config = SearchConfig::with_depth(2);
        let mut ranked = score_columns(&board, Player::A, &config).unwrap();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        let top: Vec<usize> = ranked.iter().take(3).map(|r| r.column).collect();

        let mut rng = StdRng::seed_from_u64(7);
        let mut top_hits = 0;
        for _ in 0..500 {
            let pick = best_move_weighted(&board, Player::A, &config, &mut rng).unwrap();
            assert!(top.contains(&pick.column));
            if pick.column == top[0] {
                top_hits += 1;
            }
        }
        assert!((300..=400).contains(&top_hits), "top picked {top_hits} times");
    }

    #[test]
    fn weighted_pick_with_one_candidate() {
        let ranked = [SearchResult {
            column: 4,
            score: -10,
        }];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(pick_weighted(&ranked, &mut rng).column, 4);
        }
    }

    #[test]
    fn weighted_pick_keeps_forced_moves() {
        let board = Board::replay(&[0, 3, 0, 4, 6, 5]).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let pick =
                best_move_weighted(&board, Player::A, &SearchConfig::default(), &mut rng).unwrap();
            assert_eq!(pick.column, 2);
        }
    }
}
