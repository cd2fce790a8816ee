use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MoveRejection;

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Player {
    A,
    B,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::A => Player::B,
            Player::B => Player::A,
        }
    }

    pub fn slot(self) -> Slot {
        match self {
            Player::A => Slot::A,
            Player::B => Slot::B,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Slot {
    #[default]
    Empty,
    A,
    B,
}

impl Slot {
    pub fn owner(self) -> Option<Player> {
        match self {
            Slot::Empty => None,
            Slot::A => Some(Player::A),
            Slot::B => Some(Player::B),
        }
    }

    fn symbol(self) -> char {
        match self {
            Slot::Empty => '.',
            Slot::A => 'A',
            Slot::B => 'B',
        }
    }
}

/// Grid of slots, row 0 at the top. Pieces only ever rest on the floor or on
/// another piece.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Slot>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self::with_size(ROWS, COLS)
    }

    /// Any size is accepted; dimensions are clamped to at least one row and column.
    pub fn with_size(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            cells: vec![Slot::Empty; rows * cols],
        }
    }

    /// Replays alternating drops, A first.
    pub fn replay(columns: &[usize]) -> Result<Self, MoveRejection> {
        let mut board = Self::new();
        let mut player = Player::A;
        for &col in columns {
            board.place(col, player)?;
            player = player.opponent();
        }
        Ok(board)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Panics when `(row, col)` is off the grid.
    pub fn get(&self, row: usize, col: usize) -> Slot {
        self.cells[self.index(row, col)]
    }

    /// Like [`Board::get`] but with signed coordinates; `None` off the grid.
    pub(crate) fn get_signed(&self, row: isize, col: isize) -> Option<Slot> {
        if row < 0 || col < 0 || row as usize >= self.rows || col as usize >= self.cols {
            return None;
        }
        Some(self.get(row as usize, col as usize))
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn lowest_vacant_row(&self, col: usize) -> Option<usize> {
        if col >= self.cols {
            return None;
        }
        (0..self.rows)
            .rev()
            .find(|&row| self.get(row, col) == Slot::Empty)
    }

    pub fn is_column_full(&self, col: usize) -> bool {
        col >= self.cols || self.get(0, col) != Slot::Empty
    }

    /// Drops a piece and returns the row it landed on.
    pub fn place(&mut self, col: usize, player: Player) -> Result<usize, MoveRejection> {
        if col >= self.cols {
            return Err(MoveRejection::InvalidColumn { column: col });
        }
        let row = self
            .lowest_vacant_row(col)
            .ok_or(MoveRejection::ColumnFull { column: col })?;
        let idx = self.index(row, col);
        self.cells[idx] = player.slot();
        Ok(row)
    }

    /// Clears a slot. Only the topmost piece of a column may be removed, or the
    /// gravity invariant breaks.
    pub fn undo(&mut self, row: usize, col: usize) {
        debug_assert!(
            row == 0 || self.get(row - 1, col) == Slot::Empty,
            "undo below the top of column {col}"
        );
        let idx = self.index(row, col);
        self.cells[idx] = Slot::Empty;
    }

    /// The top row being occupied everywhere is enough because of gravity.
    pub fn is_full(&self) -> bool {
        (0..self.cols).all(|col| self.get(0, col) != Slot::Empty)
    }

    pub fn legal_columns(&self) -> Vec<usize> {
        (0..self.cols)
            .filter(|&col| !self.is_column_full(col))
            .collect()
    }

    pub fn piece_count(&self) -> usize {
        self.cells.iter().filter(|&&s| s != Slot::Empty).count()
    }

    /// Same position with A and B swapped.
    pub fn swapped(&self) -> Self {
        let cells = self
            .cells
            .iter()
            .map(|slot| match slot.owner() {
                Some(player) => player.opponent().slot(),
                None => Slot::Empty,
            })
            .collect();
        Self { cells, ..*self }
    }

    /// Same position reflected left to right.
    pub fn mirrored(&self) -> Self {
        let mut out = Self::with_size(self.rows, self.cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let idx = out.index(row, self.cols - 1 - col);
                out.cells[idx] = self.get(row, col);
            }
        }
        out
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            rows: self.rows,
            cols: self.cols,
            cells: self
                .cells
                .chunks(self.cols)
                .map(|row| row.to_vec())
                .collect(),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            let line: String = (0..self.cols).map(|col| self.get(row, col).symbol()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Immutable copy of a board handed to the presentation layer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub rows: usize,
    pub cols: usize,
    /// Row-major, top row first.
    pub cells: Vec<Vec<Slot>>,
}
