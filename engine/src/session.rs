//! Turn controller for one game.
//!
//! The session never waits on a timer itself. Whenever something has to
//! happen later (the drop animation finishing, the AI's thinking pause) it
//! publishes a [`Scheduled`] task with a [`Ticket`]; the presentation layer
//! calls [`Session::fire`] with that ticket when the time has come. Tickets
//! carry the session generation, so anything scheduled before a reset is
//! ignored afterwards.
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::board::{Board, BoardSnapshot, Player};
use crate::error::{MoveRejection, SearchError};
use crate::search::{best_move, best_move_weighted, SearchConfig};
use crate::win::{outcome_after, GameOutcome};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    HumanVsHuman,
    HumanVsAi,
    AiVsAi,
}

impl GameMode {
    /// Whether the engine plays `player`'s moves. A always opens; in
    /// human-vs-AI the AI answers as B.
    pub fn is_ai(self, player: Player) -> bool {
        match self {
            GameMode::HumanVsHuman => false,
            GameMode::HumanVsAi => player == Player::B,
            GameMode::AiVsAi => true,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiStrategy {
    /// Always the best scoring column.
    Deterministic,
    /// Weighted pick among the three best columns.
    WeightedTopThree,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerLabels {
    pub a: String,
    pub b: String,
}

impl Default for PlayerLabels {
    fn default() -> Self {
        Self {
            a: "Red".to_string(),
            b: "Yellow".to_string(),
        }
    }
}

impl PlayerLabels {
    pub fn label(&self, player: Player) -> &str {
        match player {
            Player::A => &self.a,
            Player::B => &self.b,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub search: SearchConfig,
    pub labels: PlayerLabels,
    pub animation_ms: u64,
    pub ai_delay_ms: u64,
    /// Unset means weighted for AI-vs-AI and deterministic otherwise.
    pub ai_strategy: Option<AiStrategy>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            labels: PlayerLabels::default(),
            animation_ms: 500,
            ai_delay_ms: 1000,
            ai_strategy: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        self.search.validate()
    }

    pub fn strategy_for(&self, mode: GameMode) -> AiStrategy {
        self.ai_strategy.unwrap_or(match mode {
            GameMode::AiVsAi => AiStrategy::WeightedTopThree,
            _ => AiStrategy::Deterministic,
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "detail", rename_all = "snake_case")]
pub enum Phase {
    AwaitingMove(Player),
    /// A piece was accepted; the next move waits for the drop to settle.
    Animating(Player),
    /// Always a win or a draw.
    Over(GameOutcome),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    pub generation: u64,
    pub seq: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deferred {
    SettleDrop,
    AiMove,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Scheduled {
    pub ticket: Ticket,
    pub task: Deferred,
    pub delay_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    pub player: Player,
    pub column: usize,
    pub row: usize,
    pub board: BoardSnapshot,
    pub outcome: GameOutcome,
    /// Fire this once the drop animation is done.
    pub settle: Ticket,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub mode: GameMode,
    pub board: BoardSnapshot,
    pub current_player: Player,
    pub phase: Phase,
    pub outcome: GameOutcome,
    pub labels: PlayerLabels,
    pub pending: Option<Scheduled>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    Settled(GameState),
    AiMoved(MoveResult),
}

pub struct Session {
    mode: GameMode,
    config: SessionConfig,
    board: Board,
    current: Player,
    phase: Phase,
    last_drop: Option<(usize, usize)>,
    generation: u64,
    seq: u64,
    pending: Option<Scheduled>,
    rng: StdRng,
}

impl Session {
    /// Fails when the search settings are unusable, so an AI turn can never
    /// run into a bad depth halfway through a game.
    pub fn new(mode: GameMode, config: SessionConfig) -> Result<Self, SearchError> {
        Self::with_rng(mode, config, StdRng::from_entropy())
    }

    /// Reproducible weighted AI picks.
    pub fn with_seed(
        mode: GameMode,
        config: SessionConfig,
        seed: u64,
    ) -> Result<Self, SearchError> {
        Self::with_rng(mode, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mode: GameMode, config: SessionConfig, rng: StdRng) -> Result<Self, SearchError> {
        config.validate()?;
        let mut session = Self {
            mode,
            config,
            board: Board::new(),
            current: Player::A,
            phase: Phase::AwaitingMove(Player::A),
            last_drop: None,
            generation: 0,
            seq: 0,
            pending: None,
            rng,
        };
        session.schedule_ai_turn();
        Ok(session)
    }

    /// Starts over with the same mode. Outstanding tickets go stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.board = Board::with_size(self.board.rows(), self.board.cols());
        self.current = Player::A;
        self.phase = Phase::AwaitingMove(Player::A);
        self.last_drop = None;
        self.pending = None;
        info!(mode = ?self.mode, generation = self.generation, "game reset");
        self.schedule_ai_turn();
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_player(&self) -> Player {
        self.current
    }

    pub fn pending(&self) -> Option<Scheduled> {
        self.pending
    }

    /// Derived from the board and the last drop; never stored.
    pub fn outcome(&self) -> GameOutcome {
        match self.last_drop {
            Some((row, col)) => outcome_after(&self.board, row, col),
            None => GameOutcome::InProgress,
        }
    }

    pub fn state(&self) -> GameState {
        GameState {
            mode: self.mode,
            board: self.board.snapshot(),
            current_player: self.current,
            phase: self.phase,
            outcome: self.outcome(),
            labels: self.config.labels.clone(),
            pending: self.pending,
        }
    }

    /// A human drop. Rejected without any state change when the column is bad,
    /// when a drop is still settling, when the game is over, or when it is the
    /// AI's turn.
    pub fn drop_piece(&mut self, column: usize) -> Result<MoveResult, MoveRejection> {
        let player = match self.phase {
            Phase::AwaitingMove(player) if !self.mode.is_ai(player) => player,
            phase => {
                debug!(column, ?phase, "drop while busy");
                return Err(MoveRejection::MoveWhileBusy);
            }
        };
        self.apply(player, column)
    }

    /// Runs the scheduled task `ticket` refers to. Stale or unknown tickets
    /// return `None` and change nothing.
    pub fn fire(&mut self, ticket: Ticket) -> Option<SessionEvent> {
        let Some(scheduled) = self.pending.filter(|s| s.ticket == ticket) else {
            debug!(?ticket, generation = self.generation, "stale ticket ignored");
            return None;
        };
        self.pending = None;
        match scheduled.task {
            Deferred::SettleDrop => {
                self.settle();
                Some(SessionEvent::Settled(self.state()))
            }
            Deferred::AiMove => self.play_ai_turn().map(SessionEvent::AiMoved),
        }
    }

    /// Fires whatever is pending right away.
    pub fn run_pending(&mut self) -> Option<SessionEvent> {
        let ticket = self.pending?.ticket;
        self.fire(ticket)
    }

    /// Runs pending tasks until none are left: to the end of the game when
    /// both sides are AI, or until a human has to move.
    pub fn play_out(&mut self) -> GameOutcome {
        while self.run_pending().is_some() {}
        self.outcome()
    }

    fn apply(&mut self, player: Player, column: usize) -> Result<MoveResult, MoveRejection> {
        let row = self.board.place(column, player).map_err(|err| {
            debug!(%err, ?player, "drop rejected");
            err
        })?;
        self.last_drop = Some((row, column));
        self.phase = Phase::Animating(player);
        let settle = self.schedule(Deferred::SettleDrop, self.config.animation_ms);
        let outcome = self.outcome();
        info!(?player, column, row, ?outcome, "piece dropped");
        Ok(MoveResult {
            player,
            column,
            row,
            board: self.board.snapshot(),
            outcome,
            settle,
        })
    }

    fn settle(&mut self) {
        let Phase::Animating(player) = self.phase else {
            return;
        };
        let outcome = self.outcome();
        if outcome.is_terminal() {
            self.phase = Phase::Over(outcome);
            info!(?outcome, "game over");
            return;
        }
        self.current = player.opponent();
        self.phase = Phase::AwaitingMove(self.current);
        self.schedule_ai_turn();
    }

    fn play_ai_turn(&mut self) -> Option<MoveResult> {
        let Phase::AwaitingMove(player) = self.phase else {
            return None;
        };
        let search = self.config.search;
        let choice = match self.config.strategy_for(self.mode) {
            AiStrategy::Deterministic => best_move(&self.board, player, &search),
            AiStrategy::WeightedTopThree => {
                best_move_weighted(&self.board, player, &search, &mut self.rng)
            }
        };
        let choice = match choice {
            Ok(choice) => choice,
            Err(err) => {
                warn!(%err, ?player, "AI could not choose a move");
                return None;
            }
        };
        match self.apply(player, choice.column) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(%err, ?player, "AI move rejected");
                None
            }
        }
    }

    fn schedule_ai_turn(&mut self) {
        if let Phase::AwaitingMove(player) = self.phase {
            if self.mode.is_ai(player) {
                self.schedule(Deferred::AiMove, self.config.ai_delay_ms);
            }
        }
    }

    fn schedule(&mut self, task: Deferred, delay_ms: u64) -> Ticket {
        self.seq += 1;
        let ticket = Ticket {
            generation: self.generation,
            seq: self.seq,
        };
        self.pending = Some(Scheduled {
            ticket,
            task,
            delay_ms,
        });
        ticket
    }
}
