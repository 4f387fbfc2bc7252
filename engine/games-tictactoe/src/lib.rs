//! TicTacToe rules for the xqzero search engine
//!
//! A small, fully solved game used by the search tests and benchmarks. It
//! implements [`engine_core::Game`] the same way a full board game would:
//! legal moves, transitions, terminal outcomes from the side to move, and a
//! flat evaluator input built from [`TwoPlayerObs`].
//!
//! # Usage
//!
//! ```rust
//! use engine_core::Game;
//! use games_tictactoe::{Action, State, TicTacToe};
//!
//! let game = TicTacToe::new();
//! let state = State::new();
//! assert_eq!(game.legal_moves(&state).len(), 9);
//!
//! let next = game.apply(&state, &Action::Place(4));
//! assert_eq!(next.current_player(), 2);
//! ```

use engine_core::game_utils::{opponent, outcome_value, winner};
use engine_core::{Game, TwoPlayerObs};

/// Evaluator input layout: two one-hot board planes, legal mask, side to move.
pub type TicTacToeObs = TwoPlayerObs<18, 9>;

/// Winning positions (rows, columns, diagonals)
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

/// TicTacToe game state
///
/// Represents the complete state of a TicTacToe game including the board,
/// the player to move, and winner information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct State {
    /// Board representation: 0=empty, 1=X, 2=O
    board: [u8; 9],
    /// Player to move: 1=X, 2=O
    current_player: u8,
    /// Winner: 0=none/ongoing, 1=X, 2=O, 3=draw
    winner: u8,
}

impl State {
    /// Create a new initial game state
    pub fn new() -> Self {
        Self {
            board: [0; 9],
            current_player: 1, // X goes first
            winner: winner::NONE,
        }
    }

    /// Build a position from a board, deriving the side to move and winner.
    ///
    /// X moves first, so X is to move whenever both sides have placed the
    /// same number of marks.
    pub fn from_board(board: [u8; 9]) -> Self {
        let xs = board.iter().filter(|&&c| c == 1).count();
        let os = board.iter().filter(|&&c| c == 2).count();
        Self {
            board,
            current_player: if xs > os { 2 } else { 1 },
            winner: Self::check_winner(&board),
        }
    }

    pub fn board(&self) -> &[u8; 9] {
        &self.board
    }

    pub fn current_player(&self) -> u8 {
        self.current_player
    }

    pub fn winner(&self) -> u8 {
        self.winner
    }

    /// Check if the game is over
    pub fn is_done(&self) -> bool {
        self.winner != winner::NONE
    }

    /// Get legal moves (empty positions)
    pub fn legal_moves(&self) -> Vec<u8> {
        if self.is_done() {
            return Vec::new();
        }

        (0..9u8)
            .filter(|&pos| self.board[pos as usize] == 0)
            .collect()
    }

    /// Make a move and return the new state.
    ///
    /// The turn always passes to the opponent, so a finished position is
    /// seen from the side that just lost (or drew). Illegal moves leave the
    /// state unchanged.
    pub fn make_move(&self, position: u8) -> State {
        if self.is_done() || position >= 9 || self.board[position as usize] != 0 {
            return *self;
        }

        let mut new_state = *self;
        new_state.board[position as usize] = self.current_player;
        new_state.winner = Self::check_winner(&new_state.board);
        new_state.current_player = opponent(self.current_player);
        new_state
    }

    /// Check for winner on the board
    fn check_winner(board: &[u8; 9]) -> u8 {
        for line in &LINES {
            let [a, b, c] = *line;
            if board[a] != 0 && board[a] == board[b] && board[b] == board[c] {
                return board[a];
            }
        }

        if board.iter().all(|&cell| cell != 0) {
            return winner::DRAW;
        }

        winner::NONE
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// TicTacToe action: place a mark at a board position (0-8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Place(u8),
}

impl Action {
    pub fn position(&self) -> u8 {
        match self {
            Action::Place(pos) => *pos,
        }
    }
}

/// TicTacToe rules
#[derive(Debug, Clone, Copy, Default)]
pub struct TicTacToe;

impl TicTacToe {
    pub fn new() -> Self {
        Self
    }
}

impl Game for TicTacToe {
    type State = State;
    type Action = Action;

    fn legal_moves(&self, state: &State) -> Vec<Action> {
        state.legal_moves().into_iter().map(Action::Place).collect()
    }

    fn apply(&self, state: &State, action: &Action) -> State {
        state.make_move(action.position())
    }

    fn is_terminal(&self, state: &State) -> bool {
        state.is_done()
    }

    fn terminal_value(&self, state: &State) -> f32 {
        outcome_value(state.winner, state.current_player)
    }

    fn encode(&self, state: &State) -> Vec<f32> {
        let legal = state.legal_moves().into_iter().map(usize::from);
        TicTacToeObs::from_board(&state.board, legal, state.current_player).to_input()
    }

    fn action_index(&self, action: &Action) -> usize {
        action.position() as usize
    }

    fn num_actions(&self) -> usize {
        9
    }
}
