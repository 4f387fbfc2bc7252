//! Shared input encoding for two-player board games.
//!
//! Simple board games hand the evaluator the same three planes: who owns
//! each cell, which moves are legal, and whose turn it is.

use crate::game_utils::concat_planes;

/// Evaluator input planes for a two-player board game.
///
/// Generic over board view size and number of actions to support different board sizes.
/// - `BOARD_VIEW_SIZE`: Total size of one-hot board encoding (board_size * 2 for two players)
/// - `NUM_ACTIONS`: Number of possible actions (board positions or columns)
#[derive(Debug, Clone, PartialEq)]
pub struct TwoPlayerObs<const BOARD_VIEW_SIZE: usize, const NUM_ACTIONS: usize> {
    /// One-hot encoding of board: [player1_positions, player2_positions]
    pub board_view: [f32; BOARD_VIEW_SIZE],
    /// Legal moves mask (1.0 = legal, 0.0 = illegal)
    pub legal_moves: [f32; NUM_ACTIONS],
    /// Current player indicator: [is_player1, is_player2]
    pub current_player: [f32; 2],
}

impl<const BOARD_VIEW_SIZE: usize, const NUM_ACTIONS: usize>
    TwoPlayerObs<BOARD_VIEW_SIZE, NUM_ACTIONS>
{
    /// Create a new empty observation.
    pub fn new() -> Self {
        Self {
            board_view: [0.0; BOARD_VIEW_SIZE],
            legal_moves: [0.0; NUM_ACTIONS],
            current_player: [0.0; 2],
        }
    }

    /// Create observation from board state.
    ///
    /// - `board`: Slice of cell values (0=empty, 1=player1, 2=player2)
    /// - `legal`: Policy indices of the legal moves
    /// - `current_player`: Current player (1 or 2)
    pub fn from_board(
        board: &[u8],
        legal: impl IntoIterator<Item = usize>,
        current_player: u8,
    ) -> Self {
        let mut obs = Self::new();
        let board_size = BOARD_VIEW_SIZE / 2;

        for (i, &cell) in board.iter().enumerate().take(board_size) {
            match cell {
                1 => obs.board_view[i] = 1.0,
                2 => obs.board_view[i + board_size] = 1.0,
                _ => {}
            }
        }

        for index in legal {
            if let Some(slot) = obs.legal_moves.get_mut(index) {
                *slot = 1.0;
            }
        }

        if current_player == 1 {
            obs.current_player[0] = 1.0;
        } else {
            obs.current_player[1] = 1.0;
        }

        obs
    }

    /// Flatten into the evaluator input vector.
    pub fn to_input(&self) -> Vec<f32> {
        concat_planes([
            &self.board_view[..],
            &self.legal_moves[..],
            &self.current_player[..],
        ])
    }

    /// Total observation size in floats.
    pub const fn obs_size() -> usize {
        BOARD_VIEW_SIZE + NUM_ACTIONS + 2
    }
}

impl<const BOARD_VIEW_SIZE: usize, const NUM_ACTIONS: usize> Default
    for TwoPlayerObs<BOARD_VIEW_SIZE, NUM_ACTIONS>
{
    fn default() -> Self {
        Self::new()
    }
}
