//! Shared utilities for two-player game implementations
//!
//! Outcome and encoding helpers used by rules implementations so every
//! game reports terminal values and evaluator inputs the same way.

/// Winner codes used by the simple board games in this workspace.
pub mod winner {
    /// Game still running
    pub const NONE: u8 = 0;
    /// First player won
    pub const PLAYER1: u8 = 1;
    /// Second player won
    pub const PLAYER2: u8 = 2;
    /// Drawn game
    pub const DRAW: u8 = 3;
}

/// Outcome value of a finished game for the side to move.
///
/// The search always reads values from the perspective of the player whose
/// turn it is, so a position where the opponent has just won is worth -1.
///
/// # Arguments
/// * `winner` - Winner code: 0=ongoing, 1=player1 won, 2=player2 won, 3=draw
/// * `to_move` - The player whose turn it is at the position (1 or 2)
///
/// # Example
/// ```
/// use engine_core::game_utils::outcome_value;
///
/// // Player 1 has won and player 2 is to move: lost for the mover
/// assert_eq!(outcome_value(1, 2), -1.0);
///
/// // Draw
/// assert_eq!(outcome_value(3, 1), 0.0);
/// ```
#[inline]
pub fn outcome_value(winner: u8, to_move: u8) -> f32 {
    match winner {
        winner::PLAYER1 | winner::PLAYER2 => {
            if winner == to_move {
                1.0
            } else {
                -1.0
            }
        }
        _ => 0.0,
    }
}

/// The other player of a two-player game (1 <-> 2).
#[inline]
pub fn opponent(player: u8) -> u8 {
    if player == 1 {
        2
    } else {
        1
    }
}

/// Concatenate feature planes into one evaluator input vector.
///
/// # Example
/// ```
/// use engine_core::game_utils::concat_planes;
///
/// let board = [1.0f32, 0.0, 0.0];
/// let player = [1.0f32, 0.0];
///
/// let input = concat_planes([&board[..], &player[..]]);
/// assert_eq!(input, vec![1.0, 0.0, 0.0, 1.0, 0.0]);
/// ```
pub fn concat_planes<'a>(planes: impl IntoIterator<Item = &'a [f32]>) -> Vec<f32> {
    let mut out = Vec::new();
    for plane in planes {
        out.extend_from_slice(plane);
    }
    out
}
