//! Typed Game trait describing the rules collaborator
//!
//! The search engine never inspects a board directly. Everything it needs
//! (move generation, transitions, terminal detection and the evaluator input
//! encoding) is reached through this trait.

use std::fmt::Debug;
use std::hash::Hash;

/// Rules of a two-player, perfect-information game.
///
/// # Type Parameters
///
/// * `State` - Immutable position key (board, side to move, ply count).
///   Used as the key of the search tree, so equal positions must hash equally.
/// * `Action` - Compact move encoding, unique per legal move from a state.
///   The `Ord` implementation is the fixed ordering used to break ties.
///
/// # Example
///
/// ```rust
/// # use engine_core::typed::Game;
/// #[derive(Debug)]
/// struct Countdown;
///
/// impl Game for Countdown {
///     type State = u8;
///     type Action = u8;
///
///     fn legal_moves(&self, state: &u8) -> Vec<u8> {
///         (1..=2).filter(|take| take <= state).collect()
///     }
///     fn apply(&self, state: &u8, action: &u8) -> u8 {
///         state - action
///     }
///     fn is_terminal(&self, state: &u8) -> bool {
///         *state == 0
///     }
///     fn terminal_value(&self, _state: &u8) -> f32 {
///         -1.0 // the player facing an empty pile has lost
///     }
///     fn encode(&self, state: &u8) -> Vec<f32> {
///         vec![*state as f32]
///     }
///     fn action_index(&self, action: &u8) -> usize {
///         (*action - 1) as usize
///     }
///     fn num_actions(&self) -> usize {
///         2
///     }
/// }
///
/// let game = Countdown;
/// assert_eq!(game.legal_moves(&1), vec![1]);
/// assert!(game.is_terminal(&game.apply(&1, &1)));
/// ```
pub trait Game: Send + Sync + Debug + 'static {
    /// Position key
    type State: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Move key
    type Action: Copy + Ord + Hash + Debug + Send + Sync + 'static;

    /// All legal moves from `state`. Empty for finished games.
    fn legal_moves(&self, state: &Self::State) -> Vec<Self::Action>;

    /// The position reached by playing `action` from `state`.
    ///
    /// Only called with actions returned by `legal_moves(state)`.
    fn apply(&self, state: &Self::State, action: &Self::Action) -> Self::State;

    /// Whether the game is over at `state` (mate, stalemate, draw by rule).
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Outcome of a terminal position from the perspective of the side to
    /// move at `state`: +1 win, -1 loss, 0 draw.
    fn terminal_value(&self, state: &Self::State) -> f32;

    /// Encode a position as the evaluator's input vector.
    fn encode(&self, state: &Self::State) -> Vec<f32>;

    /// Index of `action` in the evaluator's policy vector.
    fn action_index(&self, action: &Self::Action) -> usize;

    /// Length of the evaluator's policy vector.
    fn num_actions(&self) -> usize;
}
