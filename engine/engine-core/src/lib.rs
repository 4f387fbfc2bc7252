//! Core traits and types for the xqzero search engine
//!
//! This crate provides the board/rules contract the search consumes:
//! - `Game`: Typed trait describing legal moves, transitions, terminal
//!   outcomes and the evaluator input encoding for one game
//! - `TwoPlayerObs`: One-hot board planes shared by simple board games
//! - `game_utils`: Outcome and encoding helpers for two-player games

pub mod board_game;
pub mod game_utils;
pub mod typed;

// Re-export main types for convenience
pub use board_game::TwoPlayerObs;
pub use typed::Game;
