//! Neural-guided Monte Carlo Tree Search for two-player board games.
//!
//! This crate provides a game-agnostic search engine for any game
//! implementing the `engine-core` [`Game`](engine_core::Game) trait, driven by
//! an [`Evaluator`] that returns a move policy and a position value.
//!
//! # Overview
//!
//! The search runs in rounds of `leaf_batch_size` simulations. Each
//! simulation has three phases:
//!
//! 1. **Selection**: walk from the root by PUCT, charging virtual loss on
//!    every edge taken so the leaves of one round spread out
//! 2. **Expansion**: evaluate the round's leaves together, mask each policy
//!    to the legal moves and store it as the priors (finished positions use
//!    their game value)
//! 3. **Backup**: resolve the virtual loss and add the leaf value to every
//!    edge on the path, flipping sign at each ply
//!
//! Selection and backup follow a fixed order, so the tree after a search
//! does not depend on how many workers evaluated the leaves.
//!
//! The root is expanded before the loop. When the budget is spent the
//! [`MctsPlayer`] converts root visit counts into a move distribution,
//! samples (or takes the argmax at temperature 0) and decides whether to
//! resign.
//!
//! # Usage
//!
//! ```rust
//! use games_tictactoe::{State, TicTacToe};
//! use mcts::{MctsConfig, MctsPlayer, UniformEvaluator};
//!
//! let config = MctsConfig::for_testing().with_simulations(100);
//! let mut player = MctsPlayer::new(TicTacToe, UniformEvaluator::new(9), config);
//!
//! let decision = player.choose_move(&State::new(), 0).unwrap();
//! println!("Best action: {:?}", decision.action);
//! println!("Policy: {:?}", decision.policy);
//! println!("Value: {}", decision.value);
//! if let Some(report) = player.search_report() {
//!     println!("{}", report);
//! }
//! player.close();
//! ```
//!
//! # Configuration
//!
//! [`MctsConfig`] controls search behavior and defaults to the central
//! configuration (`config.defaults.toml`):
//!
//! - `num_simulations`: simulations per decision (default: 800)
//! - `c_puct`: exploration constant for PUCT (default: 1.5)
//! - `num_workers`: threads evaluating a round's leaves (default: 8)
//! - `leaf_batch_size`: simulations per round (default: 8)
//! - `temperature`: 1.0 = proportional to visits, 0.0 = greedy
//! - `resign`: value threshold and streak length for resignation
//!
//! # Evaluators
//!
//! - [`UniformEvaluator`]: uniform policy and zero value (for testing)
//! - [`BatchingEvaluator`]: wraps a model evaluator and coalesces the
//!   requests of concurrent workers into batched calls
//!
//! # Architecture
//!
//! ```text
//! MctsPlayer ── owns ──> SearchTree (state -> VisitState, one lock per node)
//!     │                  DebugRecord (state -> evaluator output)
//!     │                  SearchHandle (phase, abort request)
//!     │
//!     └─ run ──> round ── select leaves in order ──> SearchTree
//!                  │
//!                  ├─ worker 0..n ── evaluate ──> Evaluator (optionally BatchingEvaluator)
//!                  │
//!                  └─ expand and back up in selection order ──> SearchTree
//! ```

pub mod config;
pub mod debug;
pub mod error;
pub mod evaluator;
pub mod gateway;
pub mod node;
pub mod player;
pub mod report;
pub mod search;
pub mod tree;

#[cfg(test)]
mod test_utils;

// Re-export main types
pub use config::{GatewayConfig, MctsConfig, ResignConfig};
pub use debug::{DebugEntry, DebugRecord};
pub use error::SearchError;
pub use evaluator::{EvalResult, Evaluator, EvaluatorError, UniformEvaluator};
pub use gateway::{BatchingEvaluator, GatewayStats};
pub use node::{ActionStats, NodeStatus, VisitState};
pub use player::{MctsPlayer, MoveDecision, SearchHandle, SearchPhase};
pub use report::{ActionReport, SearchReport};
pub use search::SearchStats;
pub use tree::{SearchTree, TreeStats};
