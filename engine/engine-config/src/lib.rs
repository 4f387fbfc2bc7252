//! Centralized configuration loading from config.toml.
//!
//! This crate provides the configuration structs and loading logic shared
//! by the search engine and anything embedding it.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`XQZERO_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults (config.defaults.toml, embedded at compile time)
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! XQZERO_<SECTION>_<KEY>=value
//!
//! Examples:
//!     XQZERO_COMMON_LOG_LEVEL=debug
//!     XQZERO_MCTS_NUM_SIMULATIONS=1600
//!     XQZERO_MCTS_SEED=42
//!     XQZERO_EVALUATOR_MAX_BATCH_SIZE=32
//!     XQZERO_RESIGN_ENABLED=false
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{
    apply_env_overrides, load_config, load_from_path, CONFIG_PATH_VAR, CONFIG_SEARCH_PATHS,
};
pub use structs::*;
