//! Default configuration values loaded from config.defaults.toml.
//!
//! The defaults file is embedded at compile time so a binary without any
//! config.toml on disk still runs with the documented values.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    mcts: MctsDefaults,
    evaluator: EvaluatorDefaults,
    resign: ResignDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct MctsDefaults {
    num_simulations: u32,
    c_puct: f64,
    virtual_loss: f64,
    num_workers: usize,
    leaf_batch_size: usize,
    temperature: f64,
    temp_threshold: u32,
    tau_decay_rate: f64,
    dirichlet_alpha: f64,
    dirichlet_weight: f64,
    reuse_tree: bool,
    max_search_ms: u64,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EvaluatorDefaults {
    max_batch_size: usize,
    batch_wait_us: u64,
    request_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ResignDefaults {
    enabled: bool,
    threshold: f64,
    consecutive_plies: u32,
    min_ply: u32,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// MCTS
pub fn num_simulations() -> u32 {
    DEFAULTS.mcts.num_simulations
}
pub fn c_puct() -> f64 {
    DEFAULTS.mcts.c_puct
}
pub fn virtual_loss() -> f64 {
    DEFAULTS.mcts.virtual_loss
}
pub fn num_workers() -> usize {
    DEFAULTS.mcts.num_workers
}

pub fn leaf_batch_size() -> usize {
    DEFAULTS.mcts.leaf_batch_size
}
pub fn temperature() -> f64 {
    DEFAULTS.mcts.temperature
}
pub fn temp_threshold() -> u32 {
    DEFAULTS.mcts.temp_threshold
}
pub fn tau_decay_rate() -> f64 {
    DEFAULTS.mcts.tau_decay_rate
}
pub fn dirichlet_alpha() -> f64 {
    DEFAULTS.mcts.dirichlet_alpha
}
pub fn dirichlet_weight() -> f64 {
    DEFAULTS.mcts.dirichlet_weight
}
pub fn reuse_tree() -> bool {
    DEFAULTS.mcts.reuse_tree
}
pub fn max_search_ms() -> u64 {
    DEFAULTS.mcts.max_search_ms
}
pub fn seed() -> Option<u64> {
    DEFAULTS.mcts.seed
}

// Evaluator gateway
pub fn max_batch_size() -> usize {
    DEFAULTS.evaluator.max_batch_size
}
pub fn batch_wait_us() -> u64 {
    DEFAULTS.evaluator.batch_wait_us
}
pub fn request_timeout_ms() -> u64 {
    DEFAULTS.evaluator.request_timeout_ms
}

// Resignation
pub fn resign_enabled() -> bool {
    DEFAULTS.resign.enabled
}
pub fn resign_threshold() -> f64 {
    DEFAULTS.resign.threshold
}
pub fn resign_consecutive_plies() -> u32 {
    DEFAULTS.resign.consecutive_plies
}
pub fn resign_min_ply() -> u32 {
    DEFAULTS.resign.min_ply
}
