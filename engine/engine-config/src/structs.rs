//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// These call the accessor functions from defaults module
// ============================================================================

fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_num_sims() -> u32 {
    defaults::num_simulations()
}
fn d_c_puct() -> f64 {
    defaults::c_puct()
}
fn d_virtual_loss() -> f64 {
    defaults::virtual_loss()
}
fn d_num_workers() -> usize {
    defaults::num_workers()
}
fn d_leaf_batch_size() -> usize {
    defaults::leaf_batch_size()
}
fn d_temperature() -> f64 {
    defaults::temperature()
}
fn d_temp_threshold() -> u32 {
    defaults::temp_threshold()
}
fn d_tau_decay_rate() -> f64 {
    defaults::tau_decay_rate()
}
fn d_dirichlet_alpha() -> f64 {
    defaults::dirichlet_alpha()
}
fn d_dirichlet_weight() -> f64 {
    defaults::dirichlet_weight()
}
fn d_reuse_tree() -> bool {
    defaults::reuse_tree()
}
fn d_max_search_ms() -> u64 {
    defaults::max_search_ms()
}
fn d_seed() -> Option<u64> {
    defaults::seed()
}
fn d_max_batch_size() -> usize {
    defaults::max_batch_size()
}
fn d_batch_wait_us() -> u64 {
    defaults::batch_wait_us()
}
fn d_request_timeout_ms() -> u64 {
    defaults::request_timeout_ms()
}
fn d_resign_enabled() -> bool {
    defaults::resign_enabled()
}
fn d_resign_threshold() -> f64 {
    defaults::resign_threshold()
}
fn d_resign_consecutive() -> u32 {
    defaults::resign_consecutive_plies()
}
fn d_resign_min_ply() -> u32 {
    defaults::resign_min_ply()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub mcts: MctsConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub resign: ResignConfig,
}

/// Settings for a host binary.
///
/// The engine crates never install a tracing subscriber, so `log_level` is
/// only read by whatever binary embeds them.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level().into(),
        }
    }
}

/// Tree search configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MctsConfig {
    /// Simulation budget per move decision
    #[serde(default = "d_num_sims")]
    pub num_simulations: u32,
    #[serde(default = "d_c_puct")]
    pub c_puct: f64,
    /// Value subtracted from an edge while a simulation is in flight through it
    #[serde(default = "d_virtual_loss")]
    pub virtual_loss: f64,
    /// Threads evaluating the leaves of a round (1 = sequential)
    #[serde(default = "d_num_workers")]
    pub num_workers: usize,
    /// Leaves selected per round. Fixes the search schedule, so results do
    /// not depend on `num_workers`
    #[serde(default = "d_leaf_batch_size")]
    pub leaf_batch_size: usize,
    #[serde(default = "d_temperature")]
    pub temperature: f64,
    /// Ply from which moves are chosen greedily
    #[serde(default = "d_temp_threshold")]
    pub temp_threshold: u32,
    /// Per-ply multiplicative decay applied to the temperature
    #[serde(default = "d_tau_decay_rate")]
    pub tau_decay_rate: f64,
    #[serde(default = "d_dirichlet_alpha")]
    pub dirichlet_alpha: f64,
    #[serde(default = "d_dirichlet_weight")]
    pub dirichlet_weight: f64,
    /// Keep the subtree of the previous search when the next root is in it
    #[serde(default = "d_reuse_tree")]
    pub reuse_tree: bool,
    /// Wall-clock budget per search in milliseconds (0 = unbounded)
    #[serde(default = "d_max_search_ms")]
    pub max_search_ms: u64,
    /// RNG seed for sampling and noise (None = seeded from entropy)
    #[serde(default = "d_seed")]
    pub seed: Option<u64>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            num_simulations: defaults::num_simulations(),
            c_puct: defaults::c_puct(),
            virtual_loss: defaults::virtual_loss(),
            num_workers: defaults::num_workers(),
            leaf_batch_size: defaults::leaf_batch_size(),
            temperature: defaults::temperature(),
            temp_threshold: defaults::temp_threshold(),
            tau_decay_rate: defaults::tau_decay_rate(),
            dirichlet_alpha: defaults::dirichlet_alpha(),
            dirichlet_weight: defaults::dirichlet_weight(),
            reuse_tree: defaults::reuse_tree(),
            max_search_ms: defaults::max_search_ms(),
            seed: defaults::seed(),
        }
    }
}

/// Evaluator gateway batching configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EvaluatorConfig {
    #[serde(default = "d_max_batch_size")]
    pub max_batch_size: usize,
    /// How long the gateway waits for more requests after the first one
    #[serde(default = "d_batch_wait_us")]
    pub batch_wait_us: u64,
    #[serde(default = "d_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_batch_size: defaults::max_batch_size(),
            batch_wait_us: defaults::batch_wait_us(),
            request_timeout_ms: defaults::request_timeout_ms(),
        }
    }
}

/// Resignation configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ResignConfig {
    #[serde(default = "d_resign_enabled")]
    pub enabled: bool,
    /// Root value below which a decision counts toward resigning
    #[serde(default = "d_resign_threshold")]
    pub threshold: f64,
    #[serde(default = "d_resign_consecutive")]
    pub consecutive_plies: u32,
    #[serde(default = "d_resign_min_ply")]
    pub min_ply: u32,
}

impl Default for ResignConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::resign_enabled(),
            threshold: defaults::resign_threshold(),
            consecutive_plies: defaults::resign_consecutive_plies(),
            min_ply: defaults::resign_min_ply(),
        }
    }
}
