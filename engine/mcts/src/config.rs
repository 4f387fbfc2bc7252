//! MCTS and evaluator gateway configuration parameters.
//!
//! Both structs default to the values in the central configuration, so
//! `MctsConfig::default()` matches config.defaults.toml.

use engine_config::CentralConfig;
use std::time::Duration;

/// Below this effective temperature moves are chosen greedily.
pub const MIN_TEMPERATURE: f32 = 1e-3;

/// Resignation policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ResignConfig {
    /// Whether the player may resign at all.
    pub enabled: bool,

    /// Root value estimate below which a decision counts toward resigning.
    pub threshold: f32,

    /// Number of consecutive decisions below the threshold before resigning.
    pub consecutive_plies: u32,

    /// Resignation is not considered before this ply.
    pub min_ply: u32,
}

impl ResignConfig {
    /// Resignation switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn new(threshold: f32, consecutive_plies: u32) -> Self {
        Self {
            enabled: true,
            threshold,
            consecutive_plies,
            min_ply: 0,
        }
    }

    /// Builder pattern: set the minimum ply.
    pub fn with_min_ply(mut self, ply: u32) -> Self {
        self.min_ply = ply;
        self
    }
}

impl Default for ResignConfig {
    fn default() -> Self {
        Self::from(&CentralConfig::default())
    }
}

impl From<&CentralConfig> for ResignConfig {
    fn from(config: &CentralConfig) -> Self {
        Self {
            enabled: config.resign.enabled,
            threshold: config.resign.threshold as f32,
            consecutive_plies: config.resign.consecutive_plies,
            min_ply: config.resign.min_ply,
        }
    }
}

/// Configuration for Monte Carlo Tree Search.
#[derive(Debug, Clone)]
pub struct MctsConfig {
    /// Number of simulations to run per move decision.
    pub num_simulations: u32,

    /// Exploration constant for the PUCT formula.
    /// Higher values encourage exploration, lower values favor exploitation.
    pub c_puct: f32,

    /// Value subtracted from an edge for every simulation in flight through it.
    /// Spreads the leaves of one round over different paths.
    pub virtual_loss: f32,

    /// Threads evaluating the leaves of a round. 1 runs the search inline.
    pub num_workers: usize,

    /// Leaves selected per round; the rounds, not the workers, fix the
    /// order in which the tree grows.
    pub leaf_batch_size: usize,

    /// Temperature for move selection after search.
    /// 1.0 = proportional to visit counts, 0.0 = most-visited (argmax)
    pub temperature: f32,

    /// From this ply on, moves are always chosen greedily.
    pub temp_threshold: u32,

    /// Per-ply multiplicative decay of the temperature before the threshold.
    pub tau_decay_rate: f32,

    /// Dirichlet noise alpha for root exploration. 0.0 disables noise.
    pub dirichlet_alpha: f32,

    /// Fraction of each root prior that comes from Dirichlet noise.
    pub dirichlet_epsilon: f32,

    /// Keep the explored subtree between decisions when the new root is in it.
    pub reuse_tree: bool,

    /// Wall-clock limit per decision. Exceeding it aborts the search.
    pub max_search_time: Option<Duration>,

    /// RNG seed for move sampling and noise. None draws from entropy.
    pub seed: Option<u64>,

    pub resign: ResignConfig,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self::from(&CentralConfig::default())
    }
}

impl From<&CentralConfig> for MctsConfig {
    fn from(config: &CentralConfig) -> Self {
        let mcts = &config.mcts;
        Self {
            num_simulations: mcts.num_simulations,
            c_puct: mcts.c_puct as f32,
            virtual_loss: mcts.virtual_loss as f32,
            num_workers: mcts.num_workers.max(1),
            leaf_batch_size: mcts.leaf_batch_size.max(1),
            temperature: mcts.temperature as f32,
            temp_threshold: mcts.temp_threshold,
            tau_decay_rate: mcts.tau_decay_rate as f32,
            dirichlet_alpha: mcts.dirichlet_alpha as f32,
            dirichlet_epsilon: mcts.dirichlet_weight as f32,
            reuse_tree: mcts.reuse_tree,
            max_search_time: (mcts.max_search_ms > 0)
                .then(|| Duration::from_millis(mcts.max_search_ms)),
            seed: mcts.seed,
            resign: ResignConfig::from(config),
        }
    }
}

impl MctsConfig {
    /// Create config for evaluation/match play (no noise, greedy selection).
    pub fn for_evaluation() -> Self {
        Self {
            temperature: 0.0,
            temp_threshold: 0,
            dirichlet_alpha: 0.0,
            dirichlet_epsilon: 0.0,
            ..Self::default()
        }
    }

    /// Create a fast, sequential, reproducible config for testing.
    pub fn for_testing() -> Self {
        Self {
            num_simulations: 50,
            c_puct: 1.5,
            virtual_loss: 1.0,
            num_workers: 1,
            leaf_batch_size: 1,
            temperature: 0.0,
            temp_threshold: 0,
            tau_decay_rate: 1.0,
            dirichlet_alpha: 0.0,
            dirichlet_epsilon: 0.0,
            reuse_tree: false,
            max_search_time: None,
            seed: Some(42),
            resign: ResignConfig::disabled(),
        }
    }

    /// Temperature used for a decision at `ply`, or 0.0 for greedy play.
    pub fn temperature_at(&self, ply: u32) -> f32 {
        if ply >= self.temp_threshold {
            return 0.0;
        }
        let tau = self.temperature * self.tau_decay_rate.powi(ply as i32);
        if tau < MIN_TEMPERATURE {
            0.0
        } else {
            tau
        }
    }

    /// Builder pattern: set number of simulations.
    pub fn with_simulations(mut self, n: u32) -> Self {
        self.num_simulations = n;
        self
    }

    /// Builder pattern: set c_puct exploration constant.
    pub fn with_c_puct(mut self, c: f32) -> Self {
        self.c_puct = c;
        self
    }

    /// Builder pattern: set virtual loss magnitude.
    pub fn with_virtual_loss(mut self, loss: f32) -> Self {
        self.virtual_loss = loss;
        self
    }

    /// Builder pattern: set number of simulation workers (at least 1).
    pub fn with_workers(mut self, n: usize) -> Self {
        self.num_workers = n.max(1);
        self
    }

    /// Builder pattern: set leaves per round (at least 1).
    pub fn with_leaf_batch(mut self, n: usize) -> Self {
        self.leaf_batch_size = n.max(1);
        self
    }

    /// Builder pattern: set temperature, applied until `threshold` ply
    /// without decay.
    pub fn with_temperature(mut self, t: f32, threshold: u32) -> Self {
        self.temperature = t;
        self.temp_threshold = threshold;
        self.tau_decay_rate = 1.0;
        self
    }

    /// Builder pattern: set per-ply temperature decay.
    pub fn with_tau_decay(mut self, rate: f32) -> Self {
        self.tau_decay_rate = rate;
        self
    }

    /// Builder pattern: enable root Dirichlet noise.
    pub fn with_dirichlet(mut self, alpha: f32, epsilon: f32) -> Self {
        self.dirichlet_alpha = alpha;
        self.dirichlet_epsilon = epsilon;
        self
    }

    /// Builder pattern: keep the subtree between decisions.
    pub fn with_tree_reuse(mut self, reuse: bool) -> Self {
        self.reuse_tree = reuse;
        self
    }

    /// Builder pattern: set a wall-clock limit per decision.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.max_search_time = Some(limit);
        self
    }

    /// Builder pattern: set RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder pattern: set resignation policy.
    pub fn with_resign(mut self, resign: ResignConfig) -> Self {
        self.resign = resign;
        self
    }
}

/// Configuration for the batching evaluator gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Largest number of requests sent to the model in one call.
    pub max_batch_size: usize,

    /// How long the gateway keeps collecting after the first request of a batch.
    pub batch_wait: Duration,

    /// How long a caller waits for its result before failing with `Timeout`.
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from(&CentralConfig::default())
    }
}

impl From<&CentralConfig> for GatewayConfig {
    fn from(config: &CentralConfig) -> Self {
        let eval = &config.evaluator;
        Self {
            max_batch_size: eval.max_batch_size.max(1),
            batch_wait: Duration::from_micros(eval.batch_wait_us),
            request_timeout: Duration::from_millis(eval.request_timeout_ms),
        }
    }
}

impl GatewayConfig {
    /// Larger batches and a longer collection window for throughput.
    pub fn for_evaluation() -> Self {
        Self {
            max_batch_size: 64,
            batch_wait: Duration::from_millis(2),
            ..Self::default()
        }
    }

    /// Small batches and a short timeout for testing.
    pub fn for_testing() -> Self {
        Self {
            max_batch_size: 8,
            batch_wait: Duration::from_millis(1),
            request_timeout: Duration::from_secs(5),
        }
    }

    /// Builder pattern: set maximum batch size (at least 1).
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    /// Builder pattern: set batch collection window.
    pub fn with_batch_wait(mut self, wait: Duration) -> Self {
        self.batch_wait = wait;
        self
    }

    /// Builder pattern: set per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
