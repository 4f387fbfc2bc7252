//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_VAR: &str = "XQZERO_CONFIG";

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",    // Current directory
    "../config.toml", // Parent directory (when running from subdirectory)
];

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by the XQZERO_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        let path = Path::new(&path);
        if path.exists() {
            info!("Loading config from {}: {}", CONFIG_PATH_VAR, path.display());
            return load_from_path(path);
        }
        warn!(
            "{}={} not found, searching defaults",
            CONFIG_PATH_VAR,
            path.display()
        );
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(path);
        }
    }

    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
///
/// Unreadable or malformed files fall back to the built-in defaults.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (u32, f64, bool, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        match std::env::var($key).map(|s| s.parse()) {
            Ok(Ok(v)) => $config.$section.$field = v,
            Ok(Err(_)) => warn!("Ignoring unparseable {}", $key),
            Err(_) => {}
        }
    };
    // Optional parseable field (Option<u64>, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, optional_parse) => {
        match std::env::var($key).map(|s| s.parse()) {
            Ok(Ok(v)) => $config.$section.$field = Some(v),
            Ok(Err(_)) => warn!("Ignoring unparseable {}", $key),
            Err(_) => {}
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: XQZERO_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.log_level, "XQZERO_COMMON_LOG_LEVEL");

    // MCTS
    env_override!(
        config,
        mcts.num_simulations,
        "XQZERO_MCTS_NUM_SIMULATIONS",
        parse
    );
    env_override!(config, mcts.c_puct, "XQZERO_MCTS_C_PUCT", parse);
    env_override!(
        config,
        mcts.virtual_loss,
        "XQZERO_MCTS_VIRTUAL_LOSS",
        parse
    );
    env_override!(config, mcts.num_workers, "XQZERO_MCTS_NUM_WORKERS", parse);
    env_override!(config, mcts.leaf_batch_size, "XQZERO_MCTS_LEAF_BATCH_SIZE", parse);
    env_override!(config, mcts.temperature, "XQZERO_MCTS_TEMPERATURE", parse);
    env_override!(
        config,
        mcts.temp_threshold,
        "XQZERO_MCTS_TEMP_THRESHOLD",
        parse
    );
    env_override!(
        config,
        mcts.tau_decay_rate,
        "XQZERO_MCTS_TAU_DECAY_RATE",
        parse
    );
    env_override!(
        config,
        mcts.dirichlet_alpha,
        "XQZERO_MCTS_DIRICHLET_ALPHA",
        parse
    );
    env_override!(
        config,
        mcts.dirichlet_weight,
        "XQZERO_MCTS_DIRICHLET_WEIGHT",
        parse
    );
    env_override!(config, mcts.reuse_tree, "XQZERO_MCTS_REUSE_TREE", parse);
    env_override!(
        config,
        mcts.max_search_ms,
        "XQZERO_MCTS_MAX_SEARCH_MS",
        parse
    );
    env_override!(config, mcts.seed, "XQZERO_MCTS_SEED", optional_parse);

    // Evaluator gateway
    env_override!(
        config,
        evaluator.max_batch_size,
        "XQZERO_EVALUATOR_MAX_BATCH_SIZE",
        parse
    );
    env_override!(
        config,
        evaluator.batch_wait_us,
        "XQZERO_EVALUATOR_BATCH_WAIT_US",
        parse
    );
    env_override!(
        config,
        evaluator.request_timeout_ms,
        "XQZERO_EVALUATOR_REQUEST_TIMEOUT_MS",
        parse
    );

    // Resignation
    env_override!(config, resign.enabled, "XQZERO_RESIGN_ENABLED", parse);
    env_override!(config, resign.threshold, "XQZERO_RESIGN_THRESHOLD", parse);
    env_override!(
        config,
        resign.consecutive_plies,
        "XQZERO_RESIGN_CONSECUTIVE_PLIES",
        parse
    );
    env_override!(config, resign.min_ply, "XQZERO_RESIGN_MIN_PLY", parse);

    config
}
