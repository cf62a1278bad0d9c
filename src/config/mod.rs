//! Engine configuration.
//!
//! The learning parameters are the entire tunable surface of the engine and
//! are loaded from a TOML file.
//!
//! ## Loading Order
//!
//! 1. `SENTINEL_CONFIG` environment variable (path to TOML file)
//! 2. `sentinel.toml` in the current working directory
//! 3. Built-in defaults (the recommended learning parameters)
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(SentinelConfig::load());
//!
//! // Anywhere in the codebase:
//! let epochs = config::get().engine.epochs_per_rebuild;
//! ```

mod engine_config;

pub use engine_config::*;

use std::sync::OnceLock;

/// Global configuration, initialized once at startup.
static SENTINEL_CONFIG: OnceLock<SentinelConfig> = OnceLock::new();

/// Initialize the global configuration.
///
/// Must be called exactly once before any calls to `get()`.
pub fn init(config: SentinelConfig) {
    if SENTINEL_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global configuration.
///
/// Panics if `init()` has not been called. This is by design — a missing
/// config is a fatal startup error, not a recoverable condition.
pub fn get() -> &'static SentinelConfig {
    SENTINEL_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Check whether the config has been initialized.
///
/// Useful for tests and optional config paths.
pub fn is_initialized() -> bool {
    SENTINEL_CONFIG.get().is_some()
}
