//! Configuration module for l4quic
//!
//! This module provides configuration types and loading utilities.
//!
//! # Example
//!
//! ```no_run
//! use l4quic::config::{load_config, Config};
//!
//! let config = load_config("/etc/l4quic/config.json").unwrap();
//! println!("SNI patterns: {:?}", config.matcher.sni);
//! ```

mod loader;
mod types;

pub use loader::{
    apply_env_overrides, create_default_config, load_config, load_config_str,
    load_config_with_env,
};
pub use types::{Config, ListenConfig, LogConfig, MatcherConfig, MAX_PREFIX_LIMIT};
