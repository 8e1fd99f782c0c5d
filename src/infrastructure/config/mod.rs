//! Hierarchical configuration loading (defaults, YAML files, env vars).

mod loader;

pub use loader::{ConfigError, ConfigLoader};
