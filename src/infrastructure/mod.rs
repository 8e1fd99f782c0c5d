//! Infrastructure layer: HTTP provider clients, configuration, logging.

pub mod config;
pub mod logging;
pub mod providers;
