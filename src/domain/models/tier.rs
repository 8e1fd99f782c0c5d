//! Capability/cost tiers and their fallback chains.
//!
//! A tier names an ordered class of models. Higher tiers chain down
//! through lower ones, terminating at the single cheapest model, so a
//! Pro request degrades gracefully under quota pressure instead of
//! failing outright.

use serde::{Deserialize, Serialize};

use super::config::ModelsConfig;

/// Ordered capability/cost tier for a generate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Highest-capability tier. Chains Pro -> Flash -> Fallback.
    Pro,
    /// Mid tier. Chains Flash -> Fallback.
    Flash,
    /// Cheapest tier, the chain terminator.
    Fallback,
}

impl ModelTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pro => "pro",
            Self::Flash => "flash",
            Self::Fallback => "fallback",
        }
    }

    /// Resolve this tier to its ordered fallback chain of concrete model ids.
    ///
    /// The chain is tried front to back; only transient provider errors
    /// advance to the next entry.
    pub fn fallback_chain(self, models: &ModelsConfig) -> Vec<String> {
        match self {
            Self::Pro => vec![
                models.pro.clone(),
                models.flash.clone(),
                models.fallback.clone(),
            ],
            Self::Flash => vec![models.flash.clone(), models.fallback.clone()],
            Self::Fallback => vec![models.fallback.clone()],
        }
    }

    /// The model a tier tries first (used by health probes and session seeding).
    pub fn entry_model(self, models: &ModelsConfig) -> String {
        match self {
            Self::Pro => models.pro.clone(),
            Self::Flash => models.flash.clone(),
            Self::Fallback => models.fallback.clone(),
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
