//! Per-request fallback budget: depth and dollar cost.
//!
//! Every top-level user request carries one [`QueryCostTracker`]. The
//! gateway charges it for each model actually attempted and for the
//! token cost of successful calls; crossing either ceiling aborts the
//! request even if untried models remain in the chain.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::domain::errors::AgentError;
use crate::domain::models::TokenUsage;

/// Pricing per million tokens for a specific model.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    /// Cost per million prompt tokens (USD).
    pub prompt: f64,
    /// Cost per million completion tokens (USD).
    pub completion: f64,
}

/// Known model pricing table (costs in USD per million tokens).
const PRICING_TABLE: &[(&str, ModelPricing)] = &[
    ("gemini-2.5-pro", ModelPricing { prompt: 1.25, completion: 10.0 }),
    ("gemini-2.5-flash", ModelPricing { prompt: 0.30, completion: 2.50 }),
    ("gemini-2.0-flash-lite", ModelPricing { prompt: 0.075, completion: 0.30 }),
    ("gemini", ModelPricing { prompt: 0.30, completion: 2.50 }),
    ("gpt-4o-mini", ModelPricing { prompt: 0.15, completion: 0.60 }),
    ("gpt-4o", ModelPricing { prompt: 2.50, completion: 10.0 }),
];

/// Get pricing for a model by name or family substring.
///
/// Matches longest-prefix style: an exact entry wins over the family
/// default (e.g. "gemini-2.5-pro-exp-0827" matches "gemini-2.5-pro").
pub fn get_model_pricing(model: &str) -> Option<ModelPricing> {
    let model_lower = model.to_lowercase();
    PRICING_TABLE
        .iter()
        .find(|(name, _)| model_lower.starts_with(name))
        .map(|(_, pricing)| *pricing)
}

/// Estimate the USD cost of a call. Unknown models cost nothing rather
/// than failing the request.
pub fn estimate_cost(model: &str, usage: TokenUsage) -> f64 {
    get_model_pricing(model).map_or(0.0, |pricing| {
        (usage.prompt_tokens as f64 * pricing.prompt
            + usage.completion_tokens as f64 * pricing.completion)
            / 1_000_000.0
    })
}

/// Tracks fallback depth and accumulated spend for one request.
///
/// Interior mutability (atomics) lets the gateway charge the tracker
/// through a shared reference while the engine retains ownership. Cost
/// is stored in micro-dollars to stay lock-free.
#[derive(Debug)]
pub struct QueryCostTracker {
    depth: AtomicU32,
    cost_microusd: AtomicU64,
    usage: std::sync::Mutex<TokenUsage>,
    max_depth: u32,
    max_cost_usd: f64,
}

impl QueryCostTracker {
    pub fn new(max_depth: u32, max_cost_usd: f64) -> Self {
        Self {
            depth: AtomicU32::new(0),
            cost_microusd: AtomicU64::new(0),
            usage: std::sync::Mutex::new(TokenUsage::default()),
            max_depth,
            max_cost_usd,
        }
    }

    /// Models attempted in the current send (breaker skips do not count).
    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Relaxed)
    }

    /// Accumulated spend in USD.
    pub fn cost_usd(&self) -> f64 {
        self.cost_microusd.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    /// Total token usage across all successful calls for this request.
    pub fn usage(&self) -> TokenUsage {
        *self.usage.lock().expect("usage lock poisoned")
    }

    /// Start a new gateway send: depth is a per-send budget (how far down
    /// one fallback chain this call walked), while cost accumulates across
    /// the whole request.
    pub fn reset_depth(&self) {
        self.depth.store(0, Ordering::Relaxed);
    }

    /// Charge one fallback hop. Fails once the attempt would exceed the
    /// depth budget; the failed check does not consume depth.
    pub fn begin_attempt(&self) -> Result<(), AgentError> {
        let depth = self.depth.load(Ordering::Relaxed) + 1;
        if depth > self.max_depth {
            return Err(AgentError::FallbackDepthExceeded {
                depth,
                max: self.max_depth,
            });
        }
        self.depth.store(depth, Ordering::Relaxed);
        Ok(())
    }

    /// Add the cost of a successful call.
    pub fn record_usage(&self, model: &str, usage: TokenUsage) {
        let cost = estimate_cost(model, usage);
        let micro = (cost * 1_000_000.0).round() as u64;
        self.cost_microusd.fetch_add(micro, Ordering::Relaxed);
        let mut total = self.usage.lock().expect("usage lock poisoned");
        *total = total.add(usage);
    }

    /// Abort the request once spend has crossed the ceiling.
    pub fn ensure_within_cost(&self) -> Result<(), AgentError> {
        let cost = self.cost_usd();
        if cost > self.max_cost_usd {
            return Err(AgentError::FallbackCostExceeded {
                cost,
                max: self.max_cost_usd,
            });
        }
        Ok(())
    }
}
