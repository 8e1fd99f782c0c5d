//! Circuit breaker pattern for per-model failure detection and recovery.
//!
//! Each distinct model id gets its own breaker, created lazily on first
//! use and living for the process lifetime. The gateway consults the
//! breaker before every call so a persistently failing model is skipped
//! instead of burning the request's fallback budget.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Configuration shared by all breakers in a registry.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Failures before the circuit opens.
    pub failure_threshold: u32,
    /// Consecutive successes that close a half-open circuit and reset
    /// the failure count.
    pub success_threshold: u32,
    /// How long an open circuit blocks calls before half-closing.
    pub open_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::seconds(60),
        }
    }
}

/// Mutable breaker state for a single model.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    /// Failures since the circuit last closed.
    pub failure_count: u32,
    /// Consecutive successes since the last failure.
    pub success_count: u32,
    /// When the most recent failure was recorded.
    pub last_failure: Option<DateTime<Utc>>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed call. Any failure breaks a success streak.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.failure_count += 1;
        self.success_count = 0;
        self.last_failure = Some(now);
    }

    /// Record a successful call. Reaching the success threshold fully
    /// closes the circuit: the failure count resets to zero.
    pub fn record_success(&mut self, config: &BreakerConfig) {
        self.success_count += 1;
        if self.success_count >= config.success_threshold {
            self.failure_count = 0;
            self.success_count = 0;
            self.last_failure = None;
        }
    }

    /// Whether calls should currently be skipped.
    ///
    /// Open once `failure_count >= failure_threshold`; half-closes (calls
    /// allowed again) after `open_timeout` elapses since the last failure.
    pub fn is_open(&self, config: &BreakerConfig, now: DateTime<Utc>) -> bool {
        if self.failure_count < config.failure_threshold {
            return false;
        }
        self.last_failure
            .is_some_and(|at| now < at + config.open_timeout)
    }
}

/// Process-wide breaker registry keyed by model id.
///
/// Shared by every in-flight session; all mutation happens behind a
/// `tokio::sync::RwLock`. Clone is cheap (Arc).
#[derive(Debug, Clone)]
pub struct BreakerRegistry {
    breakers: Arc<RwLock<HashMap<String, CircuitBreaker>>>,
    config: BreakerConfig,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            breakers: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(BreakerConfig::default())
    }

    pub const fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Whether the breaker for `model` is open. A model never seen before
    /// gets a fresh (closed) breaker.
    pub async fn is_open(&self, model: &str) -> bool {
        let breakers = self.breakers.read().await;
        breakers
            .get(model)
            .is_some_and(|b| b.is_open(&self.config, Utc::now()))
    }

    /// Record a successful call against `model`.
    pub async fn record_success(&self, model: &str) {
        let mut breakers = self.breakers.write().await;
        let breaker = breakers.entry(model.to_string()).or_default();
        let was_failing = breaker.failure_count > 0;
        breaker.record_success(&self.config);
        if was_failing && breaker.failure_count == 0 {
            debug!(model, "circuit closed after recovery");
        }
    }

    /// Record a failed call against `model`.
    pub async fn record_failure(&self, model: &str) {
        let mut breakers = self.breakers.write().await;
        let breaker = breakers.entry(model.to_string()).or_default();
        breaker.record_failure(Utc::now());
        if breaker.failure_count == self.config.failure_threshold {
            warn!(
                model,
                failures = breaker.failure_count,
                "circuit opened, calls will be skipped"
            );
        }
    }

    /// Snapshot of a model's breaker, if one exists yet.
    pub async fn snapshot(&self, model: &str) -> Option<CircuitBreaker> {
        self.breakers.read().await.get(model).cloned()
    }
}
