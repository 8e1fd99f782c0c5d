use serde::{Deserialize, Serialize};

/// Main configuration structure for Reagent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Concrete model ids per tier plus the secondary provider model
    #[serde(default)]
    pub models: ModelsConfig,

    /// Gateway behavior: breakers, fallback budget, availability flag
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Reasoning engine behavior
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model ids the gateway routes to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelsConfig {
    /// Highest-capability model (Pro tier entry point)
    #[serde(default = "default_pro_model")]
    pub pro: String,

    /// Mid-tier model (Flash tier entry point)
    #[serde(default = "default_flash_model")]
    pub flash: String,

    /// Cheapest model, terminating every fallback chain
    #[serde(default = "default_fallback_model")]
    pub fallback: String,

    /// Model used on the secondary provider (non-tiered alternate path)
    #[serde(default = "default_secondary_model")]
    pub secondary: String,
}

fn default_pro_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_flash_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_fallback_model() -> String {
    "gemini-2.0-flash-lite".to_string()
}

fn default_secondary_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            pro: default_pro_model(),
            flash: default_flash_model(),
            fallback: default_fallback_model(),
            secondary: default_secondary_model(),
        }
    }
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GatewayConfig {
    /// Consecutive failures before a per-model circuit opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Consecutive successes that close a half-open circuit
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,

    /// Seconds an open circuit blocks calls before half-closing
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,

    /// Maximum models tried per request before aborting
    #[serde(default = "default_max_fallback_depth")]
    pub max_fallback_depth: u32,

    /// Maximum USD spend per request before aborting
    #[serde(default = "default_max_fallback_cost_usd")]
    pub max_fallback_cost_usd: f64,

    /// When true, all primary-family health probes report false without
    /// attempting network calls
    #[serde(default)]
    pub primary_disabled: bool,
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_success_threshold() -> u32 {
    2
}

const fn default_open_timeout_secs() -> u64 {
    60
}

const fn default_max_fallback_depth() -> u32 {
    3
}

const fn default_max_fallback_cost_usd() -> f64 {
    0.50
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            open_timeout_secs: default_open_timeout_secs(),
            max_fallback_depth: default_max_fallback_depth(),
            max_fallback_cost_usd: default_max_fallback_cost_usd(),
            primary_disabled: false,
        }
    }
}

/// Reasoning engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Maximum ReAct steps per query
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Prefer native structured function calls over regex parsing
    #[serde(default = "default_use_native_function_calling")]
    pub use_native_function_calling: bool,

    /// Minimum observation length (chars) for the vector-search early exit
    #[serde(default = "default_early_exit_min_chars")]
    pub early_exit_min_chars: usize,

    /// Tool executions allowed per conversation
    #[serde(default = "default_tool_call_ceiling")]
    pub tool_call_ceiling: u32,

    /// Verification score below which one corrective re-prompt runs
    #[serde(default = "default_correction_threshold")]
    pub correction_threshold: f64,

    /// Evidence score below which a strong caution is prepended
    #[serde(default = "default_evidence_low")]
    pub evidence_low: f64,

    /// Evidence score at or above which the answer passes unmodified
    #[serde(default = "default_evidence_high")]
    pub evidence_high: f64,
}

const fn default_max_steps() -> u32 {
    5
}

const fn default_use_native_function_calling() -> bool {
    true
}

const fn default_early_exit_min_chars() -> usize {
    500
}

const fn default_tool_call_ceiling() -> u32 {
    10
}

const fn default_correction_threshold() -> f64 {
    0.7
}

const fn default_evidence_low() -> f64 {
    0.3
}

const fn default_evidence_high() -> f64 {
    0.6
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            use_native_function_calling: default_use_native_function_calling(),
            early_exit_min_chars: default_early_exit_min_chars(),
            tool_call_ceiling: default_tool_call_ceiling(),
            correction_threshold: default_correction_threshold(),
            evidence_low: default_evidence_low(),
            evidence_high: default_evidence_high(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
