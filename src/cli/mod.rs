//! Command-line interface: a thin transport over the reasoning engine.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

use crate::domain::models::{Config, ModelTier, StreamEvent};
use crate::domain::ports::{ModelProvider, NullMetrics};
use crate::infrastructure::providers::{GeminiProvider, OpenAiProvider};
use crate::services::{ModelGateway, ReasoningEngine};

#[derive(Parser)]
#[command(name = "reagent")]
#[command(about = "Reagent - Agentic Reasoning Runtime", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from a specific file instead of .reagent/
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a question and print the reasoned answer
    Ask {
        /// The question to answer
        question: String,

        /// Model tier to start from
        #[arg(short, long, value_enum, default_value_t = TierArg::Pro)]
        tier: TierArg,

        /// Caller identity injected into tool calls
        #[arg(long)]
        user: Option<String>,

        /// Stream the answer as it becomes available
        #[arg(long)]
        stream: bool,
    },

    /// Probe model availability and print one status per target
    Health,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TierArg {
    Pro,
    Flash,
    Fallback,
}

impl From<TierArg> for ModelTier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Pro => Self::Pro,
            TierArg::Flash => Self::Flash,
            TierArg::Fallback => Self::Fallback,
        }
    }
}

/// Build the gateway from config plus API keys in the environment.
///
/// `GEMINI_API_KEY` is required; `OPENAI_API_KEY` enables the secondary
/// provider when present.
fn build_gateway(config: &Config) -> Result<Arc<ModelGateway>> {
    let api_key =
        std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY environment variable not set")?;
    let provider = Arc::new(GeminiProvider::new(api_key)?);

    let mut gateway = ModelGateway::new(provider, config.models.clone(), config.gateway.clone());
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        gateway = gateway.with_secondary_factory(Box::new(move || {
            Ok(Arc::new(OpenAiProvider::new(openai_key.clone())?) as Arc<dyn ModelProvider>)
        }));
    }
    Ok(Arc::new(gateway))
}

/// Execute `ask`.
///
/// The CLI registers no tools of its own; tool implementations are
/// wired in by library consumers. Free-text reasoning still works.
pub async fn ask(
    config: &Config,
    question: &str,
    tier: TierArg,
    user: Option<&str>,
    stream: bool,
    json_output: bool,
) -> Result<()> {
    let gateway = build_gateway(config)?;
    let engine = ReasoningEngine::new(
        gateway,
        HashMap::new(),
        Arc::new(NullMetrics),
        config.engine.clone(),
    );

    if stream {
        let mut rx = engine
            .stream_answer(question, user, &Value::Null, tier.into())
            .await?;
        while let Some(event) = rx.recv().await {
            if json_output {
                println!("{}", serde_json::to_string(&event)?);
            } else {
                match event {
                    StreamEvent::Token { text } => print!("{text}"),
                    StreamEvent::Sources { sources } if !sources.is_empty() => {
                        println!("\n\nSources:");
                        for source in sources {
                            match source.url {
                                Some(url) => println!("- {} ({url})", source.title),
                                None => println!("- {}", source.title),
                            }
                        }
                    }
                    StreamEvent::Error { message } => eprintln!("\nerror: {message}"),
                    _ => {}
                }
            }
        }
        if !json_output {
            println!();
        }
        return Ok(());
    }

    let outcome = engine
        .run(question, user, &Value::Null, tier.into())
        .await?;
    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "answer": outcome.answer,
                "sources": outcome.sources,
                "steps": outcome.steps_taken,
                "cost_usd": outcome.cost_usd,
            }))?
        );
    } else {
        println!("{}", outcome.answer);
        if !outcome.sources.is_empty() {
            println!("\nSources:");
            for source in &outcome.sources {
                match &source.url {
                    Some(url) => println!("- {} ({url})", source.title),
                    None => println!("- {}", source.title),
                }
            }
        }
        println!(
            "\n({} steps, ${:.4})",
            outcome.steps_taken, outcome.cost_usd
        );
    }
    Ok(())
}

/// Execute `health`.
pub async fn health(config: &Config, json_output: bool) -> Result<()> {
    let gateway = build_gateway(config)?;
    let results = gateway.health_check().await;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        let mut targets: Vec<_> = results.iter().collect();
        targets.sort();
        for (target, healthy) in targets {
            let status = if *healthy { "ok" } else { "unavailable" };
            println!("{target}: {status}");
        }
    }
    Ok(())
}

/// Print a fatal error and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json_output: bool) -> ! {
    if json_output {
        eprintln!("{}", json!({ "error": format!("{err:#}") }));
    } else {
        eprintln!("error: {err:#}");
    }
    std::process::exit(1);
}
