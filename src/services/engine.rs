//! ReAct reasoning engine: the Thought -> Action -> Observation loop.
//!
//! One engine instance serves many concurrent queries; everything
//! per-query lives in an [`AgentState`] plus a [`QueryCostTracker`] and
//! an [`ExecutionCounter`] created per run. The loop is strictly
//! sequential within a query: each step's gateway call and tool
//! execution complete before the next step starts, because the next
//! prompt depends on the previous observation.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::AgentError;
use crate::domain::models::{
    AgentState, EngineConfig, ModelTier, SourceRef, StreamEvent, TokenUsage,
};
use crate::domain::ports::{tool_specs, AnswerVerifier, MetricsSink, ToolRegistry};
use crate::services::cost_tracker::QueryCostTracker;
use crate::services::evidence;
use crate::services::executor::{ExecutionCounter, ToolExecutor};
use crate::services::gateway::{ChatSession, ModelGateway};
use crate::services::parser::{self, ParserInput};

/// Marker a model emits when it has the answer.
const FINAL_ANSWER_MARKER: &str = "FINAL ANSWER:";
/// Case-insensitive marker matcher. Matching on the original string
/// keeps byte offsets valid for slicing regardless of what non-ASCII
/// text surrounds the marker.
static FINAL_ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)FINAL ANSWER:").expect("final answer regex is valid"));
/// Phrase in a retrieval observation meaning the search found nothing.
const NO_RESULTS_PHRASE: &str = "no relevant documents";
/// Characters per streamed token chunk.
const STREAM_CHUNK_CHARS: usize = 48;
/// Streaming channel capacity; a stalled consumer backpressures the
/// producer instead of buffering the whole answer.
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// Completed reasoning result for one query.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// Final answer, possibly prefixed with an evidence caveat. Never
    /// empty.
    pub answer: String,
    /// Citations extracted from tool observations.
    pub sources: Vec<SourceRef>,
    /// ReAct steps actually taken.
    pub steps_taken: u32,
    /// USD spent across all gateway calls for this query.
    pub cost_usd: f64,
    /// Token totals across all gateway calls for this query.
    pub usage: TokenUsage,
}

/// Drives the bounded ReAct state machine.
pub struct ReasoningEngine {
    gateway: Arc<ModelGateway>,
    tools: ToolRegistry,
    executor: ToolExecutor,
    verifier: Option<Arc<dyn AnswerVerifier>>,
    config: EngineConfig,
}

impl ReasoningEngine {
    pub fn new(
        gateway: Arc<ModelGateway>,
        tools: ToolRegistry,
        metrics: Arc<dyn MetricsSink>,
        config: EngineConfig,
    ) -> Self {
        let executor = ToolExecutor::new(metrics, config.tool_call_ceiling);
        Self {
            gateway,
            tools,
            executor,
            verifier: None,
            config,
        }
    }

    /// Attach the optional verification collaborator.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn AnswerVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Answer one query, looping until a terminal state.
    ///
    /// # Errors
    ///
    /// Budget violations, the tool execution ceiling, and non-transient
    /// provider errors are fatal. Transient gateway exhaustion degrades
    /// to a context-derived answer when any context was gathered, and
    /// propagates otherwise.
    #[instrument(
        skip(self, query, user_id, history),
        fields(tier = %tier, request_id = %uuid::Uuid::new_v4())
    )]
    pub async fn run(
        &self,
        query: &str,
        user_id: Option<&str>,
        history: &Value,
        tier: ModelTier,
    ) -> Result<AgentOutcome, AgentError> {
        let mut state = AgentState::new(query, self.config.max_steps);
        let tracker = self.gateway.new_tracker();
        let counter = ExecutionCounter::new();
        let mut session = self.gateway.create_session_with_history(history, tier);
        let mut next_message = self.opening_prompt(query);

        while state.is_running() {
            state.current_step += 1;
            debug!(step = state.current_step, "reasoning step");

            let reply = match self
                .gateway
                .send(&mut session, &next_message, tier, &[], self.config.use_native_function_calling, &tracker)
                .await
            {
                Ok(reply) => reply,
                Err(e)
                    if e.is_degradable()
                        && (!state.context_gathered.is_empty() || !state.thoughts.is_empty()) =>
                {
                    warn!(error = %e, "gateway degraded, answering from gathered context");
                    state.final_answer = Some(synthesize_answer(&state));
                    break;
                }
                Err(e) => return Err(e),
            };

            let input = ParserInput::Response(&reply.response);
            if let Some(call) = parser::parse(&input, self.config.use_native_function_calling) {
                let (observation, elapsed) = self
                    .executor
                    .execute(&self.tools, &call.name, &call.arguments, user_id, &counter)
                    .await?;
                debug!(tool = %call.name, elapsed_secs = elapsed, "observation gathered");

                state.sources.extend(evidence::extract_sources(&observation));
                state.context_gathered.push(observation.clone());

                if self.should_exit_early(&call.name, &observation) {
                    info!(step = state.current_step, "early exit on retrieval hit");
                    state.final_answer = Some(synthesize_answer(&state));
                    break;
                }

                next_message = format!(
                    "OBSERVATION:\n{observation}\n\nContinue. Reply with another \
                     ACTION or with {FINAL_ANSWER_MARKER} followed by your answer."
                );
            } else if let Some(answer) = extract_final_answer(&reply.text) {
                state.final_answer = Some(answer);
            } else {
                state.thoughts.push(reply.text.clone());
                next_message = format!(
                    "Continue. Reply with an ACTION or with {FINAL_ANSWER_MARKER} \
                     followed by your answer."
                );
            }
        }

        let answer = state
            .final_answer
            .clone()
            .unwrap_or_else(|| synthesize_answer(&state));
        let answer = self.finalize(answer, &state, &mut session, tier, &tracker).await;

        info!(
            steps = state.current_step,
            cost_usd = tracker.cost_usd(),
            sources = state.sources.len(),
            "query answered"
        );
        Ok(AgentOutcome {
            answer,
            sources: state.sources,
            steps_taken: state.current_step,
            cost_usd: tracker.cost_usd(),
            usage: tracker.usage(),
        })
    }

    /// Streaming variant of [`run`](Self::run).
    ///
    /// The answer is fully computed before the first event is emitted, so
    /// any failure happens while no partial answer exists and propagates
    /// to the caller; after that, event emission cannot fail. The
    /// producer stops as soon as the receiver is dropped.
    pub async fn stream_answer(
        &self,
        query: &str,
        user_id: Option<&str>,
        history: &Value,
        tier: ModelTier,
    ) -> Result<mpsc::Receiver<StreamEvent>, AgentError> {
        let outcome = self.run(query, user_id, history, tier).await?;
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            for chunk in chunk_text(&outcome.answer, STREAM_CHUNK_CHARS) {
                if tx.send(StreamEvent::token(chunk)).await.is_err() {
                    return;
                }
            }
            let sources = StreamEvent::Sources {
                sources: outcome.sources,
            };
            if tx.send(sources).await.is_err() {
                return;
            }
            let metadata = StreamEvent::Metadata {
                data: json!({
                    "steps": outcome.steps_taken,
                    "cost_usd": outcome.cost_usd,
                    "prompt_tokens": outcome.usage.prompt_tokens,
                    "completion_tokens": outcome.usage.completion_tokens,
                }),
            };
            if tx.send(metadata).await.is_err() {
                return;
            }
            let _ = tx.send(StreamEvent::Done).await;
        });
        Ok(rx)
    }

    fn should_exit_early(&self, tool: &str, observation: &str) -> bool {
        tool == "vector_search"
            && observation.len() > self.config.early_exit_min_chars
            && !observation.to_lowercase().contains(NO_RESULTS_PHRASE)
    }

    /// Post-processing pipeline: stub filtering, one-shot self-correction,
    /// then the evidence caveat.
    async fn finalize(
        &self,
        answer: String,
        state: &AgentState,
        session: &mut ChatSession,
        tier: ModelTier,
        tracker: &QueryCostTracker,
    ) -> String {
        let mut answer = if evidence::is_stub_answer(&answer) {
            debug!("stub answer replaced with clarification request");
            evidence::clarification_request()
        } else {
            answer
        };

        if let Some(verifier) = &self.verifier {
            match verifier.process(&answer, &state.context_gathered).await {
                Ok(verification) if verification.score < self.config.correction_threshold => {
                    info!(score = verification.score, "verification below threshold, correcting once");
                    let prompt = correction_prompt(&answer, &verification.gaps);
                    match self
                        .gateway
                        .send(session, &prompt, tier, &[], false, tracker)
                        .await
                    {
                        // The corrected answer is accepted regardless of
                        // any re-score. Models sometimes prefix the
                        // rewrite with the answer marker; strip it.
                        Ok(reply) if !reply.text.trim().is_empty() => {
                            answer = extract_final_answer(&reply.text)
                                .unwrap_or_else(|| reply.text.trim().to_string());
                        }
                        Ok(_) => warn!("empty correction reply, keeping original answer"),
                        Err(e) => warn!(error = %e, "correction call failed, keeping original answer"),
                    }
                }
                Ok(verification) => {
                    debug!(score = verification.score, "verification passed");
                }
                Err(e) => warn!(error = %e, "verifier failed, keeping original answer"),
            }
        }

        let score = evidence::score_state(state);
        let confidence = evidence::Confidence::from_score(score, &self.config);
        debug!(score, ?confidence, "evidence gate");
        evidence::apply_caveat(answer, confidence)
    }

    fn opening_prompt(&self, query: &str) -> String {
        let mut tools = String::new();
        for spec in tool_specs(&self.tools) {
            tools.push_str(&format!("- {}: {}\n", spec.name, spec.description));
        }
        format!(
            "Answer the question below by reasoning step by step. You may use \
             these tools:\n{tools}\n\
             To use a tool, reply with exactly one line of the form \
             ACTION: tool_name(arg=\"value\").\n\
             When you have the answer, reply with {FINAL_ANSWER_MARKER} followed \
             by the answer.\n\nQuestion: {query}"
        )
    }
}

/// Extract the text after a case-insensitive final-answer marker.
fn extract_final_answer(text: &str) -> Option<String> {
    let found = FINAL_ANSWER_RE.find(text)?;
    let answer = text[found.end()..].trim();
    if answer.is_empty() {
        None
    } else {
        Some(answer.to_string())
    }
}

/// Build a non-empty answer from whatever the session gathered:
/// observations first, then thoughts, then a canned clarification.
fn synthesize_answer(state: &AgentState) -> String {
    let usable_observation = state
        .context_gathered
        .iter()
        .rev()
        .find(|o| !o.trim().is_empty() && !o.starts_with("Error"));
    if let Some(observation) = usable_observation {
        return format!("Based on the information gathered:\n\n{observation}");
    }
    if let Some(thought) = state.thoughts.iter().rev().find(|t| !t.trim().is_empty()) {
        return thought.trim().to_string();
    }
    "I was unable to gather enough information to answer this question. \
     Could you rephrase it or narrow it down?"
        .to_string()
}

fn correction_prompt(answer: &str, gaps: &[String]) -> String {
    let gaps = if gaps.is_empty() {
        "- the answer may be incomplete or imprecise".to_string()
    } else {
        gaps.iter()
            .map(|g| format!("- {g}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "Your previous answer was:\n{answer}\n\nA review found these \
         gaps:\n{gaps}\n\nRewrite the answer to address them. Reply with \
         the revised answer only."
    )
}

/// Split text into chunks of at most `chunk_chars` characters, never
/// splitting inside a UTF-8 character.
fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
