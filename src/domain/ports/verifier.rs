//! Port for the optional verification/self-correction collaborator.

use async_trait::async_trait;

/// Result of scoring a tentative answer against its gathered context.
#[derive(Debug, Clone)]
pub struct Verification {
    /// The verifier's commentary or revised framing of the answer.
    pub response: String,
    /// Quality score in [0.0, 1.0]; below the engine's correction
    /// threshold triggers exactly one corrective re-prompt.
    pub score: f64,
    /// Specific gaps the corrective re-prompt should address.
    pub gaps: Vec<String>,
}

/// External collaborator that scores tentative final answers.
#[async_trait]
pub trait AnswerVerifier: Send + Sync {
    /// Score `answer` given the observations that produced it.
    async fn process(&self, answer: &str, context: &[String]) -> anyhow::Result<Verification>;
}
