//! Generation capability trait: prompt → text.
//!
//! Both the Answerer and the Evaluator talk to a [`Generator`]. They may
//! hold different instances (a cheaper judge model, a deterministic stub in
//! tests); neither depends on the other's internal state.

use async_trait::async_trait;

use crate::error::CapabilityError;

/// A prompt: a system instruction plus the user-turn message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// External text-generation capability. No determinism is assumed across
/// calls with identical input.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.5-flash"`).
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &Prompt) -> Result<String, CapabilityError>;
}
