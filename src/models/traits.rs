use async_trait::async_trait;

use super::types::{ChatMessage, GenerationConfig, ModelResponse};
use crate::utils::ProbeError;

/// Core trait that all model backends must implement
#[async_trait]
pub trait Model: Send + Sync {
    /// Generate the next model turn for a conversation
    async fn generate(
        &self,
        system_instruction: Option<&str>,
        history: &[ChatMessage],
        config: &GenerationConfig,
    ) -> Result<ModelResponse, ProbeError>;

    /// Get the name of the model
    fn name(&self) -> &str;
}
