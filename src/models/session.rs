use tracing::debug;

use super::traits::Model;
use super::types::{ChatMessage, GenerationConfig};
use crate::utils::ProbeError;

/// A conversation with one model.
///
/// History only grows on success: a failed send leaves it exactly as it
/// was, so the same message can be retried.
pub struct ChatSession {
    model: Box<dyn Model>,
    system_instruction: Option<String>,
    config: GenerationConfig,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(model: Box<dyn Model>, config: GenerationConfig) -> Self {
        Self {
            model,
            system_instruction: None,
            config,
            history: Vec::new(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Send a user turn and return the model's reply
    pub async fn send(&mut self, text: &str) -> Result<&ChatMessage, ProbeError> {
        self.history.push(ChatMessage::user(text));

        let result = self
            .model
            .generate(
                self.system_instruction.as_deref(),
                &self.history,
                &self.config,
            )
            .await;

        match result {
            Ok(response) => {
                debug!(
                    "{} replied with {} chars, {} citation(s)",
                    response.model_name,
                    response.text.len(),
                    response.citations.len()
                );
                self.history
                    .push(ChatMessage::model(response.text, response.citations));
                let index = self.history.len() - 1;
                Ok(&self.history[index])
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }
}
