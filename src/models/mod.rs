// Gateway module for models - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod gemini;
mod session;
mod traits;
mod types;

// Public re-exports - the ONLY way to access model functionality
pub use gemini::{api_key_from_env, GeminiModel};
pub use session::ChatSession;
pub use traits::Model;
pub use types::{ChatMessage, Citation, GenerationConfig, MessageRole, ModelResponse};

#[cfg(test)]
pub(crate) use traits::scripted;
