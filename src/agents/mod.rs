// Gateway module for agents - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod finder;
mod parser;
mod plan_executor;
mod preview;
mod prompts;
mod types;

// Public re-exports - the ONLY way to access agent functionality
pub use finder::{parse_found_apis, FoundApi};
pub use parser::{extract_json_block, parse_agent_reply};
pub use plan_executor::{execute_plan, PlanExecutor};
pub use preview::build_preview;
pub use prompts::{
    explain_response_prompt, file_assist_prompt, finder_prompt, repo_agent_instruction,
};
pub use types::{AgentAction, AgentReply, PlanFailure, PlanReport, StepOutcome, StepStatus};
