/// Runtime module - Gateway

mod repo_agent;

pub use repo_agent::{AgentTurn, RepoAgent};
