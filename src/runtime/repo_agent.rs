use tracing::{info, warn};

use crate::agents::{
    parse_agent_reply, repo_agent_instruction, AgentAction, AgentReply, PlanExecutor, PlanFailure,
    PlanReport,
};
use crate::github::{ContentStore, FileSet};
use crate::models::{ChatMessage, ChatSession, GenerationConfig, Model};
use crate::utils::ProbeError;

/// One model turn, classified
#[derive(Debug, Clone)]
pub struct AgentTurn {
    pub reply: AgentReply,
    /// The model message as stored in the conversation
    pub message: ChatMessage,
}

/// Conversation with the model about one repository, plus the plan it
/// proposes and the file mirror that plan is executed against.
pub struct RepoAgent<S: ContentStore> {
    session: ChatSession,
    store: S,
    files: FileSet,
    commit_prefix: String,
    pending: Option<Vec<AgentAction>>,
}

impl<S: ContentStore> RepoAgent<S> {
    pub fn new(
        model: Box<dyn Model>,
        config: GenerationConfig,
        store: S,
        repo: &str,
        files: FileSet,
        commit_prefix: impl Into<String>,
    ) -> Self {
        let session =
            ChatSession::new(model, config).with_system_instruction(repo_agent_instruction(repo, &files));
        Self {
            session,
            store,
            files,
            commit_prefix: commit_prefix.into(),
            pending: None,
        }
    }

    /// Send a user message; a reply holding actions becomes the pending plan
    pub async fn send(&mut self, text: &str) -> Result<AgentTurn, ProbeError> {
        let message = self.session.send(text).await?.clone();
        let reply = parse_agent_reply(&message.content)?;

        self.pending = match &reply {
            AgentReply::Plan(actions) => {
                info!("model proposed {} action(s)", actions.len());
                Some(actions.clone())
            }
            _ => None,
        };

        Ok(AgentTurn { reply, message })
    }

    pub fn pending_plan(&self) -> Option<&[AgentAction]> {
        self.pending.as_deref()
    }

    pub fn discard_plan(&mut self) {
        self.pending = None;
    }

    /// Run the pending plan against the store.
    ///
    /// The plan is consumed either way; re-running a failed plan would
    /// repeat the steps that already went through.
    pub async fn execute_pending(&mut self) -> Result<PlanReport, PlanFailure> {
        let Some(plan) = self.pending.take() else {
            warn!("no pending plan to execute");
            return Ok(PlanReport::default());
        };

        PlanExecutor::new(&self.store, self.commit_prefix.as_str())
            .execute(&plan, &mut self.files)
            .await
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn history(&self) -> &[ChatMessage] {
        self.session.history()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::memory::MemoryStore;
    use crate::models::scripted::ScriptedModel;
    use pretty_assertions::assert_eq;

    const PLAN: &str = "```json\n[{\"action_type\": \"CREATE_FILE\", \"file_path\": \"src/about.js\", \"content\": \"about\", \"explanation\": \"About page\"}]\n```";

    fn agent(model: ScriptedModel, store: MemoryStore) -> RepoAgent<MemoryStore> {
        let files = store.snapshot();
        RepoAgent::new(
            Box::new(model),
            GenerationConfig::default(),
            store,
            "octo/app",
            files,
            "AI Agent",
        )
    }

    #[tokio::test]
    async fn test_conversation_then_plan_then_execute() {
        let model = ScriptedModel::new()
            .reply("I will add src/about.js. Shall I go ahead?")
            .reply(PLAN);
        let mut agent = agent(model.clone(), MemoryStore::with_files(&[("README.md", "hi")]));

        let turn = agent.send("add an about page").await.unwrap();
        assert!(matches!(turn.reply, AgentReply::Conversation(_)));
        assert!(agent.pending_plan().is_none());

        let turn = agent.send("go ahead").await.unwrap();
        assert!(matches!(turn.reply, AgentReply::Plan(_)));
        assert_eq!(agent.pending_plan().unwrap().len(), 1);

        let report = agent.execute_pending().await.unwrap();
        assert_eq!(report.steps.len(), 1);
        assert!(agent.files().contains("src/about.js"));
        assert!(agent.pending_plan().is_none());

        let system = model.seen()[0].0.clone().unwrap();
        assert!(system.contains("- README.md"));
    }

    #[tokio::test]
    async fn test_failed_plan_is_consumed() {
        let model = ScriptedModel::new().reply(PLAN);
        let mut agent = agent(model, MemoryStore::with_files(&[("src/about.js", "old")]));

        agent.send("do it").await.unwrap();
        let failure = agent.execute_pending().await.unwrap_err();
        assert_eq!(failure.step, 1);
        assert!(agent.pending_plan().is_none());
    }

    #[tokio::test]
    async fn test_empty_plan_and_model_failure() {
        let model = ScriptedModel::new().reply("[]").fail("unavailable");
        let mut agent = agent(model, MemoryStore::with_files(&[]));

        let turn = agent.send("anything").await.unwrap();
        assert_eq!(turn.reply, AgentReply::EmptyPlan);

        assert!(agent.send("again").await.is_err());
        assert_eq!(agent.history().len(), 2);
        assert!(agent.execute_pending().await.unwrap().steps.is_empty());
    }
}
