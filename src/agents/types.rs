use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{ErrorRecord, ProbeError};

/// A file-level operation proposed by the AI agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentAction {
    CreateFile {
        file_path: String,
        #[serde(default)]
        content: String,
        explanation: String,
    },
    UpdateFile {
        file_path: String,
        #[serde(default)]
        content: String,
        explanation: String,
    },
    DeleteFile {
        file_path: String,
        explanation: String,
    },
    DeleteFolder {
        folder_path: String,
        explanation: String,
    },
    MoveFile {
        source_path: String,
        destination_path: String,
        explanation: String,
    },
    /// Parsed so the plan can be shown, but never executed
    MoveFolder {
        source_path: String,
        destination_path: String,
        explanation: String,
    },
    /// Parsed so the plan can be shown, but never executed
    CopyFile {
        source_path: String,
        destination_path: String,
        explanation: String,
    },
    /// Parsed so the plan can be shown, but never executed
    CopyFolder {
        source_path: String,
        destination_path: String,
        explanation: String,
    },
}

impl AgentAction {
    pub fn action_type(&self) -> &'static str {
        match self {
            AgentAction::CreateFile { .. } => "CREATE_FILE",
            AgentAction::UpdateFile { .. } => "UPDATE_FILE",
            AgentAction::DeleteFile { .. } => "DELETE_FILE",
            AgentAction::DeleteFolder { .. } => "DELETE_FOLDER",
            AgentAction::MoveFile { .. } => "MOVE_FILE",
            AgentAction::MoveFolder { .. } => "MOVE_FOLDER",
            AgentAction::CopyFile { .. } => "COPY_FILE",
            AgentAction::CopyFolder { .. } => "COPY_FOLDER",
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            AgentAction::CreateFile { explanation, .. }
            | AgentAction::UpdateFile { explanation, .. }
            | AgentAction::DeleteFile { explanation, .. }
            | AgentAction::DeleteFolder { explanation, .. }
            | AgentAction::MoveFile { explanation, .. }
            | AgentAction::MoveFolder { explanation, .. }
            | AgentAction::CopyFile { explanation, .. }
            | AgentAction::CopyFolder { explanation, .. } => explanation,
        }
    }

    /// The path (or `source → destination`) the action targets
    pub fn target(&self) -> String {
        match self {
            AgentAction::CreateFile { file_path, .. }
            | AgentAction::UpdateFile { file_path, .. }
            | AgentAction::DeleteFile { file_path, .. } => file_path.clone(),
            AgentAction::DeleteFolder { folder_path, .. } => folder_path.clone(),
            AgentAction::MoveFile {
                source_path,
                destination_path,
                ..
            }
            | AgentAction::MoveFolder {
                source_path,
                destination_path,
                ..
            }
            | AgentAction::CopyFile {
                source_path,
                destination_path,
                ..
            }
            | AgentAction::CopyFolder {
                source_path,
                destination_path,
                ..
            } => format!("{} → {}", source_path, destination_path),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(
            self,
            AgentAction::MoveFolder { .. } | AgentAction::CopyFile { .. } | AgentAction::CopyFolder { .. }
        )
    }
}

impl fmt::Display for AgentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action_type().replace('_', " "), self.target())
    }
}

/// How an AI reply should be treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentReply {
    /// A non-empty action plan awaiting execution
    Plan(Vec<AgentAction>),
    /// The model answered with an empty action array
    EmptyPlan,
    /// Ordinary conversational text
    Conversation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Applied,
    /// Nothing to do, e.g. deleting a file that is already gone
    Skipped,
}

/// Record of one finished plan step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// 1-based
    pub step: usize,
    pub action: String,
    pub status: StepStatus,
    pub detail: String,
}

/// Result of a fully applied plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanReport {
    pub steps: Vec<StepOutcome>,
}

/// A plan stopped at `step`; earlier steps remain applied
#[derive(Debug)]
pub struct PlanFailure {
    /// 1-based
    pub step: usize,
    pub action: String,
    pub reason: ProbeError,
    pub completed: Vec<StepOutcome>,
}

impl PlanFailure {
    pub fn to_record(&self) -> ErrorRecord {
        ErrorRecord {
            message: self.to_string(),
        }
    }
}

impl fmt::Display for PlanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Execution failed at step {} ({}): {}",
            self.step, self.action, self.reason
        )
    }
}

impl std::error::Error for PlanFailure {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_tagged_action() {
        let action: AgentAction = serde_json::from_str(
            r#"{"action_type": "MOVE_FILE", "source_path": "a.rs", "destination_path": "b/a.rs", "explanation": "tidy"}"#,
        )
        .unwrap();
        assert_eq!(
            action,
            AgentAction::MoveFile {
                source_path: "a.rs".to_string(),
                destination_path: "b/a.rs".to_string(),
                explanation: "tidy".to_string(),
            }
        );
        assert_eq!(action.target(), "a.rs → b/a.rs");
    }

    #[test]
    fn test_create_without_content_defaults_empty() {
        let action: AgentAction = serde_json::from_str(
            r#"{"action_type": "CREATE_FILE", "file_path": ".gitkeep", "explanation": "placeholder"}"#,
        )
        .unwrap();
        assert!(matches!(action, AgentAction::CreateFile { ref content, .. } if content.is_empty()));
    }

    #[test]
    fn test_unsupported_kinds() {
        let copy = AgentAction::CopyFile {
            source_path: "a".to_string(),
            destination_path: "b".to_string(),
            explanation: String::new(),
        };
        assert!(!copy.is_supported());
        assert_eq!(copy.to_string(), "COPY FILE a → b");
    }
}
