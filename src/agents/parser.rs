use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::types::{AgentAction, AgentReply};
use crate::utils::ProbeError;

static JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```json\r?\n([\s\S]*?)\r?\n```").expect("hardcoded regex"));

/// The payload of the first fenced json block, or the whole trimmed text
pub fn extract_json_block(text: &str) -> &str {
    match JSON_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}

/// Decide whether an AI reply is an action plan or plain conversation.
///
/// Only an array whose items all carry a non-empty `action_type` and
/// `explanation` counts as a plan; anything else is conversation. A reply with that
/// shape that still does not describe valid actions is malformed.
pub fn parse_agent_reply(text: &str) -> Result<AgentReply, ProbeError> {
    let candidate = extract_json_block(text);
    if !candidate.starts_with('[') || !candidate.ends_with(']') {
        return Ok(AgentReply::Conversation(text.to_string()));
    }

    let items = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Array(items)) => items,
        _ => return Ok(AgentReply::Conversation(text.to_string())),
    };

    if items.is_empty() {
        return Ok(AgentReply::EmptyPlan);
    }

    let has_minimal_shape = items.iter().all(|item| {
        let field = |name: &str| {
            item.get(name)
                .and_then(Value::as_str)
                .map(|s| !s.is_empty())
                .unwrap_or(false)
        };
        field("action_type") && field("explanation")
    });
    if !has_minimal_shape {
        return Ok(AgentReply::Conversation(text.to_string()));
    }

    let actions = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<AgentAction>(item).map_err(|e| {
                ProbeError::MalformedAiOutput(format!("action {}: {}", index + 1, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AgentReply::Plan(actions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fenced_plan() {
        let reply = "```json\n[\n  {\"action_type\": \"CREATE_FILE\", \"file_path\": \"src/about.js\", \"content\": \"export {}\", \"explanation\": \"About page\"}\n]\n```";
        assert_eq!(
            parse_agent_reply(reply).unwrap(),
            AgentReply::Plan(vec![AgentAction::CreateFile {
                file_path: "src/about.js".to_string(),
                content: "export {}".to_string(),
                explanation: "About page".to_string(),
            }])
        );
    }

    #[test]
    fn test_bare_array_plan() {
        let reply = r#"  [{"action_type": "DELETE_FOLDER", "folder_path": "old", "explanation": "cleanup"}]  "#;
        assert!(matches!(parse_agent_reply(reply).unwrap(), AgentReply::Plan(ref a) if a.len() == 1));
    }

    #[test]
    fn test_conversation() {
        let text = "Sure! I will create `src/about.js` and link it from App. Shall I go ahead?";
        assert_eq!(
            parse_agent_reply(text).unwrap(),
            AgentReply::Conversation(text.to_string())
        );
    }

    #[test]
    fn test_broken_json_is_conversation() {
        let text = "```json\n[{\"action_type\": \"CREATE_FILE\",]\n```";
        assert!(matches!(
            parse_agent_reply(text).unwrap(),
            AgentReply::Conversation(_)
        ));
    }

    #[test]
    fn test_missing_explanation_is_conversation() {
        let text = r#"[{"action_type": "DELETE_FILE", "file_path": "a.txt"}]"#;
        assert!(matches!(
            parse_agent_reply(text).unwrap(),
            AgentReply::Conversation(_)
        ));
    }

    #[test]
    fn test_blank_explanation_is_conversation() {
        let text = r#"[{"action_type": "DELETE_FILE", "file_path": "a", "explanation": ""}]"#;
        assert_eq!(
            parse_agent_reply(text).unwrap(),
            AgentReply::Conversation(text.to_string())
        );

        let text = r#"[{"action_type": "", "file_path": "a", "explanation": "remove a"}]"#;
        assert!(matches!(
            parse_agent_reply(text).unwrap(),
            AgentReply::Conversation(_)
        ));
    }

    #[test]
    fn test_fence_with_crlf() {
        assert_eq!(extract_json_block("intro\r\n```json\r\n[1]\r\n```\r\nbye"), "[1]");
        assert_eq!(extract_json_block("  plain  "), "plain");
    }

    #[test]
    fn test_empty_plan() {
        assert_eq!(parse_agent_reply("```json\n[]\n```").unwrap(), AgentReply::EmptyPlan);
    }

    #[test]
    fn test_shape_without_paths_is_malformed() {
        let text = r#"[{"action_type": "UPDATE_FILE", "explanation": "no path"}]"#;
        assert!(matches!(
            parse_agent_reply(text),
            Err(ProbeError::MalformedAiOutput(_))
        ));

        let text = r#"[{"action_type": "RENAME_REPO", "explanation": "??"}]"#;
        assert!(matches!(
            parse_agent_reply(text),
            Err(ProbeError::MalformedAiOutput(_))
        ));
    }
}
