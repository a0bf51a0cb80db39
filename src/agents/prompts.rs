use super::preview::SourceFile;
use crate::github::FileSet;
use crate::http::ResponseRecord;
use crate::utils::ProbeError;

fn file_tree(files: &FileSet) -> String {
    files
        .paths()
        .map(|path| format!("- {}", path))
        .collect::<Vec<_>>()
        .join("\n")
}

/// System instruction for the repository agent.
///
/// The agent discusses a plan first and only answers with a bare JSON
/// action array once the user has approved it.
pub fn repo_agent_instruction(repo: &str, files: &FileSet) -> String {
    format!(
        r#"You are an expert software engineer helping the user modify a GitHub repository.

WORKFLOW (follow it for every change request):
1. Propose the plan. Reply conversationally: acknowledge the request, list the steps you will take and why, and end by asking the user to confirm. Never include a JSON block in this reply.
2. Execute the plan. Only after the user explicitly approves, reply with a single ```json code block containing the array of actions and nothing else.

JSON ACTIONS (each object needs "action_type" and "explanation"):
- CREATE_FILE / UPDATE_FILE: "file_path", "content" (the complete file)
- DELETE_FILE: "file_path"
- DELETE_FOLDER: "folder_path"
- MOVE_FILE: "source_path", "destination_path"
Folder moves and copies are not supported; split them into file operations.

Example:
```json
[
  {{
    "action_type": "CREATE_FILE",
    "file_path": "src/about.js",
    "content": "export default function About() {{ return <h1>About</h1>; }}",
    "explanation": "Create the About page component."
  }}
]
```

If you search the web, cite your sources.

REPOSITORY: {repo}
FILES:
{tree}

You do not have the contents of these files. Base the plan on their paths and reasonable assumptions."#,
        repo = repo,
        tree = file_tree(files),
    )
}

/// Prompt asking the model to search for public APIs matching `query`
pub fn finder_prompt(query: &str) -> String {
    format!(
        r#"Find public APIs that directly match this query: "{query}".

Rules:
- Only return highly relevant APIs. Zero results is better than irrelevant ones.
- "url" must be a live, callable endpoint, never a documentation or sign-up page.
- Use web search to confirm the API is still active.
- Prefer free APIs without keys or OAuth. If a simple key is needed, say so in the usage explanation.

Reply with a single ```json code block holding an array and no other text. Return [] when nothing fits.
Each object has:
- "name": short descriptive name
- "description": one sentence
- "url": full callable endpoint
- "method": GET, POST, PUT, PATCH or DELETE
- "headers": object of required headers, {{}} if none
- "body": example request body as a string, "" if none
- "usage_explanation": how to call it, important parameters, whether a key is needed
- "test_in_app_example": one sentence on how to try it"#,
        query = query
    )
}

/// Prompt asking for a developer-facing summary of a response
pub fn explain_response_prompt(record: &ResponseRecord, question: Option<&str>) -> String {
    let headers = serde_json::to_string_pretty(&record.headers).unwrap_or_default();
    let mut prompt = format!(
        "Analyze this API response and give a brief, helpful summary for a developer. \
Explain what the status code means, what kind of data the body holds, and anything to watch out for.\n\n\
Status: {} {}\n\nHeaders:\n```json\n{}\n```\n\nBody:\n```\n{}\n```\n",
        record.status,
        record.status_text,
        headers,
        record.body.to_display_string()
    );
    if let Some(question) = question.filter(|q| !q.trim().is_empty()) {
        prompt.push_str(&format!("\nThe developer also asks: {}\n", question.trim()));
    }
    prompt
}

/// Opening prompt for editing one file with the rest of the repository as context
pub fn file_assist_prompt(repo: &str, file_path: &str, files: &FileSet, context: &str) -> String {
    format!(
        r#"You are an expert software engineer with context of an entire repository.
Help me modify the file I have open: `{path}`.

- When I ask for code changes, answer with the complete updated content of `{path}` in a single code block and nothing else.
- If other files also need changes, describe them in plain English first. You cannot edit them directly.
- If you search the web, cite your sources.
- Keep explanations brief.

REPOSITORY: {repo}
FILES:
{tree}
FILE CONTENTS:
{context}

Start with a brief, one-paragraph summary of what `{path}` does within the project."#,
        path = file_path,
        repo = repo,
        tree = file_tree(files),
        context = context,
    )
}

/// Prompt turning a set of web sources into one runnable HTML document
pub fn preview_build_prompt(sources: &[SourceFile]) -> Result<String, ProbeError> {
    Ok(format!(
        r#"You are an in-memory web application bundler and transpiler. Turn the source files of a web project (React, TypeScript and JSX are possible) into one self-contained `index.html` that runs in a browser sandbox.

BUILD STEPS:
1. Find the entry point, usually `index.tsx` or `main.tsx`, which bootstraps the app (for example with `ReactDOM.createRoot`).
2. Transpile every .js, .ts, .jsx and .tsx file to browser-compatible JavaScript (ESM) and bundle it into a single `<script type="module">`, ordered so dependencies come first.
   - Rewrite bare package imports to the esm.sh CDN: `import React from 'react';` becomes `import React from 'https://esm.sh/react';`.
   - Inline local imports such as `import App from './App';` into the bundle.
3. Collect all CSS, from .css files or CDN links in an existing index.html, into one `<style>` tag in the `<head>`.
4. Emit a standard HTML5 document: `<head>` with the style and meta tags, `<body>` with the root element (usually `<div id="root"></div>`) and the script at the very end.

OUTPUT: only the raw HTML. No markdown fences, no JSON, no commentary. Start with `<!DOCTYPE html>` and end with `</html>`.

PROJECT SOURCE FILES:
{sources}

Generate the complete, runnable index.html now."#,
        sources = serde_json::to_string_pretty(sources)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::FileIdentity;
    use crate::http::ResponseBody;
    use std::collections::BTreeMap;

    #[test]
    fn test_agent_instruction_lists_files() {
        let files: FileSet = vec![
            FileIdentity::new("src/App.js", "a"),
            FileIdentity::new("README.md", "b"),
        ]
        .into_iter()
        .collect();
        let prompt = repo_agent_instruction("octo/app", &files);
        assert!(prompt.contains("REPOSITORY: octo/app"));
        assert!(prompt.contains("- README.md\n- src/App.js"));
        assert!(prompt.contains("\"action_type\": \"CREATE_FILE\""));
    }

    #[test]
    fn test_file_assist_prompt() {
        let files: FileSet = vec![
            FileIdentity::new("src/App.js", "a"),
            FileIdentity::new("src/index.js", "b"),
        ]
        .into_iter()
        .collect();
        let prompt = file_assist_prompt("octo/app", "src/App.js", &files, "--- CURRENT FILE ---");
        assert!(prompt.contains("Help me modify the file I have open: `src/App.js`."));
        assert!(prompt.contains("- src/App.js\n- src/index.js"));
        assert!(prompt.contains("FILE CONTENTS:\n--- CURRENT FILE ---"));
        assert!(prompt.ends_with("what `src/App.js` does within the project."));
    }

    #[test]
    fn test_preview_prompt_embeds_sources() {
        let sources = vec![SourceFile {
            path: "index.tsx".to_string(),
            content: "render(<App />)".to_string(),
        }];
        let prompt = preview_build_prompt(&sources).unwrap();
        assert!(prompt.contains("\"path\": \"index.tsx\""));
        assert!(prompt.contains("\"content\": \"render(<App />)\""));
        assert!(prompt.contains("Start with `<!DOCTYPE html>`"));
    }

    #[test]
    fn test_explain_prompt_includes_question() {
        let record = ResponseRecord {
            status: 404,
            status_text: "Not Found".to_string(),
            headers: BTreeMap::from([("content-type".to_string(), "text/plain".to_string())]),
            body: ResponseBody::Text("missing".to_string()),
            elapsed_ms: 12,
        };
        let prompt = explain_response_prompt(&record, Some("why?"));
        assert!(prompt.contains("Status: 404 Not Found"));
        assert!(prompt.contains("\"content-type\": \"text/plain\""));
        assert!(prompt.contains("missing"));
        assert!(prompt.ends_with("The developer also asks: why?\n"));

        assert!(!explain_response_prompt(&record, Some("  ")).contains("also asks"));
    }
}
