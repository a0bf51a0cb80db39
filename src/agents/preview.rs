use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::prompts::preview_build_prompt;
use crate::constants::{
    PREVIEW_EXCLUDED_PREFIXES, PREVIEW_HTML_START, PREVIEW_SOURCE_EXTENSIONS, PREVIEW_SOURCE_LIMIT,
};
use crate::github::{ContentStore, FileSet};
use crate::models::{ChatMessage, GenerationConfig, Model};
use crate::utils::ProbeError;

/// One source file handed to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

/// Web sources worth bundling: scripts, markup, styles and JSON, minus
/// lock files and build or dependency folders, at most the first 30
pub fn select_preview_sources(files: &FileSet) -> Vec<String> {
    files
        .paths()
        .filter(|path| {
            let lower = path.to_lowercase();
            PREVIEW_SOURCE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
                && !path.contains("lock")
                && !PREVIEW_EXCLUDED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
        })
        .take(PREVIEW_SOURCE_LIMIT)
        .map(str::to_string)
        .collect()
}

/// Read every selected file at once; a failed read becomes a comment
/// placeholder so the model still sees the path
pub async fn fetch_sources<S: ContentStore + ?Sized>(store: &S, paths: &[String]) -> Vec<SourceFile> {
    let reads = paths.iter().map(|path| async move {
        let content = match store.read_file(path).await.and_then(|file| file.decode_text()) {
            Ok(text) => text,
            Err(e) => {
                warn!("could not fetch {} for the preview: {}", path, e);
                format!("/* Error fetching {} */", path)
            }
        };
        SourceFile {
            path: path.clone(),
            content,
        }
    });
    join_all(reads).await
}

/// Accept the model output only when it is a complete HTML document
pub fn check_preview_html(text: &str) -> Result<String, ProbeError> {
    let trimmed = text.trim();
    if !trimmed.to_lowercase().starts_with(PREVIEW_HTML_START) {
        return Err(ProbeError::MalformedAiOutput(
            "the build did not return an HTML document; very complex projects or syntax errors in the sources can cause this, try again".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Have the model bundle the repository's web sources into one
/// self-contained `index.html`.
pub async fn build_preview<S: ContentStore + ?Sized>(
    model: &dyn Model,
    store: &S,
    files: &FileSet,
    temperature: f32,
) -> Result<String, ProbeError> {
    let paths = select_preview_sources(files);
    if paths.is_empty() {
        return Err(ProbeError::InvalidInput(
            "the repository has no web source files to build".to_string(),
        ));
    }
    info!("building a preview from {} source file(s)", paths.len());

    let sources = fetch_sources(store, &paths).await;
    let prompt = preview_build_prompt(&sources)?;
    debug!("preview prompt is {} chars", prompt.len());

    let config = GenerationConfig {
        temperature,
        google_search: false,
    };
    let response = model
        .generate(None, &[ChatMessage::user(prompt)], &config)
        .await?;
    check_preview_html(&response.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::memory::{MemoryStore, Op};
    use crate::github::FileIdentity;
    use crate::models::scripted::ScriptedModel;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_selects_web_sources_only() {
        let files: FileSet = [
            "README.md",
            "dist/bundle.js",
            "index.html",
            "node_modules/react/index.js",
            "package-lock.json",
            "package.json",
            "src/App.tsx",
            "src/logo.svg",
            "src/style.CSS",
        ]
        .into_iter()
        .map(|path| FileIdentity::new(path, "r"))
        .collect();

        assert_eq!(
            select_preview_sources(&files),
            ["index.html", "package.json", "src/App.tsx", "src/style.CSS"]
                .map(String::from)
                .to_vec()
        );
    }

    #[test]
    fn test_selection_is_capped() {
        let files: FileSet = (0..40)
            .map(|i| FileIdentity::new(format!("src/c{:02}.js", i), "r"))
            .collect();
        let selected = select_preview_sources(&files);
        assert_eq!(selected.len(), 30);
        assert_eq!(selected.last().map(String::as_str), Some("src/c29.js"));
    }

    #[test]
    fn test_html_check() {
        assert_eq!(
            check_preview_html("\n<!DOCTYPE html><html></html>\n").unwrap(),
            "<!DOCTYPE html><html></html>"
        );
        assert!(matches!(
            check_preview_html("```html\n<!DOCTYPE html>\n```"),
            Err(ProbeError::MalformedAiOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_source_becomes_placeholder() {
        let store = MemoryStore::with_files(&[("a.js", "let a = 1;"), ("b.js", "let b = 2;")]);
        store.fail_on(Op::Read, "b.js", 500);

        let sources = fetch_sources(&store, &["a.js".to_string(), "b.js".to_string()]).await;
        assert_eq!(sources[0].content, "let a = 1;");
        assert_eq!(sources[1].content, "/* Error fetching b.js */");
    }

    #[tokio::test]
    async fn test_build_sends_sources_without_search() {
        let store = MemoryStore::with_files(&[
            ("index.tsx", "createRoot(root).render(<App />)"),
            ("README.md", "# app"),
        ]);
        let files = store.snapshot();
        let model = ScriptedModel::new().reply("<!DOCTYPE html><html><body></body></html>");

        let html = build_preview(&model, &store, &files, 0.2).await.unwrap();
        assert!(html.ends_with("</html>"));

        let seen = model.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, None);
        let prompt = &seen[0].1[0].content;
        assert!(prompt.contains("\"path\": \"index.tsx\""));
        assert!(!prompt.contains("README.md"));
    }

    #[tokio::test]
    async fn test_build_without_sources_skips_model() {
        let store = MemoryStore::with_files(&[("README.md", "# docs")]);
        let files = store.snapshot();
        let model = ScriptedModel::new();

        let err = build_preview(&model, &store, &files, 0.2).await.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidInput(_)));
        assert!(model.seen().is_empty());
    }
}
