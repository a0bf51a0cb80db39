use futures::future::join_all;
use tracing::{debug, warn};

use super::store::ContentStore;
use super::types::FileSet;
use crate::constants::{
    CONTEXT_CHAR_LIMIT, CONTEXT_TRUNCATE_MARGIN, CONTEXT_TRUNCATE_MIN_REMAINING,
    PREFETCH_BATCH_SIZE, PREFETCH_IGNORED_EXTENSIONS, PREFETCH_IGNORED_FILES,
};

#[derive(Debug, Clone, Copy)]
pub struct PrefetchOptions {
    /// Concurrent reads per batch
    pub batch_size: usize,
    pub char_limit: usize,
}

impl Default for PrefetchOptions {
    fn default() -> Self {
        Self {
            batch_size: PREFETCH_BATCH_SIZE,
            char_limit: CONTEXT_CHAR_LIMIT,
        }
    }
}

/// Lock files and binary assets carry no useful context
pub fn is_context_candidate(path: &str) -> bool {
    let lower = path.to_lowercase();
    !PREFETCH_IGNORED_FILES.iter().any(|f| lower.ends_with(f))
        && !PREFETCH_IGNORED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn file_section(path: &str, content: &str) -> String {
    format!("\n\n--- FILE: {} ---\n```\n{}\n```\n", path, content)
}

/// Collect repository file contents into one prompt-sized string.
///
/// The file being edited comes first. Other files are read in concurrent
/// batches; unreadable files are skipped. Reads only, the file set is
/// never modified.
pub async fn gather_context<S: ContentStore + ?Sized>(
    store: &S,
    files: &FileSet,
    current: Option<(&str, &str)>,
    options: PrefetchOptions,
) -> String {
    let mut combined = match current {
        Some((path, content)) => format!(
            "The user is currently editing this file. Its content is most important.\n\n--- CURRENT FILE: {} ---\n```\n{}\n```\n",
            path, content
        ),
        None => String::new(),
    };
    let current_path = current.map(|(path, _)| path);

    let others: Vec<&str> = files
        .paths()
        .filter(|path| Some(*path) != current_path && is_context_candidate(path))
        .collect();

    'batches: for batch in others.chunks(options.batch_size.max(1)) {
        if combined.len() >= options.char_limit {
            break;
        }

        let reads = batch.iter().map(|path| async move {
            match store.read_file(path).await.and_then(|file| file.decode_text()) {
                Ok(text) => Some((*path, text)),
                Err(e) => {
                    warn!("could not fetch {} for context: {}", path, e);
                    None
                }
            }
        });

        for (path, content) in join_all(reads).await.into_iter().flatten() {
            if combined.len() >= options.char_limit {
                continue;
            }

            let section = file_section(path, &content);
            if combined.len() + section.len() > options.char_limit {
                let remaining = options.char_limit - combined.len();
                if remaining > CONTEXT_TRUNCATE_MIN_REMAINING {
                    let cut = floor_char_boundary(&content, remaining - CONTEXT_TRUNCATE_MARGIN);
                    combined.push_str(&format!(
                        "\n\n--- FILE: {} ---\n```\n{}\n... (file truncated)\n```\n",
                        path,
                        &content[..cut]
                    ));
                }
                break 'batches;
            }
            combined.push_str(&section);
        }
    }

    debug!("gathered {} chars of repository context", combined.len());
    combined
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut i = index;
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}
