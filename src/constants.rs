/// Constants module to avoid magic numbers in the codebase

// Request construction
pub const DEFAULT_SCHEME_PREFIX: &str = "https://";
pub const HEADER_COMMENT_MARKER: &str = "//";
pub const JSON_CONTENT_TYPE: &str = "application/json";

// Well-known CORS proxies
pub const CORSPROXY_IO_PREFIX: &str = "https://corsproxy.io/?";
pub const CORS_ANYWHERE_PREFIX: &str = "https://cors-anywhere.herokuapp.com/";

// GitHub
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
pub const GITHUB_USER_AGENT: &str = concat!("apiprobe/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_COMMIT_PREFIX: &str = "AI Agent";
pub const REPO_LIST_PAGE_SIZE: usize = 100;

// Context prefetch
pub const PREFETCH_BATCH_SIZE: usize = 10;
pub const CONTEXT_CHAR_LIMIT: usize = 150_000;
pub const CONTEXT_TRUNCATE_MIN_REMAINING: usize = 200;
pub const CONTEXT_TRUNCATE_MARGIN: usize = 150;

pub const PREFETCH_IGNORED_FILES: &[&str] = &["package-lock.json", "yarn.lock", "pnpm-lock.yaml"];

pub const PREFETCH_IGNORED_EXTENSIONS: &[&str] = &[
    ".svg", ".png", ".jpg", ".jpeg", ".gif", ".ico", ".webp", ".pdf", ".zip", ".gz",
];

// Model
pub const DEFAULT_MODEL_NAME: &str = "gemini-2.5-flash";
pub const DEFAULT_MODEL_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL_API_KEY_ENV: &str = "API_KEY";
pub const FALLBACK_MODEL_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

// Build preview
pub const PREVIEW_SOURCE_LIMIT: usize = 30;
pub const PREVIEW_SOURCE_EXTENSIONS: &[&str] = &[".js", ".ts", ".jsx", ".tsx", ".html", ".css", ".json"];
pub const PREVIEW_EXCLUDED_PREFIXES: &[&str] = &["dist/", "node_modules/"];
pub const PREVIEW_HTML_START: &str = "<!doctype html>";
