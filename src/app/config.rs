use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CONTEXT_CHAR_LIMIT, DEFAULT_COMMIT_PREFIX, DEFAULT_GITHUB_API_BASE, DEFAULT_MODEL_API_BASE,
    DEFAULT_MODEL_API_KEY_ENV, DEFAULT_MODEL_NAME, DEFAULT_TEMPERATURE, JSON_CONTENT_TYPE,
    PREFETCH_BATCH_SIZE,
};
use crate::github::PrefetchOptions;
use crate::http::{KeyValueList, ProxySetting};
use crate::models::GenerationConfig;

const LOCAL_CONFIG: &str = ".apiprobe/config.toml";
const ENV_PREFIX: &str = "APIPROBE_";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub github: GitHubSettings,

    #[serde(default)]
    pub model: ModelSettings,
}

/// Request defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// `none`, `corsproxy`, `cors-anywhere` or a custom prefix
    pub default_proxy: ProxySetting,
    /// No timeout unless set
    pub timeout_secs: Option<u64>,
    /// Headers every request starts with
    pub default_headers: Vec<HeaderSetting>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            default_proxy: ProxySetting::None,
            timeout_secs: None,
            default_headers: vec![HeaderSetting {
                key: "Content-Type".to_string(),
                value: JSON_CONTENT_TYPE.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSetting {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubSettings {
    pub api_base: String,
    /// Environment variable holding the personal access token
    pub token_env: String,
    pub commit_prefix: String,
    pub prefetch_batch_size: usize,
    pub context_char_limit: usize,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            commit_prefix: DEFAULT_COMMIT_PREFIX.to_string(),
            prefetch_batch_size: PREFETCH_BATCH_SIZE,
            context_char_limit: CONTEXT_CHAR_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Only `gemini` is supported
    pub provider: String,
    pub name: String,
    pub api_base: String,
    /// Environment variable containing API key
    pub api_key_env: String,
    pub temperature: f32,
    pub google_search: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            name: DEFAULT_MODEL_NAME.to_string(),
            api_base: DEFAULT_MODEL_API_BASE.to_string(),
            api_key_env: DEFAULT_MODEL_API_KEY_ENV.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            google_search: true,
        }
    }
}

impl Config {
    /// The configured headers as an editable list
    pub fn default_headers(&self) -> KeyValueList {
        self.http
            .default_headers
            .iter()
            .map(|h| (h.key.clone(), h.value.clone()))
            .collect()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.http.timeout_secs.map(Duration::from_secs)
    }

    pub fn prefetch_options(&self) -> PrefetchOptions {
        PrefetchOptions {
            batch_size: self.github.prefetch_batch_size,
            char_limit: self.github.context_char_limit,
        }
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.model.temperature,
            google_search: self.model.google_search,
        }
    }

    /// Read the GitHub token from the configured variable
    pub fn github_token(&self) -> Result<String> {
        std::env::var(&self.github.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .with_context(|| {
                format!(
                    "no GitHub token found; set {} to a personal access token with repo scope",
                    self.github.token_env
                )
            })
    }
}

/// Load configuration from multiple sources.
///
/// With an explicit path only that file is layered over the defaults;
/// otherwise the global file, then `.apiprobe/config.toml`. Environment
/// variables (`APIPROBE_GITHUB__TOKEN_ENV=...`) win over both.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let files = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file {} does not exist", path.display());
            }
            vec![path.to_path_buf()]
        }
        None => {
            let mut files = Vec::new();
            if let Ok(dir) = get_config_dir() {
                files.push(dir.join("config.toml"));
            }
            files.push(PathBuf::from(LOCAL_CONFIG));
            files
        }
    };
    load_from(&files)
}

fn load_from(files: &[PathBuf]) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    for file in files.iter().filter(|f| f.exists()) {
        figment = figment.merge(Toml::file(file));
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    figment
        .extract()
        .context("Failed to load configuration")
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "apiprobe") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        // Fallback to home directory
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("apiprobe");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Write the default global config and a local example; returns files created
pub fn init_config() -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();

    let config_file = get_config_dir()?.join("config.toml");
    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
        created.push(config_file);
    }

    let local_example = PathBuf::from(format!("{}.example", LOCAL_CONFIG));
    if !local_example.exists() {
        if let Some(parent) = local_example.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let example_config = r#"# apiprobe project configuration
# Overrides the global settings for this directory

[http]
default_proxy = "corsproxy"
timeout_secs = 30

[github]
token_env = "GITHUB_TOKEN"
commit_prefix = "AI Agent"

[model]
name = "gemini-2.5-flash"
temperature = 0.2
"#;
        std::fs::write(&local_example, example_config)?;
        created.push(local_example);
    }

    Ok(created)
}
