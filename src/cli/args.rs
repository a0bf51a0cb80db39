use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::http::HttpMethod;

#[derive(Parser, Debug)]
#[command(name = "apiprobe")]
#[command(version)]
#[command(about = "Send HTTP requests, find public APIs, and let an AI agent edit GitHub repositories", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one HTTP request and show the response
    Send(RequestArgs),
    /// Ask the model for public APIs matching a description
    Find {
        query: String,
        /// Send the Nth result (1-based) right away
        #[arg(long)]
        send: Option<usize>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Send a request and have the model explain the response
    Explain {
        #[command(flatten)]
        request: RequestArgs,
        /// Follow-up question about the response
        #[arg(short, long)]
        question: Option<String>,
    },
    /// Work with GitHub repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },
    /// Initialize configuration
    Init,
}

#[derive(Subcommand, Debug)]
pub enum RepoCommands {
    /// List your repositories, most recently updated first
    List,
    /// List every file of a repository
    Files {
        /// owner/name
        repo: String,
    },
    /// Execute an action plan (JSON array, optionally fenced) from a file or `-` for stdin
    Plan {
        repo: String,
        plan: String,
        /// Show the plan without touching the repository
        #[arg(long)]
        dry_run: bool,
    },
    /// Chat with the agent about a repository; lines are read from stdin
    Agent {
        repo: String,
        /// Execute proposed plans without asking
        #[arg(long)]
        yes: bool,
    },
    /// Print the AI prompt for editing one file, with the repository as context
    Context { repo: String, path: String },
    /// Chat with the model about one file, with the repository as context
    Ask { repo: String, path: String },
    /// Print one file of a repository
    Show { repo: String, path: String },
    /// Create or overwrite one file from a local file
    Put {
        repo: String,
        /// Path in the repository
        path: String,
        /// Local file to upload
        file: PathBuf,
        /// Commit message (default: `Update <path>` or `Add <name>`)
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Upload a local folder, one commit per file
    Upload {
        repo: String,
        dir: PathBuf,
        /// Folder in the repository to upload into
        #[arg(long, default_value = "")]
        to: String,
        /// Commit message; `{file}` and `{folder}` are filled in per file
        #[arg(short, long, default_value = "feat: Upload folder {folder}")]
        message: String,
        /// Also upload files matched by .gitignore
        #[arg(long)]
        all: bool,
    },
    /// Delete one file
    Rm {
        repo: String,
        path: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Have the model bundle the repository's web sources into one HTML preview
    Build {
        repo: String,
        #[arg(short, long, default_value = "preview.html")]
        output: PathBuf,
    },
    /// Create a repository with an initial commit
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long)]
        private: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    pub url: String,

    #[arg(short = 'X', long, default_value = "GET", value_parser = parse_method)]
    pub method: HttpMethod,

    /// `Key: Value`, added to the configured headers or replacing the value
    /// of one with the same name; prefix the key with `//` to keep it but not send it
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Keep a header but comment it out so it is not sent
    #[arg(long = "disable-header", value_name = "KEY")]
    pub disabled_headers: Vec<String>,

    /// Drop a header, including one from the configuration
    #[arg(long = "remove-header", value_name = "KEY")]
    pub removed_headers: Vec<String>,

    /// Request body, sent only with POST, PUT and PATCH
    #[arg(short = 'd', long, conflicts_with = "body_file")]
    pub body: Option<String>,

    #[arg(long)]
    pub body_file: Option<PathBuf>,

    /// `none`, `corsproxy`, `cors-anywhere` or a custom prefix
    #[arg(long)]
    pub proxy: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

fn parse_method(raw: &str) -> Result<HttpMethod, String> {
    raw.parse()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Text,
    /// JSON structured output
    Json,
}
