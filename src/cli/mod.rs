/// CLI argument parsing and command handling - Gateway
mod args;
mod commands;
mod local;
mod render;

pub use args::{Cli, Commands, OutputFormat, RepoCommands, RequestArgs};
pub use commands::handle_command;
