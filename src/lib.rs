pub mod agents;
pub mod app;
pub mod cli;
pub mod constants;
pub mod github;
pub mod http;
pub mod models;
pub mod runtime;
pub mod utils;

pub use app::{load_config, Config};
pub use http::{RequestDescriptor, RequestExecutor, ResponseRecord};
pub use utils::{ErrorRecord, ProbeError};
