// Gateway module for github - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod client;
mod files;
mod prefetch;
mod store;
mod types;

// Public re-exports - the ONLY way to access github functionality
pub use client::{GitHubClient, RepositoryContents};
pub use files::{
    default_put_message, open_file, put_file, remove_file, upload_folder, LocalFile, UploadFailure,
};
pub use prefetch::{gather_context, PrefetchOptions};
pub use store::ContentStore;
pub use types::{
    encode_content, FileIdentity, FileSet, RemoteFile, RepoInfo, RepoSnapshot, RepoSummary,
};

#[cfg(test)]
pub(crate) use store::memory;
