use async_trait::async_trait;

use super::types::{FileIdentity, RemoteFile};
use crate::utils::ProbeError;

/// A remote content store with optimistic concurrency on writes.
///
/// Writes without a revision create a new file; writes and deletes with a
/// revision only succeed when it matches the store's current one.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<RemoteFile, ProbeError>;

    /// Returns the identity of the written file with its fresh revision
    async fn write_file(
        &self,
        path: &str,
        encoded_content: &str,
        message: &str,
        revision: Option<&str>,
    ) -> Result<FileIdentity, ProbeError>;

    async fn delete_file(&self, path: &str, revision: &str, message: &str)
        -> Result<(), ProbeError>;
}
