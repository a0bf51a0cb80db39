use thiserror::Error;
use tracing::{debug, info};

use super::store::ContentStore;
use super::types::{encode_bytes, FileIdentity, FileSet, RemoteFile};
use crate::utils::ProbeError;

/// A local file to push, addressed relative to the folder that was picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Starts with the picked folder's own name, `/`-separated
    pub relative_path: String,
    pub bytes: Vec<u8>,
}

/// A folder upload stopped at `path`; files before it stay uploaded
#[derive(Debug, Error)]
#[error("Failed to upload {path} ({uploaded} file(s) already uploaded): {reason}")]
pub struct UploadFailure {
    pub path: String,
    pub uploaded: usize,
    pub reason: ProbeError,
}

/// Trim, drop empty segments and reject paths that name nothing
pub fn normalize_repo_path(path: &str) -> Result<String, ProbeError> {
    let joined = path
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        return Err(ProbeError::InvalidInput(format!(
            "'{}' is not a file path",
            path
        )));
    }
    Ok(joined)
}

/// Read a file the mirror knows about
pub async fn open_file<S: ContentStore + ?Sized>(
    store: &S,
    files: &FileSet,
    path: &str,
) -> Result<RemoteFile, ProbeError> {
    if !files.contains(path) {
        return Err(ProbeError::NotFound(path.to_string()));
    }
    store.read_file(path).await
}

/// `Update <path>` for a file the mirror has, `Add <file name>` otherwise
pub fn default_put_message(files: &FileSet, path: &str) -> String {
    if files.contains(path) {
        format!("Update {}", path)
    } else {
        let name = path.rsplit('/').next().unwrap_or(path);
        format!("Add {}", name)
    }
}

/// Create or overwrite one file.
///
/// A path the mirror already holds is written against its recorded
/// revision, so a file changed remotely since the listing is a conflict.
pub async fn put_file<S: ContentStore + ?Sized>(
    store: &S,
    files: &mut FileSet,
    path: &str,
    bytes: &[u8],
    message: &str,
) -> Result<FileIdentity, ProbeError> {
    let path = normalize_repo_path(path)?;
    let revision = files.get(&path).map(|existing| existing.revision);
    debug!(
        "writing {} ({} bytes, {})",
        path,
        bytes.len(),
        if revision.is_some() { "update" } else { "create" }
    );

    let identity = store
        .write_file(&path, &encode_bytes(bytes), message, revision.as_deref())
        .await?;
    files.upsert(identity.clone());
    Ok(identity)
}

/// Delete one file with the revision the mirror holds
pub async fn remove_file<S: ContentStore + ?Sized>(
    store: &S,
    files: &mut FileSet,
    path: &str,
) -> Result<(), ProbeError> {
    let identity = files
        .get(path)
        .ok_or_else(|| ProbeError::NotFound(path.to_string()))?;
    store
        .delete_file(path, &identity.revision, &format!("Delete file: {}", path))
        .await?;
    files.remove(path);
    Ok(())
}

/// Where a local file lands: `base/relative`, slashes collapsed
pub fn upload_target(base: &str, relative_path: &str) -> Result<String, ProbeError> {
    normalize_repo_path(&format!("{}/{}", base, relative_path))
}

/// Fill `{file}` with the relative path and `{folder}` with its first segment
pub fn upload_message(template: &str, relative_path: &str) -> String {
    let folder = relative_path.split('/').next().unwrap_or_default();
    template
        .replace("{file}", relative_path)
        .replace("{folder}", folder)
}

/// Upload local files one at a time, one commit each.
///
/// Existing paths are overwritten against their recorded revision. The
/// upload stops at the first failure and the mirror reflects every file
/// written before it.
pub async fn upload_folder<S: ContentStore + ?Sized>(
    store: &S,
    files: &mut FileSet,
    base: &str,
    local: &[LocalFile],
    message_template: &str,
) -> Result<Vec<FileIdentity>, UploadFailure> {
    let mut uploaded = Vec::with_capacity(local.len());

    for (index, file) in local.iter().enumerate() {
        let target = upload_target(base, &file.relative_path).map_err(|reason| UploadFailure {
            path: file.relative_path.clone(),
            uploaded: uploaded.len(),
            reason,
        })?;
        info!("uploading {}/{}: {}", index + 1, local.len(), target);

        let message = upload_message(message_template, &file.relative_path);
        match put_file(store, files, &target, &file.bytes, &message).await {
            Ok(identity) => uploaded.push(identity),
            Err(reason) => {
                return Err(UploadFailure {
                    path: target,
                    uploaded: uploaded.len(),
                    reason,
                })
            }
        }
    }

    Ok(uploaded)
}
