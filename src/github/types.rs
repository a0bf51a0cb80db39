use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::utils::ProbeError;

/// Repository coordinates used for every content call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    /// `owner/name`
    pub path: String,
    pub default_branch: String,
}

impl RepoInfo {
    pub fn new(path: impl Into<String>, default_branch: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_branch: default_branch.into(),
        }
    }

    /// Validate an `owner/name` string
    pub fn parse_path(path: &str) -> Result<(&str, &str), ProbeError> {
        match path.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok((owner, name))
            }
            _ => Err(ProbeError::InvalidInput(format!(
                "repository must be given as owner/name, got '{}'",
                path
            ))),
        }
    }
}

/// Entry of the user's repository list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSummary {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// A file known to exist in the store, with its current revision marker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    pub path: String,
    pub revision: String,
}

impl FileIdentity {
    pub fn new(path: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            revision: revision.into(),
        }
    }

    /// Number of slash-delimited segments
    pub fn depth(&self) -> usize {
        self.path.split('/').count()
    }
}

/// In-memory mirror of the store's files, keyed by path
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: BTreeMap<String, String>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<FileIdentity> {
        self.entries
            .get(path)
            .map(|revision| FileIdentity::new(path, revision.clone()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert a new identity or replace the marker of an existing one
    pub fn upsert(&mut self, identity: FileIdentity) {
        self.entries.insert(identity.path, identity.revision);
    }

    pub fn remove(&mut self, path: &str) -> Option<FileIdentity> {
        self.entries
            .remove(path)
            .map(|revision| FileIdentity::new(path, revision))
    }

    /// Every file strictly below `folder`
    pub fn under_folder(&self, folder: &str) -> Vec<FileIdentity> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        self.entries
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .map(|(path, revision)| FileIdentity::new(path.clone(), revision.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = FileIdentity> + '_ {
        self.entries
            .iter()
            .map(|(path, revision)| FileIdentity::new(path.clone(), revision.clone()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<FileIdentity> for FileSet {
    fn from_iter<I: IntoIterator<Item = FileIdentity>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for identity in iter {
            set.upsert(identity);
        }
        set
    }
}

/// File content as read from the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub revision: String,
    /// Base64 with any line breaks removed
    pub encoded_content: String,
}

impl RemoteFile {
    pub fn decode_text(&self) -> Result<String, ProbeError> {
        decode_content(&self.encoded_content)
            .map_err(|e| ProbeError::InvalidInput(format!("{}: {}", self.path, e)))
    }
}

/// A fetched repository: coordinates plus its blob listing
#[derive(Clone, Debug)]
pub struct RepoSnapshot {
    pub info: RepoInfo,
    pub files: FileSet,
    /// The store returned an incomplete listing
    pub truncated: bool,
}

pub fn encode_content(text: &str) -> String {
    encode_bytes(text.as_bytes())
}

/// Base64 for arbitrary file bytes, binary included
pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 (line breaks tolerated) into UTF-8 text
pub fn decode_content(encoded: &str) -> Result<String, String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|_| "content is not valid UTF-8 text".to_string())
}
