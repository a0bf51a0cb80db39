use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use super::store::ContentStore;
use super::types::{FileIdentity, FileSet, RemoteFile, RepoInfo, RepoSnapshot, RepoSummary};
use crate::constants::{GITHUB_ACCEPT, GITHUB_USER_AGENT, REPO_LIST_PAGE_SIZE};
use crate::utils::ProbeError;

/// Thin client for the GitHub REST v3 API
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_base: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Result<Self, ProbeError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ProbeError::Config(
                "a GitHub personal access token is required".to_string(),
            ));
        }
        Ok(Self {
            client: Client::builder().user_agent(GITHUB_USER_AGENT).build()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Build an endpoint URL, percent-encoding each path segment
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, ProbeError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| ProbeError::Config(format!("invalid GitHub API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ProbeError::Config("GitHub API base cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", GITHUB_ACCEPT)
    }

    /// Repositories of the authenticated user, most recently updated first
    pub async fn list_repositories(&self) -> Result<Vec<RepoSummary>, ProbeError> {
        let mut url = self.endpoint(["user", "repos"])?;
        url.query_pairs_mut()
            .append_pair("sort", "updated")
            .append_pair("per_page", &REPO_LIST_PAGE_SIZE.to_string());

        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ProbeError::RemoteStore {
                status: 401,
                message: "Authentication failed. Check that the personal access token is correct and has the `repo` scope.".to_string(),
            });
        }
        let response = check_status(response, "user/repos").await?;
        Ok(response.json().await?)
    }

    /// Default branch plus every blob in the branch's tree, sorted by path
    pub async fn fetch_repository(&self, repo_path: &str) -> Result<RepoSnapshot, ProbeError> {
        let (owner, name) = RepoInfo::parse_path(repo_path)?;

        let url = self.endpoint(["repos", owner, name])?;
        let response = check_status(self.request(Method::GET, url).send().await?, repo_path).await?;
        let details: RepoDetails = response.json().await?;

        let mut url = self.endpoint(["repos", owner, name, "git", "trees", &details.default_branch])?;
        url.query_pairs_mut().append_pair("recursive", "1");
        let response = check_status(self.request(Method::GET, url).send().await?, repo_path).await?;
        let tree: TreeResponse = response.json().await?;

        if tree.truncated {
            warn!("{} is large, the file list may be incomplete", repo_path);
        }

        let files: FileSet = tree
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .map(|entry| FileIdentity::new(entry.path, entry.sha))
            .collect();
        debug!("fetched {} files from {}", files.len(), repo_path);

        Ok(RepoSnapshot {
            info: RepoInfo::new(format!("{}/{}", owner, name), details.default_branch),
            files,
            truncated: tree.truncated,
        })
    }

    pub async fn create_repository(
        &self,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<RepoSummary, ProbeError> {
        let url = self.endpoint(["user", "repos"])?;
        let response = self
            .request(Method::POST, url)
            .json(&json!({
                "name": name,
                "description": description,
                "private": private,
                "auto_init": true,
            }))
            .send()
            .await?;
        let response = check_status(response, name).await?;
        Ok(response.json().await?)
    }

    /// Content operations scoped to one repository and branch
    pub fn contents(&self, repo: RepoInfo) -> RepositoryContents {
        RepositoryContents {
            client: self.clone(),
            repo,
        }
    }
}

/// `ContentStore` over the GitHub contents API
pub struct RepositoryContents {
    client: GitHubClient,
    repo: RepoInfo,
}

impl RepositoryContents {
    pub fn repo(&self) -> &RepoInfo {
        &self.repo
    }

    fn contents_url(&self, path: &str) -> Result<Url, ProbeError> {
        let (owner, name) = RepoInfo::parse_path(&self.repo.path)?;
        let segments = ["repos", owner, name, "contents"]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        self.client.endpoint(segments)
    }
}

#[async_trait]
impl ContentStore for RepositoryContents {
    async fn read_file(&self, path: &str) -> Result<RemoteFile, ProbeError> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut()
            .append_pair("ref", &self.repo.default_branch);

        let response = self.client.request(Method::GET, url).send().await?;
        let data: ContentResponse = check_status(response, path).await?.json().await?;

        Ok(RemoteFile {
            path: path.to_string(),
            revision: data.sha,
            encoded_content: data
                .content
                .unwrap_or_default()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect(),
        })
    }

    async fn write_file(
        &self,
        path: &str,
        encoded_content: &str,
        message: &str,
        revision: Option<&str>,
    ) -> Result<FileIdentity, ProbeError> {
        let mut body = json!({
            "message": message,
            "content": encoded_content,
            "branch": self.repo.default_branch,
        });
        if let Some(sha) = revision {
            body["sha"] = json!(sha);
        }

        let url = self.contents_url(path)?;
        let response = self
            .client
            .request(Method::PUT, url)
            .json(&body)
            .send()
            .await?;
        let data: WriteResponse = check_status(response, path).await?.json().await?;

        Ok(FileIdentity::new(data.content.path, data.content.sha))
    }

    async fn delete_file(
        &self,
        path: &str,
        revision: &str,
        message: &str,
    ) -> Result<(), ProbeError> {
        let url = self.contents_url(path)?;
        let response = self
            .client
            .request(Method::DELETE, url)
            .json(&json!({
                "message": message,
                "sha": revision,
                "branch": self.repo.default_branch,
            }))
            .send()
            .await?;
        check_status(response, path).await?;
        Ok(())
    }
}

/// Map a non-success reply to the error taxonomy, keeping the store's message
async fn check_status(response: Response, target: &str) -> Result<Response, ProbeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(status_error(status.as_u16(), &text, target))
}

fn status_error(status: u16, body: &str, target: &str) -> ProbeError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        404 => ProbeError::NotFound(target.to_string()),
        409 | 422 => ProbeError::RemoteStoreConflict {
            path: target.to_string(),
            message,
        },
        _ => ProbeError::RemoteStore { status, message },
    }
}

// Response structures for the GitHub REST API

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepoDetails {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    sha: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    path: String,
    sha: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubClient {
        GitHubClient::new("https://api.github.com/", "ghp_test").unwrap()
    }

    #[test]
    fn test_requires_token() {
        assert!(matches!(
            GitHubClient::new("https://api.github.com", "  "),
            Err(ProbeError::Config(_))
        ));
    }

    #[test]
    fn test_contents_url_encodes_segments() {
        let contents = client().contents(RepoInfo::new("octo/app", "main"));
        let url = contents.contents_url("docs/release notes.md").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/app/contents/docs/release%20notes.md"
        );
    }

    #[test]
    fn test_status_mapping() {
        let body = r#"{"message": "sha wasn't supplied"}"#;
        match status_error(422, body, "a.txt") {
            ProbeError::RemoteStoreConflict { path, message } => {
                assert_eq!(path, "a.txt");
                assert_eq!(message, "sha wasn't supplied");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(status_error(404, "", "a.txt").is_not_found());
        assert!(matches!(
            status_error(500, "upstream down", "a.txt"),
            ProbeError::RemoteStore { status: 500, ref message } if message == "upstream down"
        ));
    }

    #[test]
    fn test_tree_parsing_keeps_blobs() {
        let raw = r#"{
            "tree": [
                {"path": "src", "type": "tree", "sha": "t1"},
                {"path": "src/main.rs", "type": "blob", "sha": "b1"},
                {"path": "Cargo.toml", "type": "blob", "sha": "b2"}
            ],
            "truncated": false
        }"#;
        let tree: TreeResponse = serde_json::from_str(raw).unwrap();
        let files: FileSet = tree
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .map(|entry| FileIdentity::new(entry.path, entry.sha))
            .collect();
        let paths: Vec<_> = files.paths().collect();
        assert_eq!(paths, vec!["Cargo.toml", "src/main.rs"]);
    }
}
