//! forge::github
//!
//! GitHub implementation of [`ContentApi`] over the REST contents, refs,
//! branches and merges endpoints.
//!
//! # Design
//!
//! The client holds no credential and no repository; both arrive with each
//! call. Every request carries the bearer token, the GitHub media type, a
//! fixed `User-Agent`, and fresh correlation headers.
//!
//! Each method makes exactly one attempt. Status codes map onto
//! [`ForgeError`] as follows:
//!
//! | Status | Error |
//! |---|---|
//! | 401, 403 | `AuthFailed` |
//! | 403 with exhausted rate limit, 429 | `RateLimited` |
//! | 404 | `NotFound` |
//! | 409 | `Conflict` |
//! | 422 mentioning a sha or an existing ref | `Conflict` |
//! | any other non-2xx | `RemoteFailure` |
//! | transport failure or timeout | `Network` |
//!
//! # Example
//!
//! ```ignore
//! use sorpush::forge::github::GitHubForge;
//! use std::time::Duration;
//!
//! let forge = GitHubForge::new("https://api.github.com", "sorpush", Duration::from_secs(30))?;
//! let entries = forge.list_directory(&cred, &repo, "src/batch/sor1").await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::correlation::correlation_headers;
use super::traits::{
    ContentApi, ForgeError, MergeRequest, MergeResult, PutFileRequest, RepositorySummary,
};
use crate::auth::Credential;
use crate::core::types::{BranchRef, ContentEntry, RepositoryRef};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "sorpush";

/// Page size for list endpoints.
const PER_PAGE: usize = 100;

/// GitHub content API client.
pub struct GitHubForge {
    client: Client,
    /// API base URL without trailing slash (configurable for GitHub Enterprise)
    api_base: String,
    /// `api_base` parsed; endpoint paths are appended segment by segment
    base: Url,
    /// Value for the `X-Client-Id` header
    client_id: String,
}

impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("api_base", &self.api_base)
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl GitHubForge {
    /// Create a client.
    ///
    /// `timeout` bounds each request end to end; an expired request is
    /// reported as `ForgeError::Network`.
    pub fn new(
        api_base: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ForgeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForgeError::Network(e.to_string()))?;
        let api_base: String = api_base.into();
        let api_base = api_base.trim_end_matches('/').to_string();
        let base = Url::parse(&api_base)
            .map_err(|e| ForgeError::Network(format!("invalid api base '{}': {}", api_base, e)))?;
        if base.cannot_be_a_base() {
            return Err(ForgeError::Network(format!(
                "invalid api base '{}': not a hierarchical URL",
                api_base
            )));
        }
        Ok(Self {
            client,
            api_base,
            base,
            client_id: client_id.into(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build headers for one request.
    fn headers(&self, cred: &Credential) -> Result<HeaderMap, ForgeError> {
        let mut headers = correlation_headers(&self.client_id)
            .map_err(|e| ForgeError::MalformedResponse(format!("invalid client id: {}", e)))?;
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", cred.expose()))
                .map_err(|_| ForgeError::AuthFailed("credential is not a valid header".into()))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }

    /// Append path segments to the API base.
    ///
    /// Each segment is percent-encoded on its own, so `#`, `?` and `%` in a
    /// file or branch name stay part of the path.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, ForgeError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ForgeError::Network(format!("invalid api base '{}'", self.api_base))
            })?
            .pop_if_empty()
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
        Ok(url)
    }

    /// Build URL for a repository endpoint; `rest` is a `/`-separated path.
    fn repo_url(&self, repo: &RepositoryRef, rest: &str) -> Result<Url, ForgeError> {
        self.endpoint(
            ["repos", repo.owner.as_str(), repo.name.as_str()]
                .into_iter()
                .chain(rest.split('/')),
        )
    }

    fn contents_url(&self, repo: &RepositoryRef, path: &str) -> Result<Url, ForgeError> {
        self.endpoint(
            ["repos", repo.owner.as_str(), repo.name.as_str(), "contents"]
                .into_iter()
                .chain(path.split('/')),
        )
    }

    fn branch_url(&self, repo: &RepositoryRef, name: &str) -> Result<Url, ForgeError> {
        self.endpoint(
            ["repos", repo.owner.as_str(), repo.name.as_str(), "branches"]
                .into_iter()
                .chain(name.split('/')),
        )
    }

    async fn get_json(
        &self,
        cred: &Credential,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, ForgeError> {
        debug!(method = "GET", url = %url, "github request");
        let response = self
            .client
            .get(url)
            .headers(self.headers(cred)?)
            .query(query)
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;
        self.handle_response(response).await
    }

    /// Decode a success body, or map an error response.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();
        debug!(status = status.as_u16(), "github response");

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ForgeError::MalformedResponse(format!("failed to parse response: {}", e)))
        } else {
            Err(self.error_from_response(response, status).await)
        }
    }

    async fn error_from_response(&self, response: Response, status: StatusCode) -> ForgeError {
        let rate_limit_exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false);

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        map_status(status, rate_limit_exhausted, message)
    }
}

/// Map a non-2xx status onto a [`ForgeError`].
fn map_status(status: StatusCode, rate_limit_exhausted: bool, message: String) -> ForgeError {
    match status {
        StatusCode::FORBIDDEN if rate_limit_exhausted => ForgeError::RateLimited,
        StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
        StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
        StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
        StatusCode::NOT_FOUND => ForgeError::NotFound(message),
        StatusCode::CONFLICT => ForgeError::Conflict(message),
        StatusCode::UNPROCESSABLE_ENTITY if is_conflict_message(&message) => {
            ForgeError::Conflict(message)
        }
        _ => ForgeError::RemoteFailure {
            status: status.as_u16(),
            message,
        },
    }
}

fn is_conflict_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("sha") || lower.contains("already exists")
}

/// Convert a contents payload for `path` into a [`ContentEntry`].
///
/// An array payload is a directory listing, so `path` itself is a directory.
fn entry_from_payload(path: &str, payload: serde_json::Value) -> Result<ContentEntry, ForgeError> {
    if payload.is_array() {
        let path = path.trim_matches('/').to_string();
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        return Ok(ContentEntry {
            name,
            path,
            sha: None,
            is_directory: true,
        });
    }
    let item: GitHubContentItem = serde_json::from_value(payload)
        .map_err(|e| ForgeError::MalformedResponse(format!("unexpected contents payload: {}", e)))?;
    Ok(item.into())
}

#[async_trait]
impl ContentApi for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn list_directory(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        path: &str,
    ) -> Result<Vec<ContentEntry>, ForgeError> {
        let url = self.contents_url(repo, path)?;
        let payload = self.get_json(cred, url, &[]).await?;
        let items: Vec<GitHubContentItem> = match payload {
            serde_json::Value::Array(_) => serde_json::from_value(payload).map_err(|e| {
                ForgeError::MalformedResponse(format!("unexpected directory listing: {}", e))
            })?,
            _ => {
                return Err(ForgeError::MalformedResponse(format!(
                    "{} is not a directory",
                    path
                )))
            }
        };
        Ok(items.into_iter().map(ContentEntry::from).collect())
    }

    async fn get_entry(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        path: &str,
        branch: &str,
    ) -> Result<ContentEntry, ForgeError> {
        let url = self.contents_url(repo, path)?;
        let payload = self
            .get_json(cred, url, &[("ref", branch.to_string())])
            .await?;
        entry_from_payload(path, payload)
    }

    async fn put_file(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        request: PutFileRequest,
    ) -> Result<serde_json::Value, ForgeError> {
        let url = self.contents_url(repo, &request.path)?;
        let body = PutFileBody {
            message: &request.message,
            content: STANDARD.encode(&request.content),
            branch: &request.branch,
            sha: request.sha.as_deref(),
        };

        debug!(
            method = "PUT",
            url = %url,
            branch = %request.branch,
            has_sha = request.sha.is_some(),
            "github request"
        );
        let response = self
            .client
            .put(url)
            .headers(self.headers(cred)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;
        self.handle_response(response).await
    }

    async fn default_branch(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
    ) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, "")?;
        let payload = self.get_json(cred, url, &[]).await?;
        let info: GitHubRepository = serde_json::from_value(payload)
            .map_err(|e| ForgeError::MalformedResponse(format!("missing default_branch: {}", e)))?;
        Ok(info.default_branch)
    }

    async fn get_branch(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        name: &str,
    ) -> Result<BranchRef, ForgeError> {
        let url = self.branch_url(repo, name)?;
        let payload = self.get_json(cred, url, &[]).await?;
        let branch: GitHubBranch = serde_json::from_value(payload)
            .map_err(|e| ForgeError::MalformedResponse(format!("missing branch commit: {}", e)))?;
        Ok(BranchRef {
            name: branch.name,
            head_sha: branch.commit.sha,
        })
    }

    async fn create_ref(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        name: &str,
        sha: &str,
    ) -> Result<serde_json::Value, ForgeError> {
        let url = self.repo_url(repo, "git/refs")?;
        let body = CreateRefBody {
            git_ref: format!("refs/heads/{}", name),
            sha,
        };

        debug!(method = "POST", url = %url, branch = name, "github request");
        let response = self
            .client
            .post(url)
            .headers(self.headers(cred)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;
        self.handle_response(response).await
    }

    async fn merge(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
        request: MergeRequest,
    ) -> Result<MergeResult, ForgeError> {
        let url = self.repo_url(repo, "merges")?;
        let body = MergeBody {
            base: &request.base,
            head: &request.head,
            commit_message: &request.commit_message,
        };

        debug!(
            method = "POST",
            url = %url,
            base = %request.base,
            head = %request.head,
            "github request"
        );
        let response = self
            .client
            .post(url)
            .headers(self.headers(cred)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;

        // 204 means base already contains head
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(MergeResult::NothingToMerge);
        }
        let merged: serde_json::Value = self.handle_response(response).await?;
        Ok(MergeResult::Merged(merged))
    }

    async fn list_branches(
        &self,
        cred: &Credential,
        repo: &RepositoryRef,
    ) -> Result<Vec<String>, ForgeError> {
        let url = self.repo_url(repo, "branches")?;
        let mut names = Vec::new();
        let mut page = 1usize;
        loop {
            let payload = self
                .get_json(
                    cred,
                    url.clone(),
                    &[("per_page", PER_PAGE.to_string()), ("page", page.to_string())],
                )
                .await?;
            let batch: Vec<GitHubBranchName> = serde_json::from_value(payload)
                .map_err(|e| ForgeError::MalformedResponse(format!("unexpected branch list: {}", e)))?;
            let count = batch.len();
            names.extend(batch.into_iter().map(|b| b.name));
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(names)
    }

    async fn list_repositories(
        &self,
        cred: &Credential,
    ) -> Result<Vec<RepositorySummary>, ForgeError> {
        let url = self.endpoint(["user", "repos"])?;
        let mut repos = Vec::new();
        let mut page = 1usize;
        loop {
            let payload = self
                .get_json(
                    cred,
                    url.clone(),
                    &[("per_page", PER_PAGE.to_string()), ("page", page.to_string())],
                )
                .await?;
            let batch: Vec<GitHubRepositoryListItem> = serde_json::from_value(payload)
                .map_err(|e| ForgeError::MalformedResponse(format!("unexpected repository list: {}", e)))?;
            let count = batch.len();
            repos.extend(
                batch
                    .into_iter()
                    .filter(|r| r.permissions.as_ref().map(|p| p.push).unwrap_or(false))
                    .map(|r| RepositorySummary {
                        owner: r.owner.login,
                        name: r.name,
                    }),
            );
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(repos)
    }
}

// =============================================================================
// GitHub API request/response types
// =============================================================================

/// Request body for creating or updating a file.
#[derive(Serialize)]
struct PutFileBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Request body for creating a ref.
#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: &'a str,
}

/// Request body for a branch merge.
#[derive(Serialize)]
struct MergeBody<'a> {
    base: &'a str,
    head: &'a str,
    commit_message: &'a str,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// One item of a contents response.
#[derive(Deserialize)]
struct GitHubContentItem {
    name: String,
    path: String,
    sha: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

impl From<GitHubContentItem> for ContentEntry {
    fn from(item: GitHubContentItem) -> Self {
        let is_directory = item.kind == "dir";
        ContentEntry {
            name: item.name,
            path: item.path,
            sha: if is_directory { None } else { item.sha },
            is_directory,
        }
    }
}

#[derive(Deserialize)]
struct GitHubRepository {
    default_branch: String,
}

#[derive(Deserialize)]
struct GitHubBranch {
    name: String,
    commit: GitHubCommitRef,
}

#[derive(Deserialize)]
struct GitHubCommitRef {
    sha: String,
}

#[derive(Deserialize)]
struct GitHubBranchName {
    name: String,
}

#[derive(Deserialize)]
struct GitHubRepositoryListItem {
    name: String,
    owner: GitHubOwnerInfo,
    permissions: Option<GitHubPermissions>,
}

#[derive(Deserialize)]
struct GitHubOwnerInfo {
    login: String,
}

#[derive(Deserialize)]
struct GitHubPermissions {
    #[serde(default)]
    push: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forge() -> GitHubForge {
        GitHubForge::new("https://api.github.com/", "sorpush", Duration::from_secs(5)).unwrap()
    }

    fn repo() -> RepositoryRef {
        RepositoryRef::new("octocat", "feeds").unwrap()
    }

    mod urls {
        use super::*;

        #[test]
        fn trailing_slash_is_trimmed() {
            assert_eq!(forge().api_base(), "https://api.github.com");
        }

        #[test]
        fn repo_url_format() {
            assert_eq!(
                forge().repo_url(&repo(), "git/refs").unwrap().as_str(),
                "https://api.github.com/repos/octocat/feeds/git/refs"
            );
            assert_eq!(
                forge().repo_url(&repo(), "").unwrap().as_str(),
                "https://api.github.com/repos/octocat/feeds"
            );
        }

        #[test]
        fn enterprise_base_keeps_its_path() {
            let forge =
                GitHubForge::new("https://ghe.example.com/api/v3/", "sorpush", Duration::from_secs(5))
                    .unwrap();
            assert_eq!(
                forge.repo_url(&repo(), "merges").unwrap().as_str(),
                "https://ghe.example.com/api/v3/repos/octocat/feeds/merges"
            );
        }

        #[test]
        fn reserved_characters_are_escaped_per_segment() {
            assert_eq!(
                forge()
                    .contents_url(&repo(), "src/batch/sor1/orders#v2/sql/a?b%.sql")
                    .unwrap()
                    .as_str(),
                "https://api.github.com/repos/octocat/feeds/contents/src/batch/sor1/orders%23v2/sql/a%3Fb%25.sql"
            );
            assert_eq!(
                forge().branch_url(&repo(), "feature/fix#1").unwrap().as_str(),
                "https://api.github.com/repos/octocat/feeds/branches/feature/fix%231"
            );
        }

        #[test]
        fn contents_url_format() {
            assert_eq!(
                forge()
                    .contents_url(&repo(), "src/batch/sor1/sql/orders.sql")
                    .unwrap()
                    .as_str(),
                "https://api.github.com/repos/octocat/feeds/contents/src/batch/sor1/sql/orders.sql"
            );
        }
    }

    mod status_mapping {
        use super::*;

        fn map(status: u16, exhausted: bool, message: &str) -> ForgeError {
            map_status(
                StatusCode::from_u16(status).unwrap(),
                exhausted,
                message.to_string(),
            )
        }

        #[test]
        fn auth_failures() {
            assert!(matches!(map(401, false, "Bad credentials"), ForgeError::AuthFailed(_)));
            assert!(matches!(map(403, false, "Forbidden"), ForgeError::AuthFailed(_)));
        }

        #[test]
        fn rate_limits() {
            assert_eq!(map(403, true, "API rate limit exceeded"), ForgeError::RateLimited);
            assert_eq!(map(429, false, "slow down"), ForgeError::RateLimited);
        }

        #[test]
        fn not_found_and_conflict() {
            assert_eq!(
                map(404, false, "Not Found"),
                ForgeError::NotFound("Not Found".into())
            );
            assert!(matches!(map(409, false, "does not match"), ForgeError::Conflict(_)));
        }

        #[test]
        fn validation_failures_about_sha_are_conflicts() {
            assert!(matches!(
                map(422, false, "Invalid request.\n\n\"sha\" wasn't supplied."),
                ForgeError::Conflict(_)
            ));
            assert!(matches!(
                map(422, false, "Reference already exists"),
                ForgeError::Conflict(_)
            ));
        }

        #[test]
        fn other_failures_keep_status() {
            assert_eq!(
                map(422, false, "Validation Failed"),
                ForgeError::RemoteFailure {
                    status: 422,
                    message: "Validation Failed".into()
                }
            );
            assert_eq!(
                map(500, false, "boom"),
                ForgeError::RemoteFailure {
                    status: 500,
                    message: "boom".into()
                }
            );
        }
    }

    mod payloads {
        use super::*;

        #[test]
        fn file_payload() {
            let entry = entry_from_payload(
                "src/batch/sor1/sql/orders.sql",
                json!({
                    "type": "file",
                    "name": "orders.sql",
                    "path": "src/batch/sor1/sql/orders.sql",
                    "sha": "abc123"
                }),
            )
            .unwrap();
            assert_eq!(entry.sha.as_deref(), Some("abc123"));
            assert!(!entry.is_directory);
        }

        #[test]
        fn array_payload_is_directory() {
            let entry = entry_from_payload("src/batch/sor1/sql/", json!([])).unwrap();
            assert!(entry.is_directory);
            assert!(entry.sha.is_none());
            assert_eq!(entry.name, "sql");
            assert_eq!(entry.path, "src/batch/sor1/sql");
        }

        #[test]
        fn dir_item_drops_sha() {
            let entry = entry_from_payload(
                "src/batch/sor1",
                json!({"type": "dir", "name": "sor1", "path": "src/batch/sor1", "sha": "tree"}),
            )
            .unwrap();
            assert!(entry.is_directory);
            assert!(entry.sha.is_none());
        }

        #[test]
        fn unexpected_payload_is_malformed() {
            let err = entry_from_payload("x", json!({"message": "hi"})).unwrap_err();
            assert!(matches!(err, ForgeError::MalformedResponse(_)));
        }

        #[test]
        fn put_body_omits_missing_sha() {
            let body = PutFileBody {
                message: "add",
                content: STANDARD.encode(b"select 1"),
                branch: "main",
                sha: None,
            };
            let value = serde_json::to_value(&body).unwrap();
            assert!(value.get("sha").is_none());
            assert_eq!(value["content"], "c2VsZWN0IDE=");
        }

        #[test]
        fn create_ref_body_uses_full_ref() {
            let body = CreateRefBody {
                git_ref: "refs/heads/feature".into(),
                sha: "abc",
            };
            let value = serde_json::to_value(&body).unwrap();
            assert_eq!(value["ref"], "refs/heads/feature");
        }
    }

    #[test]
    fn debug_has_no_credentials() {
        let debug = format!("{:?}", forge());
        assert!(debug.contains("api.github.com"));
        assert!(!debug.contains("Bearer"));
    }
}
