mod commit_status;
mod git_commit;

pub use commit_status::CommitState;
use reqwest::{Response, header::HeaderValue};

use super::GitHubError;

pub const REST_API_URL: &str = "https://api.github.com";

#[expect(clippy::declare_interior_mutable_const)]
pub const GITHUB_JSON_MIME: HeaderValue = HeaderValue::from_static("application/vnd.github+json");

pub const X_GITHUB_API_VERSION: &str = "X-GitHub-Api-Version";

#[expect(clippy::declare_interior_mutable_const)]
pub const REST_API_VERSION: HeaderValue = HeaderValue::from_static("2022-11-28");

/// Turns an unsuccessful response into an error that carries GitHub's explanation.
async fn check(response: Response) -> Result<Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(GitHubError::Status {
        status,
        body: response.text().await.unwrap_or_default(),
    })
}
