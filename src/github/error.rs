use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}
