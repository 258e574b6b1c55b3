use bon::bon;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{GITHUB_JSON_MIME, REST_API_URL, REST_API_VERSION, X_GITHUB_API_VERSION, check};
use crate::github::{GitHub, GitHubError, Repository};

/// The state of a commit status.
#[derive(
    Clone, Copy, Debug, Display, EnumString, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CommitState {
    Error,
    Failure,
    Pending,
    Success,
}

#[derive(Serialize)]
struct CommitStatus<'a> {
    state: CommitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

/// The status GitHub created.
#[derive(Debug, Deserialize)]
pub struct CreatedStatus {
    pub id: u64,
    pub state: CommitState,
    pub url: String,
}

#[bon]
impl GitHub {
    /// Creates a commit status for a sha.
    #[builder(finish_fn = send)]
    pub async fn create_status(
        &self,
        repository: &Repository,
        sha: &str,
        state: CommitState,
        target_url: Option<&str>,
        description: Option<&str>,
        context: Option<&str>,
    ) -> Result<CreatedStatus, GitHubError> {
        let endpoint = statuses_endpoint(repository, sha);

        let response = self
            .0
            .post(endpoint)
            .header(ACCEPT, GITHUB_JSON_MIME)
            .header(X_GITHUB_API_VERSION, REST_API_VERSION)
            .json(&CommitStatus {
                state,
                target_url,
                description,
                context,
            })
            .send()
            .await?;

        Ok(check(response).await?.json::<CreatedStatus>().await?)
    }
}

fn statuses_endpoint(repository: &Repository, sha: &str) -> String {
    format!(
        "{REST_API_URL}/repos/{}/{}/statuses/{sha}",
        repository.owner(),
        repository.name()
    )
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;
    use serde_json::json;

    use super::{CommitState, CommitStatus, CreatedStatus, statuses_endpoint};
    use crate::github::Repository;

    #[test]
    fn endpoint() {
        assert_eq!(
            statuses_endpoint(
                &Repository::new("drewcrawford", "DCAKit"),
                "2f0c7a6c2d3b8a4f1a8e1c0f9e1b5d6a7c8b9d0e"
            ),
            "https://api.github.com/repos/drewcrawford/DCAKit/statuses/2f0c7a6c2d3b8a4f1a8e1c0f9e1b5d6a7c8b9d0e"
        );
    }

    #[test]
    fn omits_missing_fields() {
        let status = CommitStatus {
            state: CommitState::Pending,
            target_url: Some("https://xcs.local/xcode/bots/abc/integrations"),
            description: None,
            context: None,
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            json!({
                "state": "pending",
                "target_url": "https://xcs.local/xcode/bots/abc/integrations"
            })
        );
    }

    #[test]
    fn reads_created_status() {
        let status = serde_json::from_str::<CreatedStatus>(indoc! {r#"
            {
                "url": "https://api.github.com/repos/drewcrawford/DCAKit/statuses/6dcb09b",
                "id": 1,
                "state": "success",
                "description": "Build has completed successfully",
                "context": "continuous-integration/xcode"
            }
        "#})
        .unwrap();
        assert_eq!(status.id, 1);
        assert_eq!(status.state, CommitState::Success);
    }

    #[rstest]
    #[case(CommitState::Error, "error")]
    #[case(CommitState::Failure, "failure")]
    #[case(CommitState::Pending, "pending")]
    #[case(CommitState::Success, "success")]
    fn state_names(#[case] state: CommitState, #[case] name: &str) {
        assert_eq!(state.to_string(), name);
        assert_eq!(name.parse::<CommitState>().unwrap(), state);
    }
}
