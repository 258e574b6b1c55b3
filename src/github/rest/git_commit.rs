use reqwest::header::ACCEPT;
use serde::Deserialize;

use super::{GITHUB_JSON_MIME, REST_API_URL, REST_API_VERSION, X_GITHUB_API_VERSION, check};
use crate::github::{GitHub, GitHubError, Repository};

/// A Git commit object.
#[derive(Debug, Deserialize)]
pub struct GitCommit {
    pub message: String,
}

impl GitHub {
    pub async fn get_commit(
        &self,
        repository: &Repository,
        sha: &str,
    ) -> Result<GitCommit, GitHubError> {
        let endpoint = format!(
            "{REST_API_URL}/repos/{}/{}/git/commits/{sha}",
            repository.owner(),
            repository.name()
        );

        let response = self
            .0
            .get(endpoint)
            .header(ACCEPT, GITHUB_JSON_MIME)
            .header(X_GITHUB_API_VERSION, REST_API_VERSION)
            .send()
            .await?;

        Ok(check(response).await?.json::<GitCommit>().await?)
    }

    /// The message of the commit being integrated, used as release notes.
    pub async fn commit_message(
        &self,
        repository: &Repository,
        sha: &str,
    ) -> Result<String, GitHubError> {
        self.get_commit(repository, sha)
            .await
            .map(|commit| commit.message)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::GitCommit;

    #[test]
    fn reads_commit() {
        let commit = serde_json::from_str::<GitCommit>(indoc! {r#"
            {
                "sha": "7638417db6d59f3c431d3e1f261cc637155684cd",
                "node_id": "MDY6Q29tbWl0NmRjYjA5YjViNTc4NzVmMzM0ZjYxYWViZWQ2OTVlMmU0MTkzZGI1ZQ==",
                "author": {
                    "date": "2014-11-07T22:01:45Z",
                    "name": "Monalisa Octocat",
                    "email": "octocat@github.com"
                },
                "message": "Fix crash when the keyboard is dismissed\n\nCloses #12",
                "tree": {
                    "url": "https://api.github.com/repos/octocat/Hello-World/trees/691272480426f78a0138979dd3ce63b77f706feb",
                    "sha": "691272480426f78a0138979dd3ce63b77f706feb"
                },
                "parents": []
            }
        "#})
        .unwrap();
        assert!(commit.message.starts_with("Fix crash"));
    }
}
