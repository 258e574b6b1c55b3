use std::process::Command;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use reqwest::Client;

use crate::{
    commands::utils::credentials::CredentialArgs,
    process,
    token::{TokenManager, default_headers},
};

/// The user Xcode Server runs triggers as.
const BUILD_USER: &str = "_xcsbuildd";

/// Store the GitHub token used by the other commands
#[derive(Parser)]
#[clap(visible_alias = "setGithubCredentials")]
pub struct SetGithubCredentials {
    /// GitHub personal access token with the `repo:status` scope. Prompted for when not given
    #[arg(short, long, env = "GITHUB_TOKEN")]
    token: Option<String>,

    /// Store the token even when not running as the Xcode Server build user
    #[arg(long)]
    any_user: bool,

    #[command(flatten)]
    credentials: CredentialArgs,
}

impl SetGithubCredentials {
    pub async fn run(self) -> Result<()> {
        if !self.any_user {
            let user = current_user()?;
            if user != BUILD_USER {
                bail!(
                    "{user} is not {BUILD_USER}. Run this as `sudo -u {BUILD_USER} {} set-github-credentials` or pass `--any-user`",
                    env!("CARGO_PKG_NAME")
                );
            }
        }

        let client = Client::builder()
            .default_headers(default_headers(None))
            .build()?;

        let token = match self.token {
            Some(token) => {
                TokenManager::validate(&client, &token).await?;
                token
            }
            None => TokenManager::prompt().client(&client).call()?,
        };

        let store = self.credentials.open()?;
        TokenManager::store(store.as_ref(), &token)?;

        Ok(())
    }
}

fn current_user() -> Result<String> {
    let output = process::run(&mut Command::new("whoami"))?;
    Ok(String::from_utf8_lossy(&output).trim().to_owned())
}
