use anstream::println;
use clap::Parser;
use color_eyre::eyre::Result;
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use tracing::info;

use crate::{
    commands::utils::{SPINNER_TICK_RATE, credentials::CredentialArgs},
    github::{GitHub, rest::CommitState},
    token::TokenManager,
    xcode_server::XcodeServer,
};

/// Set the GitHub commit status from the integration's result. Best run both before and after the
/// build
#[derive(Parser)]
#[clap(visible_alias = "setGithubStatus")]
pub struct SetGithubStatus {
    /// Label that distinguishes this status from those of other systems
    #[arg(long)]
    context: Option<String>,

    #[command(flatten)]
    credentials: CredentialArgs,

    /// GitHub personal access token with the `repo:status` scope
    #[arg(short, long, env = "GITHUB_TOKEN")]
    token: Option<String>,
}

impl SetGithubStatus {
    pub async fn run(self) -> Result<()> {
        let xcode_server = XcodeServer::from_env();
        let log = xcode_server.source_control_log()?;
        let repository = log.repository()?;
        let sha = log.sha()?;
        let state = CommitState::from(xcode_server.integration_result()?);
        let target_url = xcode_server.integration_url()?;
        let description = xcode_server.bot_name()?;

        let store = self.credentials.open()?;
        let token = TokenManager::handle(self.token, store.as_ref()).await?;
        let github = GitHub::new(&token)?;

        let pb = ProgressBar::new_spinner()
            .with_message(format!("Setting the status of {repository}@{sha} to {state}"));
        pb.enable_steady_tick(SPINNER_TICK_RATE);

        let status = github
            .create_status()
            .repository(&repository)
            .sha(sha)
            .state(state)
            .target_url(&target_url)
            .description(description)
            .maybe_context(self.context.as_deref())
            .send()
            .await;

        pb.finish_and_clear();
        let status = status?;
        info!(id = status.id, "Created commit status {}", status.url);

        println!(
            "{} set the status of {} to {}",
            "Successfully".green(),
            sha.blue(),
            status.state
        );

        Ok(())
    }
}
