use clap::{Parser, Subcommand, crate_name};
use color_eyre::eyre::Result;
use tracing::{Level, metadata::LevelFilter};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    get_github_repo::GetGithubRepo, get_sha::GetSha,
    remove_github_credentials::RemoveGithubCredentials, resign_ipa::ResignIpa,
    set_build_number::SetBuildNumber, set_github_credentials::SetGithubCredentials,
    set_github_status::SetGithubStatus, upload_hockey_app::UploadHockeyApp,
    upload_itunes_connect::UploadItunesConnect,
};

mod commands;
mod credential;
mod github;
mod hockeyapp;
mod info_plist;
mod ipa;
mod itunes_connect;
mod process;
mod prompts;
mod provisioning;
mod resign;
mod signing;
mod token;
mod xcode_server;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .install()?;

    setup_logging();

    match Cli::parse().command {
        Commands::ResignIpa(resign_ipa) => resign_ipa.run(),
        Commands::SetBuildNumber(set_build_number) => set_build_number.run(),
        Commands::SetGithubStatus(set_github_status) => set_github_status.run().await,
        Commands::GetGithubRepo(get_github_repo) => get_github_repo.run(),
        Commands::GetSha(get_sha) => get_sha.run(),
        Commands::SetGithubCredentials(set_github_credentials) => {
            set_github_credentials.run().await
        }
        Commands::RemoveGithubCredentials(remove_github_credentials) => {
            remove_github_credentials.run()
        }
        Commands::UploadHockeyApp(upload_hockey_app) => upload_hockey_app.run().await,
        Commands::UploadItunesConnect(upload_itunes_connect) => upload_itunes_connect.run().await,
    }
}

fn setup_logging() {
    let indicatif_layer = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_target(cfg!(debug_assertions))
                .without_time(),
        )
        .with(indicatif_layer)
        .with(
            filter::Targets::new()
                .with_default(LevelFilter::INFO)
                .with_target(crate_name!(), Level::TRACE),
        )
        .init();
}

#[derive(Parser)]
#[command(author, version, about, long_about = None, disable_version_flag = true)]
struct Cli {
    #[arg(short = 'v', short_alias = 'V', long, action = clap::builder::ArgAction::Version)]
    version: (),
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    ResignIpa(ResignIpa),
    SetBuildNumber(SetBuildNumber),
    SetGithubStatus(SetGithubStatus),
    GetGithubRepo(GetGithubRepo),
    GetSha(GetSha),
    SetGithubCredentials(SetGithubCredentials),
    RemoveGithubCredentials(RemoveGithubCredentials),
    UploadHockeyApp(UploadHockeyApp),
    UploadItunesConnect(UploadItunesConnect),
}
