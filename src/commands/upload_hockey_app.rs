use anstream::println;
use camino::Utf8Path;
use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use tokio::process::Command;
use zip::CompressionMethod;

use crate::{
    commands::utils::{SPINNER_TICK_RATE, credentials::CredentialArgs, ensure_exists},
    github::GitHub,
    hockeyapp::{Availability, HockeyApp, Notification, Release},
    ipa::writer::{self, DirectoryEntries},
    process,
    token::TokenManager,
    xcode_server::XcodeServer,
};

const DSYMS: &str = "dSYMs";
const DSYM_ZIP: &str = "dSYM.zip";
const RESIGNED_IPA: &str = "resigned.ipa";

/// Upload the integration's IPA and debug symbols to HockeyApp
#[derive(Parser)]
#[clap(visible_alias = "uploadHockeyApp")]
pub struct UploadHockeyApp {
    /// HockeyApp API token
    #[arg(long, env = "HOCKEYAPP_TOKEN")]
    token: String,

    /// HockeyApp app ID
    #[arg(long)]
    app_id: String,

    /// Who to notify about the new version
    #[arg(long, value_enum)]
    notification_settings: Option<Notification>,

    /// Whether testers may download the new version
    #[arg(long, value_enum)]
    availability_settings: Option<Availability>,

    /// Makes the build mandatory (users must install)
    #[arg(long)]
    mandatory: bool,

    /// Restricts the build's availability to users with this tag
    #[arg(long = "restrict-to-tag")]
    tags: Vec<String>,

    /// Re-export the archive with the provisioning profile of this name before uploading
    #[arg(long)]
    resign_with_profile: Option<String>,

    #[command(flatten)]
    credentials: CredentialArgs,

    /// GitHub personal access token with the `repo` scope, used to read the commit message
    #[arg(long, env = "GITHUB_TOKEN")]
    github_token: Option<String>,
}

impl UploadHockeyApp {
    pub async fn run(self) -> Result<()> {
        let xcode_server = XcodeServer::from_env();
        let product = xcode_server.product_path()?;
        ensure_exists(&product)?;
        let archive = xcode_server.archive()?;
        ensure_exists(&archive.join(DSYMS))?;

        let working_dir = tempfile::Builder::new()
            .prefix(env!("CARGO_PKG_NAME"))
            .tempdir()?;
        let dsym_zip = Utf8Path::from_path(working_dir.path())
            .map(|dir| dir.join(DSYM_ZIP))
            .ok_or_else(|| eyre!("{} is not valid UTF-8", working_dir.path().display()))?;
        tokio::task::block_in_place(|| {
            writer::write_tree(
                archive.as_std_path(),
                DSYMS,
                dsym_zip.as_std_path(),
                DirectoryEntries::All,
                CompressionMethod::Deflated,
            )
        })?;

        let ipa = match self.resign_with_profile.as_deref() {
            Some(profile) => {
                let exported = xcode_server.output_dir()?.join(RESIGNED_IPA);
                let pb = ProgressBar::new_spinner()
                    .with_message(format!("Exporting {archive} with the {profile} profile"));
                pb.enable_steady_tick(SPINNER_TICK_RATE);
                let result =
                    process::run_async(&mut export_command(archive, &exported, profile)).await;
                pb.finish_and_clear();
                result?;
                exported
            }
            None => product,
        };
        ensure_exists(&ipa)?;

        let log = xcode_server.source_control_log()?;
        let repository = log.repository()?;
        let sha = log.sha()?;
        let build_server_url = xcode_server.integration_url()?;

        let store = self.credentials.open()?;
        let github_token = TokenManager::handle(self.github_token, store.as_ref()).await?;
        let notes = GitHub::new(&github_token)?
            .commit_message(&repository, sha)
            .await?;

        let release = Release::builder()
            .notes(&notes)
            .commit_sha(sha)
            .build_server_url(&build_server_url)
            .maybe_notify(self.notification_settings)
            .maybe_status(self.availability_settings)
            .mandatory(self.mandatory)
            .tags(&self.tags)
            .build();

        let pb = ProgressBar::new_spinner().with_message(format!("Uploading {ipa} to HockeyApp"));
        pb.enable_steady_tick(SPINNER_TICK_RATE);
        let result = HockeyApp::new(self.token)?
            .upload(&self.app_id, &ipa, &dsym_zip, &release)
            .await;
        pb.finish_and_clear();
        result?;

        working_dir.close()?;

        println!(
            "{} uploaded {} to HockeyApp",
            "Successfully".green(),
            ipa.file_name().unwrap_or(ipa.as_str()).blue()
        );

        Ok(())
    }
}

fn export_command(archive: &Utf8Path, export_path: &Utf8Path, profile: &str) -> Command {
    let mut command = Command::new("xcodebuild");
    command
        .args(["-exportArchive", "-exportFormat", "IPA", "-archivePath"])
        .arg(archive)
        .arg("-exportPath")
        .arg(export_path)
        .args(["-exportProvisioningProfile", profile]);
    command
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;
    use clap::Parser;

    use super::{UploadHockeyApp, export_command};
    use crate::hockeyapp::Notification;

    #[test]
    fn xcodebuild_arguments() {
        let command = export_command(
            Utf8Path::new("/tmp/App.xcarchive"),
            Utf8Path::new("/tmp/out/resigned.ipa"),
            "Example Ad Hoc",
        );
        let command = command.as_std();

        assert_eq!(command.get_program(), "xcodebuild");
        assert_eq!(
            command.get_args().collect::<Vec<_>>(),
            [
                "-exportArchive",
                "-exportFormat",
                "IPA",
                "-archivePath",
                "/tmp/App.xcarchive",
                "-exportPath",
                "/tmp/out/resigned.ipa",
                "-exportProvisioningProfile",
                "Example Ad Hoc",
            ]
        );
    }

    #[test]
    fn repeatable_tags() {
        let command = UploadHockeyApp::try_parse_from([
            "upload-hockey-app",
            "--token",
            "abc",
            "--app-id",
            "123",
            "--notification-settings",
            "notify_all_testers",
            "--restrict-to-tag",
            "qa",
            "--restrict-to-tag",
            "beta",
        ])
        .unwrap();

        assert_eq!(command.tags, ["qa", "beta"]);
        assert_eq!(
            command.notification_settings,
            Some(Notification::NotifyAllTesters)
        );
        assert!(!command.mandatory);
    }
}
