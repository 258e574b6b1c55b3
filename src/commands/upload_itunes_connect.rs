use anstream::println;
use camino::Utf8PathBuf;
use clap::Parser;
use color_eyre::eyre::Result;
use indicatif::ProgressBar;
use owo_colors::OwoColorize;

use crate::{
    commands::utils::{SPINNER_TICK_RATE, ensure_exists, ipa_path},
    ipa::IpaArchive,
    itunes_connect::{DEFAULT_TRANSPORTER, ItmsPackage, Transporter},
    process,
    xcode_server::XcodeServer,
};

/// Upload an IPA to iTunes Connect for TestFlight
#[derive(Parser)]
#[clap(visible_alias = "uploadiTunesConnect")]
pub struct UploadItunesConnect {
    /// iTunes Connect app ID
    #[arg(long)]
    itunes_app_id: String,

    /// iTunes Connect username with the technical role or better
    #[arg(long)]
    itunes_username: String,

    /// iTunes Connect password
    #[arg(long, env = "ITUNES_PASSWORD", hide_env_values = true)]
    itunes_password: String,

    /// IPA to upload. Defaults to the product of the current integration, so set this when
    /// uploading a re-signed IPA
    #[arg(long)]
    ipa_path: Option<Utf8PathBuf>,

    /// Path of Apple's iTMSTransporter
    #[arg(long, default_value = DEFAULT_TRANSPORTER)]
    transporter_path: Utf8PathBuf,
}

impl UploadItunesConnect {
    pub async fn run(self) -> Result<()> {
        let ipa = ipa_path(self.ipa_path, &XcodeServer::from_env())?;
        ensure_exists(&self.transporter_path)?;

        let info_plist = IpaArchive::open(&ipa)?.info_plist()?;
        let package = ItmsPackage::create(&ipa, &self.itunes_app_id, &info_plist)?;

        let transporter = Transporter {
            program: &self.transporter_path,
            apple_id: &self.itunes_app_id,
            username: &self.itunes_username,
            password: &self.itunes_password,
        };

        let pb = ProgressBar::new_spinner().with_message(format!(
            "Uploading {} {} to iTunes Connect",
            info_plist.bundle_identifier()?,
            info_plist.bundle_version()?
        ));
        pb.enable_steady_tick(SPINNER_TICK_RATE);
        let result = process::run_async(&mut transporter.upload_command(&package.path())).await;
        pb.finish_and_clear();
        result?;

        package.close()?;

        println!(
            "{} uploaded {ipa} to iTunes Connect",
            "Successfully".green()
        );

        Ok(())
    }
}
