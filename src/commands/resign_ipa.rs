use anstream::println;
use camino::Utf8PathBuf;
use clap::Parser;
use color_eyre::eyre::Result;
use owo_colors::OwoColorize;

use crate::{
    commands::utils::{ensure_exists, ipa_path},
    resign::{IdentityPolicy, Resigner},
    signing::Codesign,
    xcode_server::XcodeServer,
};

/// Re-sign an IPA with a different provisioning profile
#[derive(Parser)]
#[clap(visible_alias = "reSignIPA")]
pub struct ResignIpa {
    /// IPA to re-sign. Defaults to the product of the current integration
    #[arg(long)]
    ipa_path: Option<Utf8PathBuf>,

    /// Provisioning profile to re-sign with
    #[arg(long)]
    new_mobileprovision_path: Utf8PathBuf,

    /// Full name of the signing certificate, like `iPhone Distribution: Example Inc (TEAMID)`
    #[arg(long)]
    certificate_name: String,

    /// Path of the re-signed IPA
    #[arg(long)]
    out_ipa_name: Utf8PathBuf,

    /// What to do when the profile doesn't match the app's bundle identifier
    #[arg(long, value_enum, default_value_t)]
    identity_check: IdentityPolicy,

    /// Directory to work in. Defaults to the system's temporary directory
    #[arg(long)]
    temp_dir: Option<Utf8PathBuf>,
}

impl ResignIpa {
    pub fn run(self) -> Result<()> {
        let input = ipa_path(self.ipa_path, &XcodeServer::from_env())?;
        ensure_exists(&self.new_mobileprovision_path)?;

        Resigner::builder()
            .signer(&Codesign)
            .profile(&self.new_mobileprovision_path)
            .identity(&self.certificate_name)
            .input(&input)
            .output(&self.out_ipa_name)
            .policy(self.identity_check)
            .maybe_temp_root(self.temp_dir.as_deref())
            .build()
            .run()?;

        println!(
            "{} re-signed {input} to {}",
            "Successfully".green(),
            self.out_ipa_name
        );

        Ok(())
    }
}
