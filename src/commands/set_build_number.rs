use anstream::println;
use camino::Utf8PathBuf;
use clap::Parser;
use color_eyre::eyre::Result;
use owo_colors::OwoColorize;
use tracing::debug;

use crate::{info_plist::InfoPlist, xcode_server::XcodeServer};

/// Set CFBundleVersion from the number of the current integration
#[derive(Parser)]
#[clap(visible_alias = "setBuildNumber")]
pub struct SetBuildNumber {
    /// Path of the Info.plist to edit
    #[arg(long)]
    plist_path: Utf8PathBuf,
}

impl SetBuildNumber {
    pub fn run(self) -> Result<()> {
        let build_number = XcodeServer::from_env().integration_number()?;

        let mut info_plist = InfoPlist::open(&self.plist_path)?;
        let version = info_plist.set_build_number(build_number)?;
        debug!("Writing {} as a {:?} property list", self.plist_path, info_plist.format());
        info_plist.save(&self.plist_path)?;

        println!(
            "{} set CFBundleVersion to {} in {}",
            "Successfully".green(),
            version.blue(),
            self.plist_path
        );

        Ok(())
    }
}
