use anstream::println;
use clap::Parser;
use color_eyre::eyre::Result;

use crate::xcode_server::XcodeServer;

/// Print the GitHub repository being integrated as `owner/repo`
#[derive(Parser)]
#[clap(visible_alias = "getGithubRepo")]
pub struct GetGithubRepo;

impl GetGithubRepo {
    pub fn run(self) -> Result<()> {
        let repository = XcodeServer::from_env()
            .source_control_log()?
            .repository()?;
        println!("{repository}");
        Ok(())
    }
}
