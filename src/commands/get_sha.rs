use anstream::println;
use clap::Parser;
use color_eyre::eyre::Result;

use crate::xcode_server::XcodeServer;

/// Print the sha of the commit being integrated
#[derive(Parser)]
#[clap(visible_alias = "getSha")]
pub struct GetSha;

impl GetSha {
    pub fn run(self) -> Result<()> {
        let log = XcodeServer::from_env().source_control_log()?;
        println!("{}", log.sha()?);
        Ok(())
    }
}
