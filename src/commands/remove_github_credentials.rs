use anstream::println;
use clap::Parser;
use color_eyre::eyre::Result;
use owo_colors::OwoColorize;

use crate::{commands::utils::credentials::CredentialArgs, prompts::confirm_prompt};

/// Remove the stored GitHub token
#[derive(Parser)]
#[clap(visible_alias = "removeGithubCredentials")]
pub struct RemoveGithubCredentials {
    /// Skip the confirmation prompt to delete the token
    #[arg(short = 'y', long = "yes")]
    skip_prompt: bool,

    #[command(flatten)]
    credentials: CredentialArgs,
}

impl RemoveGithubCredentials {
    pub fn run(self) -> Result<()> {
        let store = self.credentials.open()?;

        if store.lookup()?.is_none() {
            println!("No token is currently stored in {store}");
            return Ok(());
        }

        let confirm = if self.skip_prompt {
            true
        } else {
            confirm_prompt(&format!(
                "Would you like to remove the token stored in {store}?"
            ))?
        };

        if confirm && store.delete()? {
            println!(
                "{} deleted the token stored in {store}",
                "Successfully".green()
            );
        } else {
            println!("{}", "No token was deleted".cyan());
        }

        Ok(())
    }
}
