use camino::Utf8PathBuf;
use clap::Args;

use crate::credential::{
    CredentialError, CredentialStore, DEFAULT_CREDENTIALS_FILE, FileStore, KeyringStore,
};

/// Where the GitHub token is kept.
#[derive(Args)]
pub struct CredentialArgs {
    /// File the GitHub token is stored in
    #[arg(
        long,
        env = "CAVEJOHNSON_CREDENTIALS_FILE",
        default_value = DEFAULT_CREDENTIALS_FILE,
        conflicts_with = "keyring"
    )]
    credentials_file: Utf8PathBuf,

    /// Store the GitHub token in the platform's secure storage instead of a file
    #[arg(long)]
    keyring: bool,
}

impl CredentialArgs {
    pub fn open(&self) -> Result<Box<dyn CredentialStore>, CredentialError> {
        if self.keyring {
            Ok(Box::new(KeyringStore::new()?))
        } else {
            Ok(Box::new(FileStore::new(self.credentials_file.clone())))
        }
    }
}
