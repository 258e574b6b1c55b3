use std::{fmt, fs, io, io::Write};

use camino::{Utf8Path, Utf8PathBuf};
use keyring::Entry;
use thiserror::Error;

const SERVICE: &str = "cavejohnson";
const USERNAME: &str = "github-access-token";

/// Where Xcode Server's build user keeps its GitHub token.
pub const DEFAULT_CREDENTIALS_FILE: &str = "/var/_xcsbuildd/githubcredentials";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to access {path}")]
    File {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Keyring(#[from] keyring::Error),
}

/// Somewhere a GitHub token can be kept between runs.
pub trait CredentialStore: fmt::Display {
    fn lookup(&self) -> Result<Option<String>, CredentialError>;

    fn store(&self, token: &str) -> Result<(), CredentialError>;

    /// Deletes the stored token, returning whether there was one.
    fn delete(&self) -> Result<bool, CredentialError>;
}

/// A token kept in a plain file readable only by its owner.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: Utf8PathBuf,
}

impl FileStore {
    pub fn new<P: Into<Utf8PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn error(&self, source: io::Error) -> CredentialError {
        CredentialError::File {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for FileStore {
    fn lookup(&self) -> Result<Option<String>, CredentialError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_owned()))
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(self.error(error)),
        }
    }

    fn store(&self, token: &str) -> Result<(), CredentialError> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        options
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{token}"))
            .map_err(|error| self.error(error))
    }

    fn delete(&self) -> Result<bool, CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(self.error(error)),
        }
    }
}

impl fmt::Display for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// A token kept in the platform's secure storage.
pub struct KeyringStore {
    entry: Entry,
}

impl KeyringStore {
    pub fn new() -> Result<Self, CredentialError> {
        Ok(Self {
            entry: Entry::new(SERVICE, USERNAME)?,
        })
    }
}

impl CredentialStore for KeyringStore {
    fn lookup(&self) -> Result<Option<String>, CredentialError> {
        match self.entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn store(&self, token: &str) -> Result<(), CredentialError> {
        Ok(self.entry.set_password(token)?)
    }

    fn delete(&self) -> Result<bool, CredentialError> {
        match self.entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(error) => Err(error.into()),
        }
    }
}

impl fmt::Display for KeyringStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the platform's secure storage")
    }
}
