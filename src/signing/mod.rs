mod codesign;

use std::{io, path::Path};

pub use codesign::Codesign;
use thiserror::Error;

use crate::{process::ToolError, provisioning::ProfileError};

#[derive(Debug, Error)]
pub enum SignError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What to sign and how.
#[derive(Clone, Copy, Debug)]
pub struct SignRequest<'a> {
    pub bundle: &'a Path,
    pub identity: &'a str,
    pub entitlements: &'a Path,
    /// Replace any signature the bundle already has.
    pub force: bool,
}

/// A code-signing backend.
pub trait Signer {
    /// Decodes a signed provisioning profile, returning the property list it carries.
    fn decode_profile(&self, profile: &Path) -> Result<Vec<u8>, SignError>;

    fn sign(&self, request: &SignRequest<'_>) -> Result<(), SignError>;
}
